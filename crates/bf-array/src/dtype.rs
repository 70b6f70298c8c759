//! Element type tags.
//!
//! A [`DType`] is the single source of truth for element size and
//! interpretation. Descriptors carry only the tag; the byte size is
//! derived from it.
//!
//! # Encoding
//!
//! | Bits       | Meaning                                   |
//! |------------|-------------------------------------------|
//! | `0..8`     | bits per real component (`nbit`)          |
//! | `8..12`    | kind: `0x0` signed, `0x1` unsigned, `0x2` float |
//! | `12`       | complex flag: element is a `(re, im)` pair |
//!
//! Textual names follow the same split: a kind prefix (`i`, `u`, `f`,
//! `ci`, `cf`) followed by the per-component bit count, e.g. `cf32` is a
//! pair of 32-bit floats occupying 8 bytes.

use bf_status::BfError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mask selecting the per-component bit count.
pub const NBIT_MASK: u32 = 0x00FF;
/// Mask selecting the numeric kind.
pub const KIND_MASK: u32 = 0x0F00;
/// Kind bits for signed integers.
pub const KIND_INT: u32 = 0x0000;
/// Kind bits for unsigned integers.
pub const KIND_UINT: u32 = 0x0100;
/// Kind bits for floating point.
pub const KIND_FLOAT: u32 = 0x0200;
/// Flag marking complex (paired) elements.
pub const COMPLEX_BIT: u32 = 0x1000;

/// Element type of an array.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DType {
    /// 8-bit signed integer.
    I8 = 8 | KIND_INT,
    /// 16-bit signed integer.
    I16 = 16 | KIND_INT,
    /// 32-bit signed integer.
    I32 = 32 | KIND_INT,
    /// 64-bit signed integer.
    I64 = 64 | KIND_INT,
    /// 8-bit unsigned integer.
    U8 = 8 | KIND_UINT,
    /// 16-bit unsigned integer.
    U16 = 16 | KIND_UINT,
    /// 32-bit unsigned integer.
    U32 = 32 | KIND_UINT,
    /// 64-bit unsigned integer.
    U64 = 64 | KIND_UINT,
    /// Half precision float.
    F16 = 16 | KIND_FLOAT,
    /// Single precision float.
    F32 = 32 | KIND_FLOAT,
    /// Double precision float.
    F64 = 64 | KIND_FLOAT,
    /// Quad precision float.
    F128 = 128 | KIND_FLOAT,
    /// Complex pair of 8-bit signed integers.
    CI8 = 8 | KIND_INT | COMPLEX_BIT,
    /// Complex pair of 16-bit signed integers.
    CI16 = 16 | KIND_INT | COMPLEX_BIT,
    /// Complex pair of 32-bit signed integers.
    CI32 = 32 | KIND_INT | COMPLEX_BIT,
    /// Complex pair of half precision floats.
    CF16 = 16 | KIND_FLOAT | COMPLEX_BIT,
    /// Complex pair of single precision floats.
    CF32 = 32 | KIND_FLOAT | COMPLEX_BIT,
    /// Complex pair of double precision floats.
    CF64 = 64 | KIND_FLOAT | COMPLEX_BIT,
    /// Complex pair of quad precision floats.
    CF128 = 128 | KIND_FLOAT | COMPLEX_BIT,
}

impl DType {
    /// Every supported tag.
    pub const ALL: [DType; 19] = [
        Self::I8,
        Self::I16,
        Self::I32,
        Self::I64,
        Self::U8,
        Self::U16,
        Self::U32,
        Self::U64,
        Self::F16,
        Self::F32,
        Self::F64,
        Self::F128,
        Self::CI8,
        Self::CI16,
        Self::CI32,
        Self::CF16,
        Self::CF32,
        Self::CF64,
        Self::CF128,
    ];

    /// Look up a tag by its raw encoding.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for encodings outside the supported set.
    pub fn from_raw(raw: u32) -> Result<Self, BfError> {
        Self::ALL
            .into_iter()
            .find(|dtype| dtype.as_raw() == raw)
            .ok_or(BfError::InvalidArgument)
    }

    /// The raw encoding.
    #[inline]
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self as u32
    }

    /// Bits per real component.
    #[inline]
    #[must_use]
    pub const fn nbit(self) -> u32 {
        self.as_raw() & NBIT_MASK
    }

    /// Returns true if elements are `(re, im)` pairs.
    #[inline]
    #[must_use]
    pub const fn is_complex(self) -> bool {
        self.as_raw() & COMPLEX_BIT != 0
    }

    /// Returns true for floating point components.
    #[must_use]
    pub const fn is_float(self) -> bool {
        self.as_raw() & KIND_MASK == KIND_FLOAT
    }

    /// Returns true for integer components.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        !self.is_float()
    }

    /// Returns true if components carry a sign.
    #[must_use]
    pub const fn is_signed(self) -> bool {
        self.as_raw() & KIND_MASK != KIND_UINT
    }

    /// Size of one element in bytes.
    #[must_use]
    pub const fn size_bytes(self) -> usize {
        let components = if self.is_complex() { 2 } else { 1 };
        (self.nbit() as usize * components) / 8
    }

    /// Textual kind prefix.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match (self.is_complex(), self.as_raw() & KIND_MASK) {
            (false, KIND_UINT) => "u",
            (false, KIND_FLOAT) => "f",
            (false, _) => "i",
            (true, KIND_FLOAT) => "cf",
            (true, _) => "ci",
        }
    }

    /// The complex counterpart of a real tag, if one exists.
    #[must_use]
    pub fn to_complex(self) -> Option<Self> {
        if self.is_complex() {
            return Some(self);
        }
        Self::from_raw(self.as_raw() | COMPLEX_BIT).ok()
    }

    /// The component type of a complex tag.
    #[must_use]
    pub fn to_real(self) -> Self {
        Self::from_raw(self.as_raw() & !COMPLEX_BIT).unwrap_or(self)
    }
}

/// Split a dtype name into its kind prefix and bit count.
fn split_name_nbit(name: &str) -> Result<(&str, u32), BfError> {
    let digits = name
        .find(|c: char| c.is_ascii_digit())
        .ok_or(BfError::InvalidArgument)?;
    let (prefix, nbit) = name.split_at(digits);
    let nbit = nbit.parse().map_err(|_| BfError::InvalidArgument)?;
    Ok((prefix, nbit))
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix(), self.nbit())
    }
}

impl FromStr for DType {
    type Err = BfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let (prefix, nbit) = split_name_nbit(&lowered)?;
        Self::ALL
            .into_iter()
            .find(|dtype| dtype.prefix() == prefix && dtype.nbit() == nbit)
            .ok_or(BfError::InvalidArgument)
    }
}

impl TryFrom<String> for DType {
    type Error = BfError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DType> for String {
    fn from(dtype: DType) -> Self {
        dtype.to_string()
    }
}

impl TryFrom<u32> for DType {
    type Error = BfError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::from_raw(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        assert_eq!(DType::I8.size_bytes(), 1);
        assert_eq!(DType::U16.size_bytes(), 2);
        assert_eq!(DType::F32.size_bytes(), 4);
        assert_eq!(DType::F64.size_bytes(), 8);
        assert_eq!(DType::F128.size_bytes(), 16);
        assert_eq!(DType::CI8.size_bytes(), 2);
        assert_eq!(DType::CF16.size_bytes(), 4);
        assert_eq!(DType::CF32.size_bytes(), 8);
        assert_eq!(DType::CF128.size_bytes(), 32);
    }

    #[test]
    fn test_raw_encoding() {
        assert_eq!(DType::F32.as_raw(), 0x0220);
        assert_eq!(DType::CF32.as_raw(), 0x1220);
        assert_eq!(DType::U8.as_raw(), 0x0108);
        for dtype in DType::ALL {
            assert_eq!(DType::from_raw(dtype.as_raw()), Ok(dtype));
        }
        assert_eq!(DType::from_raw(0), Err(BfError::InvalidArgument));
        assert_eq!(DType::from_raw(0x0204), Err(BfError::InvalidArgument));
    }

    #[test]
    fn test_classification() {
        assert!(DType::CF64.is_complex());
        assert!(DType::CF64.is_float());
        assert!(DType::CI16.is_integer());
        assert!(DType::CI16.is_signed());
        assert!(!DType::U32.is_signed());
        assert!(!DType::F16.is_complex());
    }

    #[test]
    fn test_names() {
        for dtype in DType::ALL {
            assert_eq!(dtype.to_string().parse::<DType>(), Ok(dtype));
        }
        assert_eq!("cf32".parse::<DType>(), Ok(DType::CF32));
        assert_eq!("CI8".parse::<DType>(), Ok(DType::CI8));
        assert_eq!("u64".parse::<DType>(), Ok(DType::U64));
        assert_eq!("f24".parse::<DType>(), Err(BfError::InvalidArgument));
        assert_eq!("cu8".parse::<DType>(), Err(BfError::InvalidArgument));
        assert_eq!("float".parse::<DType>(), Err(BfError::InvalidArgument));
        assert_eq!("".parse::<DType>(), Err(BfError::InvalidArgument));
    }

    #[test]
    fn test_complex_conversion() {
        assert_eq!(DType::F32.to_complex(), Some(DType::CF32));
        assert_eq!(DType::I64.to_complex(), None);
        assert_eq!(DType::U8.to_complex(), None);
        assert_eq!(DType::CI32.to_real(), DType::I32);
        assert_eq!(DType::F16.to_real(), DType::F16);
    }

    #[test]
    fn test_serde_as_name() {
        let json = serde_json::to_string(&DType::CF16).unwrap();
        assert_eq!(json, "\"cf16\"");
        let back: DType = serde_json::from_str("\"i32\"").unwrap();
        assert_eq!(back, DType::I32);
        assert!(serde_json::from_str::<DType>("\"x9\"").is_err());
    }
}
