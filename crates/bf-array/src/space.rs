//! Memory spaces.
//!
//! A memory space names the class of storage a buffer lives in. The
//! numeric values are part of the boundary contract and never change.
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │                Host Memory                 │
//! │  ┌──────────────┐   ┌───────────────────┐  │
//! │  │    System    │   │  AcceleratorHost  │  │
//! │  │              │   │  (pinned, DMA)    │  │
//! │  └──────────────┘   └─────────┬─────────┘  │
//! │                               │            │
//! │        AcceleratorManaged <───┼──> migrates│
//! │                               │            │
//! ├───────────────────────────────┼────────────┤
//! │            Accelerator Memory │            │
//! │  ┌────────────────────────────▼─────────┐  │
//! │  │          AcceleratorDevice           │  │
//! │  │       (not host-addressable)         │  │
//! │  └──────────────────────────────────────┘  │
//! └────────────────────────────────────────────┘
//! ```
//!
//! `Auto` is a request value only. [`ResolvedSpace`] is the same set
//! minus `Auto`; low-level operations take it so the sentinel can never
//! reach them.

use bf_status::BfError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a buffer resides, as requested or recorded in a descriptor.
#[repr(i32)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemorySpace {
    /// Not yet decided; the allocator picks a concrete space.
    #[default]
    #[serde(rename = "auto")]
    Auto = 0,
    /// General host-addressable memory.
    #[serde(rename = "system")]
    System = 1,
    /// Accelerator-only memory, not visible to the host.
    #[serde(rename = "cuda")]
    AcceleratorDevice = 2,
    /// Host memory pinned for efficient accelerator transfer.
    #[serde(rename = "cuda_host")]
    AcceleratorHost = 3,
    /// One address range migrated between host and accelerator.
    #[serde(rename = "cuda_managed")]
    AcceleratorManaged = 4,
}

impl MemorySpace {
    /// Every space, in numeric order.
    pub const ALL: [MemorySpace; 5] = [
        Self::Auto,
        Self::System,
        Self::AcceleratorDevice,
        Self::AcceleratorHost,
        Self::AcceleratorManaged,
    ];

    /// Look up a space by its raw value.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Auto),
            1 => Some(Self::System),
            2 => Some(Self::AcceleratorDevice),
            3 => Some(Self::AcceleratorHost),
            4 => Some(Self::AcceleratorManaged),
            _ => None,
        }
    }

    /// The stable numeric value.
    #[inline]
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        self as i32
    }

    /// Short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::System => "system",
            Self::AcceleratorDevice => "cuda",
            Self::AcceleratorHost => "cuda_host",
            Self::AcceleratorManaged => "cuda_managed",
        }
    }

    /// Returns true for the request sentinel.
    #[inline]
    #[must_use]
    pub const fn is_auto(self) -> bool {
        matches!(self, Self::Auto)
    }

    /// The concrete space, or `None` for `Auto`.
    #[must_use]
    pub const fn resolved(self) -> Option<ResolvedSpace> {
        match self {
            Self::Auto => None,
            Self::System => Some(ResolvedSpace::System),
            Self::AcceleratorDevice => Some(ResolvedSpace::AcceleratorDevice),
            Self::AcceleratorHost => Some(ResolvedSpace::AcceleratorHost),
            Self::AcceleratorManaged => Some(ResolvedSpace::AcceleratorManaged),
        }
    }
}

impl fmt::Display for MemorySpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MemorySpace {
    type Err = BfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|space| space.name().eq_ignore_ascii_case(s.trim()))
            .ok_or(BfError::InvalidArgument)
    }
}

impl TryFrom<i32> for MemorySpace {
    type Error = BfError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        Self::from_raw(raw).ok_or(BfError::InvalidArgument)
    }
}

/// A concrete memory space. Cannot hold `Auto`.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "MemorySpace", into = "MemorySpace")]
pub enum ResolvedSpace {
    /// General host-addressable memory.
    System = 1,
    /// Accelerator-only memory, not visible to the host.
    AcceleratorDevice = 2,
    /// Host memory pinned for efficient accelerator transfer.
    AcceleratorHost = 3,
    /// One address range migrated between host and accelerator.
    AcceleratorManaged = 4,
}

impl ResolvedSpace {
    /// The stable numeric value, identical to the [`MemorySpace`] value.
    #[inline]
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        self as i32
    }

    /// Short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.space().name()
    }

    /// The corresponding [`MemorySpace`].
    #[must_use]
    pub const fn space(self) -> MemorySpace {
        match self {
            Self::System => MemorySpace::System,
            Self::AcceleratorDevice => MemorySpace::AcceleratorDevice,
            Self::AcceleratorHost => MemorySpace::AcceleratorHost,
            Self::AcceleratorManaged => MemorySpace::AcceleratorManaged,
        }
    }

    /// Returns true if the host can dereference pointers into this space.
    #[must_use]
    pub const fn is_host_accessible(self) -> bool {
        !matches!(self, Self::AcceleratorDevice)
    }

    /// Returns true if this space needs an accelerator runtime.
    #[must_use]
    pub const fn is_accelerator(self) -> bool {
        !matches!(self, Self::System)
    }
}

impl fmt::Display for ResolvedSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<ResolvedSpace> for MemorySpace {
    fn from(space: ResolvedSpace) -> Self {
        space.space()
    }
}

impl TryFrom<MemorySpace> for ResolvedSpace {
    type Error = BfError;

    /// Fails with `InvalidState` for `Auto`.
    fn try_from(space: MemorySpace) -> Result<Self, Self::Error> {
        space.resolved().ok_or(BfError::InvalidState)
    }
}

impl FromStr for ResolvedSpace {
    type Err = BfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<MemorySpace>()?
            .resolved()
            .ok_or(BfError::InvalidArgument)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_values() {
        assert_eq!(MemorySpace::Auto.as_raw(), 0);
        assert_eq!(MemorySpace::System.as_raw(), 1);
        assert_eq!(MemorySpace::AcceleratorDevice.as_raw(), 2);
        assert_eq!(MemorySpace::AcceleratorHost.as_raw(), 3);
        assert_eq!(MemorySpace::AcceleratorManaged.as_raw(), 4);
        for space in MemorySpace::ALL {
            assert_eq!(MemorySpace::from_raw(space.as_raw()), Some(space));
            if let Some(resolved) = space.resolved() {
                assert_eq!(resolved.as_raw(), space.as_raw());
            }
        }
        assert_eq!(MemorySpace::try_from(5), Err(BfError::InvalidArgument));
        assert_eq!(MemorySpace::try_from(-1), Err(BfError::InvalidArgument));
    }

    #[test]
    fn test_auto_does_not_resolve() {
        assert_eq!(
            ResolvedSpace::try_from(MemorySpace::Auto),
            Err(BfError::InvalidState)
        );
        assert_eq!(
            ResolvedSpace::try_from(MemorySpace::AcceleratorHost),
            Ok(ResolvedSpace::AcceleratorHost)
        );
    }

    #[test]
    fn test_host_accessibility() {
        assert!(ResolvedSpace::System.is_host_accessible());
        assert!(ResolvedSpace::AcceleratorHost.is_host_accessible());
        assert!(ResolvedSpace::AcceleratorManaged.is_host_accessible());
        assert!(!ResolvedSpace::AcceleratorDevice.is_host_accessible());
        assert!(!ResolvedSpace::System.is_accelerator());
    }

    #[test]
    fn test_parse() {
        assert_eq!("system".parse::<MemorySpace>(), Ok(MemorySpace::System));
        assert_eq!(" CUDA ".parse::<MemorySpace>(), Ok(MemorySpace::AcceleratorDevice));
        assert_eq!("auto".parse::<MemorySpace>(), Ok(MemorySpace::Auto));
        assert_eq!("auto".parse::<ResolvedSpace>(), Err(BfError::InvalidArgument));
        assert_eq!("gpu".parse::<MemorySpace>(), Err(BfError::InvalidArgument));
        assert_eq!(MemorySpace::AcceleratorManaged.to_string(), "cuda_managed");
    }

    #[test]
    fn test_serde() {
        let json = serde_json::to_string(&MemorySpace::AcceleratorHost).unwrap();
        assert_eq!(json, "\"cuda_host\"");
        let resolved: ResolvedSpace = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(resolved, ResolvedSpace::System);
        assert!(serde_json::from_str::<ResolvedSpace>("\"auto\"").is_err());
    }
}
