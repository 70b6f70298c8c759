//! # Bifrost Status Codes
//!
//! This crate defines the closed result domain shared by every component
//! that produces or consumes array descriptors: allocators, transfer
//! engines and pipeline stages.
//!
//! ## Overview
//!
//! Two views of the same taxonomy are provided:
//!
//! - [`StatusCode`]: the ABI value. Eleven members with fixed numeric
//!   values; `Success` is always `0`. Callers may persist or log the raw
//!   number, so the values never change.
//! - [`BfError`]: the Rust error type. It carries the ten non-success
//!   kinds with the same numbers and no payload.
//!
//! [`status_string`] maps any integer to a static human-readable string.
//! It never allocates and never fails; out-of-domain integers map to
//! [`UNKNOWN_STATUS`].
//!
//! ## Propagation
//!
//! ```text
//!   Rust caller                     C caller
//!   ───────────                     ────────
//!   fn op() -> BfResult<T>    ──>   int bf_op(...)
//!        │  Err(BfError)                 │  StatusCode as i32
//!        ▼                               ▼
//!   err.to_string()                bf_get_status_string(code)
//! ```
//!
//! `EndOfData` is the one non-success code that is not a failure: it
//! signals normal exhaustion of a stream and must not be reported as a
//! fault.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use serde::{Deserialize, Serialize};
use std::ffi::CStr;
use std::fmt;
use thiserror::Error;

/// Number of members in the status domain.
pub const STATUS_COUNT: usize = 11;

/// Text returned for integers outside the status domain.
pub const UNKNOWN_STATUS: &str = "Unknown status code";

const UNKNOWN_STATUS_C: &CStr = c"Unknown status code";

const MESSAGES: [&str; STATUS_COUNT] = [
    "Success",
    "End of data",
    "Invalid pointer",
    "Invalid handle",
    "Invalid argument",
    "Invalid state",
    "Memory allocation failed",
    "Memory operation failed",
    "Unsupported",
    "Failed to converge",
    "Internal error",
];

// Same text as `MESSAGES`, NUL-terminated for the C surface.
const C_MESSAGES: [&CStr; STATUS_COUNT] = [
    c"Success",
    c"End of data",
    c"Invalid pointer",
    c"Invalid handle",
    c"Invalid argument",
    c"Invalid state",
    c"Memory allocation failed",
    c"Memory operation failed",
    c"Unsupported",
    c"Failed to converge",
    c"Internal error",
];

/// Result type for fallible boundary operations.
pub type BfResult<T> = Result<T, BfError>;

/// Outcome of an operation, as exchanged across the library boundary.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatusCode {
    /// Output is valid and complete.
    Success = 0,
    /// A stream or iteration is exhausted.
    EndOfData = 1,
    /// A pointer argument was null or otherwise unusable.
    InvalidPointer = 2,
    /// An opaque handle did not refer to a live object.
    InvalidHandle = 3,
    /// An argument violated the operation's contract.
    InvalidArgument = 4,
    /// The operation was invoked in a state that does not permit it.
    InvalidState = 5,
    /// Memory could not be allocated.
    MemAllocFailed = 6,
    /// A memory copy or set operation failed.
    MemOpFailed = 7,
    /// The operation is not supported by this build or configuration.
    Unsupported = 8,
    /// An iterative computation did not converge.
    FailedToConverge = 9,
    /// An internal invariant was violated. Not retryable.
    InternalError = 10,
}

impl StatusCode {
    /// Every code, in numeric order.
    pub const ALL: [StatusCode; STATUS_COUNT] = [
        Self::Success,
        Self::EndOfData,
        Self::InvalidPointer,
        Self::InvalidHandle,
        Self::InvalidArgument,
        Self::InvalidState,
        Self::MemAllocFailed,
        Self::MemOpFailed,
        Self::Unsupported,
        Self::FailedToConverge,
        Self::InternalError,
    ];

    /// Look up a code by its raw value.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Option<Self> {
        if raw < 0 || raw as usize >= STATUS_COUNT {
            return None;
        }
        Some(Self::ALL[raw as usize])
    }

    /// The stable numeric value.
    #[inline]
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        self as i32
    }

    /// The static diagnostic string for this code.
    #[must_use]
    pub const fn message(self) -> &'static str {
        MESSAGES[self as usize]
    }

    /// The diagnostic string as a NUL-terminated C string.
    #[must_use]
    pub const fn c_message(self) -> &'static CStr {
        C_MESSAGES[self as usize]
    }

    /// Returns true only for `Success`.
    #[inline]
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns true for the stream-termination signal.
    #[inline]
    #[must_use]
    pub const fn is_end_of_data(self) -> bool {
        matches!(self, Self::EndOfData)
    }

    /// Returns true if outputs of the operation must not be trusted.
    #[inline]
    #[must_use]
    pub const fn is_failure(self) -> bool {
        !matches!(self, Self::Success | Self::EndOfData)
    }

    /// Collapse a result into its status code.
    #[must_use]
    pub fn from_result<T>(result: &BfResult<T>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(err) => err.code(),
        }
    }

    /// Expand a code back into a result.
    ///
    /// # Errors
    ///
    /// Returns the matching [`BfError`] for every code except `Success`.
    pub fn into_result(self) -> BfResult<()> {
        match BfError::from_code(self) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl TryFrom<i32> for StatusCode {
    type Error = BfError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        Self::from_raw(raw).ok_or(BfError::InvalidArgument)
    }
}

impl From<StatusCode> for i32 {
    fn from(code: StatusCode) -> Self {
        code.as_raw()
    }
}

/// Error kinds reported by boundary operations.
///
/// Numeric values match [`StatusCode`]. The type carries no message
/// payload; callers needing more context log it alongside the code.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum BfError {
    /// A stream or iteration is exhausted.
    #[error("End of data")]
    EndOfData = 1,
    /// A pointer argument was null or otherwise unusable.
    #[error("Invalid pointer")]
    InvalidPointer = 2,
    /// An opaque handle did not refer to a live object.
    #[error("Invalid handle")]
    InvalidHandle = 3,
    /// An argument violated the operation's contract.
    #[error("Invalid argument")]
    InvalidArgument = 4,
    /// The operation was invoked in a state that does not permit it.
    #[error("Invalid state")]
    InvalidState = 5,
    /// Memory could not be allocated.
    #[error("Memory allocation failed")]
    MemAllocFailed = 6,
    /// A memory copy or set operation failed.
    #[error("Memory operation failed")]
    MemOpFailed = 7,
    /// The operation is not supported by this build or configuration.
    #[error("Unsupported")]
    Unsupported = 8,
    /// An iterative computation did not converge.
    #[error("Failed to converge")]
    FailedToConverge = 9,
    /// An internal invariant was violated.
    #[error("Internal error")]
    InternalError = 10,
}

impl BfError {
    /// The status code for this error.
    #[must_use]
    pub const fn code(self) -> StatusCode {
        match self {
            Self::EndOfData => StatusCode::EndOfData,
            Self::InvalidPointer => StatusCode::InvalidPointer,
            Self::InvalidHandle => StatusCode::InvalidHandle,
            Self::InvalidArgument => StatusCode::InvalidArgument,
            Self::InvalidState => StatusCode::InvalidState,
            Self::MemAllocFailed => StatusCode::MemAllocFailed,
            Self::MemOpFailed => StatusCode::MemOpFailed,
            Self::Unsupported => StatusCode::Unsupported,
            Self::FailedToConverge => StatusCode::FailedToConverge,
            Self::InternalError => StatusCode::InternalError,
        }
    }

    /// The error for a status code, or `None` for `Success`.
    #[must_use]
    pub const fn from_code(code: StatusCode) -> Option<Self> {
        match code {
            StatusCode::Success => None,
            StatusCode::EndOfData => Some(Self::EndOfData),
            StatusCode::InvalidPointer => Some(Self::InvalidPointer),
            StatusCode::InvalidHandle => Some(Self::InvalidHandle),
            StatusCode::InvalidArgument => Some(Self::InvalidArgument),
            StatusCode::InvalidState => Some(Self::InvalidState),
            StatusCode::MemAllocFailed => Some(Self::MemAllocFailed),
            StatusCode::MemOpFailed => Some(Self::MemOpFailed),
            StatusCode::Unsupported => Some(Self::Unsupported),
            StatusCode::FailedToConverge => Some(Self::FailedToConverge),
            StatusCode::InternalError => Some(Self::InternalError),
        }
    }

    /// Returns false for `EndOfData`, which terminates a stream normally.
    #[inline]
    #[must_use]
    pub const fn is_failure(self) -> bool {
        !matches!(self, Self::EndOfData)
    }

    /// Returns true if retrying the operation cannot succeed.
    #[inline]
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::InternalError)
    }
}

impl From<BfError> for StatusCode {
    fn from(err: BfError) -> Self {
        err.code()
    }
}

/// Map a raw status value to its diagnostic string.
///
/// Total over `i32`: unknown values yield [`UNKNOWN_STATUS`].
#[must_use]
pub const fn status_string(raw: i32) -> &'static str {
    match StatusCode::from_raw(raw) {
        Some(code) => code.message(),
        None => UNKNOWN_STATUS,
    }
}

/// NUL-terminated variant of [`status_string`] for the C surface.
#[must_use]
pub const fn status_cstr(raw: i32) -> &'static CStr {
    match StatusCode::from_raw(raw) {
        Some(code) => code.c_message(),
        None => UNKNOWN_STATUS_C,
    }
}
