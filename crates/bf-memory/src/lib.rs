//! # Bifrost Memory Spaces
//!
//! Resolution of the `Auto` memory space and space-aware copies between
//! array descriptors.
//!
//! ## Main Types
//!
//! - [`SpaceResolver`]: picks a concrete space for an `Auto` descriptor
//! - [`HostResolver`]: resolver for processes without an accelerator
//! - [`SpaceCopy`]: byte copy primitive for device-only memory
//! - [`Transfer`]: resolves both sides and copies, keeping counters
//!
//! ## Example
//!
//! ```rust
//! use bf_array::{ArrayDescriptor, DataPtr, DType, MemorySpace};
//! use bf_memory::Transfer;
//!
//! let src = [1u32, 2, 3, 4];
//! let mut dst = [0u32; 4];
//! let src_desc = ArrayDescriptor::contiguous(
//!     MemorySpace::Auto, DType::U32, &[4], DataPtr::from_slice(&src))?;
//! let dst_desc = ArrayDescriptor::contiguous(
//!     MemorySpace::System, DType::U32, &[2, 2], DataPtr::from_mut_slice(&mut dst))?;
//!
//! let engine = Transfer::host();
//! // Safety: both descriptors address live, correctly sized buffers.
//! unsafe { engine.copy(&dst_desc, &src_desc)? };
//! assert_eq!(dst, src);
//! # Ok::<(), bf_status::BfError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod resolve;
pub mod transfer;

pub use resolve::{require_resolved, HostResolver, SpaceResolver};
pub use transfer::{
    check_transfer_extents, copy_array, HostOnlyCopy, SpaceCopy, Transfer, TransferDirection,
    TransferStats,
};
