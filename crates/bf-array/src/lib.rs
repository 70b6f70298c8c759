//! # Bifrost Array Descriptor
//!
//! This crate defines the record that independent components use to agree
//! on what a buffer is: its shape, layout, element encoding and physical
//! location. It is the one piece that must stay bit-compatible across
//! every producer and consumer, so the record is a plain `#[repr(C)]`
//! value with inline fixed-capacity arrays and closed, numerically stable
//! tag enums.
//!
//! ## Main Types
//!
//! - [`ArrayDescriptor`]: the non-owning descriptor record
//! - [`DataPtr`]: the non-owning data pointer it carries
//! - [`MemorySpace`] / [`ResolvedSpace`]: where the buffer lives
//! - [`DType`]: element type tag; the only source of element size
//! - [`ResolvedArray`]: a descriptor whose space is known to be concrete
//!
//! ## Conventions
//!
//! | Property | Convention |
//! |----------|------------|
//! | strides  | signed byte offsets |
//! | layout   | row-major is canonical (last dimension fastest) |
//! | rank     | `0..=MAX_DIM`; a rank-0 array is a scalar |
//! | extents  | unsigned; zero denotes a legal empty array |
//!
//! ## Example
//!
//! ```rust
//! use bf_array::{ArrayDescriptor, DataPtr, DType, MemorySpace};
//!
//! let buf = vec![0.0f32; 16];
//! let desc = ArrayDescriptor::describe(
//!     MemorySpace::System,
//!     DType::F32,
//!     &[4, 4],
//!     &[16, 4],
//!     DataPtr::from_slice(&buf),
//! )?;
//! assert_eq!(desc.element_count(), 16);
//! assert!(desc.is_contiguous(4));
//! # Ok::<(), bf_status::BfError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod descriptor;
pub mod dtype;
pub mod space;

pub use descriptor::{row_major_strides, ArrayDescriptor, DataPtr, ElementOffsets, ResolvedArray};
pub use dtype::DType;
pub use space::{MemorySpace, ResolvedSpace};

/// Maximum number of dimensions a descriptor can carry.
pub const MAX_DIM: usize = 3;
