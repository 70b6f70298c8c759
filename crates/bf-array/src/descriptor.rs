//! The array descriptor record.
//!
//! An [`ArrayDescriptor`] says what a buffer *is*: where it lives, what
//! its elements are, and how its elements are laid out. It never says who
//! owns the buffer. Copying or dropping a descriptor has no effect on the
//! memory it points to, and a dangling data pointer is a caller error, not
//! a descriptor invariant violation.
//!
//! # Layout
//!
//! The record is `#[repr(C)]` with a fixed field order and inline,
//! fixed-capacity shape and stride arrays:
//!
//! ```text
//! offset  field     type
//! ──────  ────────  ─────────────
//!   0     data      void*
//!   8     space     int32
//!  12     dtype     uint32
//!  16     ndim      int32
//!  24     shape     uint64[MAX_DIM]
//!  48     strides   int64[MAX_DIM]
//! ```
//!
//! Strides are signed byte offsets between consecutive elements along a
//! dimension. The canonical contiguous layout is row-major: the last
//! dimension steps by the element size. Entries at or beyond `ndim` are
//! ignored.

use crate::dtype::DType;
use crate::space::{MemorySpace, ResolvedSpace};
use crate::MAX_DIM;
use bf_status::{BfError, BfResult};
use std::ffi::c_void;
use std::fmt;
use std::ops::Deref;

/// A non-owning pointer to the first element of a buffer.
///
/// The pointer may refer to memory in any space, including memory the
/// host cannot dereference. It is never freed through this handle.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DataPtr(*mut c_void);

// Safety: DataPtr is an address only. Synchronizing access to the memory
// behind it is the responsibility of whoever dereferences it.
unsafe impl Send for DataPtr {}
unsafe impl Sync for DataPtr {}

impl DataPtr {
    /// The null pointer.
    #[must_use]
    pub const fn null() -> Self {
        Self(std::ptr::null_mut())
    }

    /// Wrap a raw pointer.
    #[must_use]
    pub const fn new(ptr: *mut c_void) -> Self {
        Self(ptr)
    }

    /// Wrap a pointer to the start of a host slice.
    #[must_use]
    pub fn from_slice<T>(data: &[T]) -> Self {
        Self(data.as_ptr().cast_mut().cast())
    }

    /// Wrap a pointer to the start of a mutable host slice.
    #[must_use]
    pub fn from_mut_slice<T>(data: &mut [T]) -> Self {
        Self(data.as_mut_ptr().cast())
    }

    /// Returns true for the null pointer.
    #[inline]
    #[must_use]
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }

    /// The raw pointer.
    #[inline]
    #[must_use]
    pub const fn as_ptr(self) -> *mut c_void {
        self.0
    }

    /// The numeric address.
    #[must_use]
    pub fn addr(self) -> usize {
        self.0 as usize
    }

    /// Offset the pointer by a signed number of bytes.
    ///
    /// Uses wrapping arithmetic; the result is only meaningful inside
    /// the same allocation.
    #[must_use]
    pub fn byte_offset(self, bytes: isize) -> Self {
        Self(self.0.cast::<u8>().wrapping_offset(bytes).cast())
    }
}

impl Default for DataPtr {
    fn default() -> Self {
        Self::null()
    }
}

/// Canonical row-major byte strides for a shape.
///
/// # Errors
///
/// Returns `InvalidArgument` if `shape` has more than [`MAX_DIM`]
/// entries or a stride overflows `i64`.
pub fn row_major_strides(shape: &[u64], elem_size: usize) -> BfResult<[i64; MAX_DIM]> {
    if shape.len() > MAX_DIM {
        return Err(BfError::InvalidArgument);
    }
    let mut strides = [0i64; MAX_DIM];
    let mut stride = i64::try_from(elem_size).map_err(|_| BfError::InvalidArgument)?;
    for (dim, &extent) in shape.iter().enumerate().rev() {
        strides[dim] = stride;
        // The outermost extent never feeds a stride.
        if dim > 0 {
            let extent = i64::try_from(extent).map_err(|_| BfError::InvalidArgument)?;
            stride = stride.checked_mul(extent).ok_or(BfError::InvalidArgument)?;
        }
    }
    Ok(strides)
}

/// Descriptor of a multi-dimensional array in some memory space.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct ArrayDescriptor {
    data: DataPtr,
    space: MemorySpace,
    dtype: DType,
    ndim: i32,
    shape: [u64; MAX_DIM],
    strides: [i64; MAX_DIM],
}

impl ArrayDescriptor {
    /// Describe a buffer.
    ///
    /// Only structural invariants are checked. The data pointer may be
    /// null and the buffer size is not verified; whichever operation
    /// dereferences the buffer validates those.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the rank exceeds [`MAX_DIM`] or the
    /// shape and stride lengths differ.
    pub fn describe(
        space: MemorySpace,
        dtype: DType,
        shape: &[u64],
        strides: &[i64],
        data: DataPtr,
    ) -> BfResult<Self> {
        if shape.len() > MAX_DIM || strides.len() != shape.len() {
            return Err(BfError::InvalidArgument);
        }
        let mut desc = Self {
            data,
            space,
            dtype,
            // MAX_DIM is tiny, so this never truncates
            ndim: shape.len() as i32,
            shape: [0; MAX_DIM],
            strides: [0; MAX_DIM],
        };
        desc.shape[..shape.len()].copy_from_slice(shape);
        desc.strides[..strides.len()].copy_from_slice(strides);
        Ok(desc)
    }

    /// Describe a buffer from signed extents, as received from foreign
    /// callers.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if any extent is negative, in addition
    /// to the conditions of [`ArrayDescriptor::describe`].
    pub fn from_signed_extents(
        space: MemorySpace,
        dtype: DType,
        shape: &[i64],
        strides: &[i64],
        data: DataPtr,
    ) -> BfResult<Self> {
        if shape.len() > MAX_DIM {
            return Err(BfError::InvalidArgument);
        }
        let mut extents = [0u64; MAX_DIM];
        for (slot, &extent) in extents.iter_mut().zip(shape) {
            *slot = u64::try_from(extent).map_err(|_| BfError::InvalidArgument)?;
        }
        Self::describe(space, dtype, &extents[..shape.len()], strides, data)
    }

    /// Describe a contiguous row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the rank exceeds [`MAX_DIM`] or the
    /// strides overflow.
    pub fn contiguous(
        space: MemorySpace,
        dtype: DType,
        shape: &[u64],
        data: DataPtr,
    ) -> BfResult<Self> {
        let strides = row_major_strides(shape, dtype.size_bytes())?;
        Self::describe(space, dtype, shape, &strides[..shape.len()], data)
    }

    /// Describe a single scalar element.
    #[must_use]
    pub fn scalar(space: MemorySpace, dtype: DType, data: DataPtr) -> Self {
        Self {
            data,
            space,
            dtype,
            ndim: 0,
            shape: [0; MAX_DIM],
            strides: [0; MAX_DIM],
        }
    }

    /// Pointer to the first element.
    #[inline]
    #[must_use]
    pub const fn data(&self) -> DataPtr {
        self.data
    }

    /// The memory space, possibly `Auto`.
    #[inline]
    #[must_use]
    pub const fn space(&self) -> MemorySpace {
        self.space
    }

    /// The element type tag.
    #[inline]
    #[must_use]
    pub const fn dtype(&self) -> DType {
        self.dtype
    }

    /// Number of dimensions.
    #[inline]
    #[must_use]
    pub fn rank(&self) -> usize {
        usize::try_from(self.ndim).unwrap_or(0).min(MAX_DIM)
    }

    /// Extents of the first `rank` dimensions.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape[..self.rank()]
    }

    /// Byte strides of the first `rank` dimensions.
    #[must_use]
    pub fn strides(&self) -> &[i64] {
        &self.strides[..self.rank()]
    }

    /// Product of the extents; `1` for a scalar.
    ///
    /// Saturates at `u64::MAX`; use
    /// [`ArrayDescriptor::checked_element_count`] when overflow must be
    /// detected.
    #[must_use]
    pub fn element_count(&self) -> u64 {
        self.shape()
            .iter()
            .fold(1u64, |acc, &extent| acc.saturating_mul(extent))
    }

    /// Product of the extents, or an error on overflow.
    ///
    /// An array with a zero extent has no elements whatever its other
    /// extents are.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the product overflows `u64`.
    pub fn checked_element_count(&self) -> BfResult<u64> {
        if self.is_empty() {
            return Ok(0);
        }
        self.shape()
            .iter()
            .try_fold(1u64, |acc, &extent| acc.checked_mul(extent))
            .ok_or(BfError::InvalidArgument)
    }

    /// Returns true if any extent is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shape().contains(&0)
    }

    /// Total size of the elements in bytes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` on overflow.
    pub fn byte_extent(&self) -> BfResult<u64> {
        let elem = self.dtype.size_bytes() as u64;
        self.checked_element_count()?
            .checked_mul(elem)
            .ok_or(BfError::InvalidArgument)
    }

    /// Returns true if the strides are the canonical row-major strides
    /// for this shape and element size.
    #[must_use]
    pub fn is_contiguous(&self, elem_size: usize) -> bool {
        match row_major_strides(self.shape(), elem_size) {
            Ok(canonical) => self.strides() == &canonical[..self.rank()],
            Err(_) => false,
        }
    }

    /// [`ArrayDescriptor::is_contiguous`] with the element size of the
    /// descriptor's own dtype.
    #[must_use]
    pub fn is_contiguous_for_dtype(&self) -> bool {
        self.is_contiguous(self.dtype.size_bytes())
    }

    /// Byte offset of the element at a logical index.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the index has the wrong length, is
    /// out of bounds, or the offset overflows.
    pub fn offset_of(&self, index: &[u64]) -> BfResult<i64> {
        if index.len() != self.rank() {
            return Err(BfError::InvalidArgument);
        }
        let mut offset = 0i64;
        for ((&i, &extent), &stride) in index.iter().zip(self.shape()).zip(self.strides()) {
            if i >= extent {
                return Err(BfError::InvalidArgument);
            }
            let i = i64::try_from(i).map_err(|_| BfError::InvalidArgument)?;
            offset = i
                .checked_mul(stride)
                .and_then(|step| offset.checked_add(step))
                .ok_or(BfError::InvalidArgument)?;
        }
        Ok(offset)
    }

    /// Byte offsets of every element, in row-major logical order.
    #[must_use]
    pub fn offsets(&self) -> ElementOffsets {
        ElementOffsets::new(*self)
    }

    /// The same array recorded in another space.
    #[must_use]
    pub fn with_space(mut self, space: MemorySpace) -> Self {
        self.space = space;
        self
    }

    /// The same layout over another buffer.
    #[must_use]
    pub fn with_data(mut self, data: DataPtr) -> Self {
        self.data = data;
        self
    }

    /// A view with two dimensions exchanged.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if either axis is out of range.
    pub fn swap_axes(mut self, a: usize, b: usize) -> BfResult<Self> {
        let rank = self.rank();
        if a >= rank || b >= rank {
            return Err(BfError::InvalidArgument);
        }
        self.shape.swap(a, b);
        self.strides.swap(a, b);
        Ok(self)
    }
}

impl PartialEq for ArrayDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
            && self.space == other.space
            && self.dtype == other.dtype
            && self.ndim == other.ndim
            && self.shape() == other.shape()
            && self.strides() == other.strides()
    }
}

impl Eq for ArrayDescriptor {}

impl fmt::Debug for ArrayDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayDescriptor")
            .field("data", &self.data.as_ptr())
            .field("space", &self.space)
            .field("dtype", &self.dtype)
            .field("shape", &self.shape())
            .field("strides", &self.strides())
            .finish()
    }
}

impl fmt::Display for ArrayDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.dtype)?;
        for (i, extent) in self.shape().iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{extent}")?;
        }
        write!(f, "]@{}", self.space)
    }
}

/// Iterator over element byte offsets in row-major logical order.
#[derive(Clone, Debug)]
pub struct ElementOffsets {
    desc: ArrayDescriptor,
    index: [u64; MAX_DIM],
    offset: i64,
    remaining: u64,
}

impl ElementOffsets {
    fn new(desc: ArrayDescriptor) -> Self {
        let remaining = if desc.is_empty() {
            0
        } else {
            desc.element_count()
        };
        Self {
            desc,
            index: [0; MAX_DIM],
            offset: 0,
            remaining,
        }
    }
}

impl Iterator for ElementOffsets {
    type Item = i64;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.offset;
        self.remaining -= 1;
        if self.remaining > 0 {
            for dim in (0..self.desc.rank()).rev() {
                let stride = self.desc.strides[dim];
                self.index[dim] += 1;
                self.offset = self.offset.wrapping_add(stride);
                if self.index[dim] < self.desc.shape[dim] {
                    break;
                }
                // Wrap this dimension back to zero and carry.
                let span = stride.wrapping_mul(self.desc.shape[dim] as i64);
                self.offset = self.offset.wrapping_sub(span);
                self.index[dim] = 0;
            }
        }
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

/// A descriptor whose space is concrete.
///
/// Low-level memory operations take this type, so the `Auto` sentinel
/// cannot reach them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedArray {
    desc: ArrayDescriptor,
    space: ResolvedSpace,
}

impl ResolvedArray {
    /// The resolved space.
    #[inline]
    #[must_use]
    pub const fn resolved_space(&self) -> ResolvedSpace {
        self.space
    }

    /// The underlying descriptor.
    #[inline]
    #[must_use]
    pub const fn descriptor(&self) -> &ArrayDescriptor {
        &self.desc
    }

    /// Unwrap into the underlying descriptor.
    #[must_use]
    pub const fn into_descriptor(self) -> ArrayDescriptor {
        self.desc
    }
}

impl TryFrom<ArrayDescriptor> for ResolvedArray {
    type Error = BfError;

    /// Fails with `InvalidState` if the descriptor's space is `Auto`.
    fn try_from(desc: ArrayDescriptor) -> Result<Self, Self::Error> {
        let space = ResolvedSpace::try_from(desc.space())?;
        Ok(Self { desc, space })
    }
}

impl Deref for ResolvedArray {
    type Target = ArrayDescriptor;

    fn deref(&self) -> &Self::Target {
        &self.desc
    }
}
