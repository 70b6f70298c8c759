//! Cross-space data transfer.
//!
//! Copying between two descriptors is legal only when both describe the
//! same number of bytes (`element_count * dtype.size_bytes()`). The check
//! runs before any byte moves.
//!
//! # Copy Paths
//!
//! ```text
//!                       ┌──────────────────────────┐
//!                       │   byte extents equal?    │──no──> InvalidArgument
//!                       └────────────┬─────────────┘
//!                                    │ yes
//!                  ┌─────────────────┴─────────────────┐
//!          both host-accessible                touches device memory
//!                  │                                   │
//!        ┌─────────┴─────────┐                 ┌───────┴────────┐
//!   both contiguous     strided view      contiguous        strided
//!        │                   │                 │                │
//!     memmove        element gather      SpaceCopy        Unsupported
//!                                    (failure -> MemOpFailed)
//! ```
//!
//! The device path belongs to the allocator collaborator, which supplies
//! a [`SpaceCopy`] implementation. [`HostOnlyCopy`] stands in when no
//! accelerator runtime is present.

use crate::resolve::{HostResolver, SpaceResolver};
use bf_array::{ArrayDescriptor, DataPtr, ResolvedArray, ResolvedSpace};
use bf_status::{BfError, BfResult};
use parking_lot::RwLock;
use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Direction of a transfer, by host accessibility of each side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransferDirection {
    /// Both sides host-accessible.
    HostToHost,
    /// Host to device-only memory.
    HostToDevice,
    /// Device-only memory to host.
    DeviceToHost,
    /// Device-only memory on both sides.
    DeviceToDevice,
}

impl TransferDirection {
    /// Classify a transfer from `src` to `dst`.
    #[must_use]
    pub const fn between(src: ResolvedSpace, dst: ResolvedSpace) -> Self {
        match (src.is_host_accessible(), dst.is_host_accessible()) {
            (true, true) => Self::HostToHost,
            (true, false) => Self::HostToDevice,
            (false, true) => Self::DeviceToHost,
            (false, false) => Self::DeviceToDevice,
        }
    }

    /// Returns true if a plain host memory copy is legal.
    #[must_use]
    pub const fn is_host_only(self) -> bool {
        matches!(self, Self::HostToHost)
    }
}

/// Space-aware copy primitive supplied by the allocator collaborator.
pub trait SpaceCopy: Send + Sync {
    /// Copy `len` contiguous bytes from `src` to `dst`.
    ///
    /// # Safety
    ///
    /// `src` must be valid for reads and `dst` valid for writes of `len`
    /// bytes in their respective spaces.
    ///
    /// # Errors
    ///
    /// Any error is reported to callers of [`copy_array`] as
    /// `MemOpFailed`.
    unsafe fn copy_bytes(
        &self,
        dst: DataPtr,
        dst_space: ResolvedSpace,
        src: DataPtr,
        src_space: ResolvedSpace,
        len: usize,
    ) -> BfResult<()>;
}

/// Copy primitive for builds without an accelerator runtime.
///
/// Every device transfer is refused.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HostOnlyCopy;

impl SpaceCopy for HostOnlyCopy {
    unsafe fn copy_bytes(
        &self,
        _dst: DataPtr,
        _dst_space: ResolvedSpace,
        _src: DataPtr,
        _src_space: ResolvedSpace,
        _len: usize,
    ) -> BfResult<()> {
        Err(BfError::Unsupported)
    }
}

/// Check that two descriptors cover the same number of bytes.
///
/// # Errors
///
/// Returns `InvalidArgument` if the byte extents differ or overflow.
pub fn check_transfer_extents(dst: &ArrayDescriptor, src: &ArrayDescriptor) -> BfResult<u64> {
    let dst_bytes = dst.byte_extent()?;
    let src_bytes = src.byte_extent()?;
    if dst_bytes != src_bytes {
        debug!(dst_bytes, src_bytes, "transfer extent mismatch");
        return Err(BfError::InvalidArgument);
    }
    Ok(src_bytes)
}

/// Copy the elements described by `src` into the buffer described by
/// `dst`.
///
/// Elements are matched in row-major logical order, so a strided or
/// transposed view on either side is gathered or scattered accordingly.
///
/// # Safety
///
/// Both data pointers must be valid, in their spaces, for every byte
/// their descriptors address, and `dst` must be writable.
///
/// # Errors
///
/// - `InvalidArgument` if the byte extents differ
/// - `InvalidPointer` if a non-empty side has a null data pointer
/// - `Unsupported` for strided copies between differing element sizes or
///   touching device-only memory
/// - `MemOpFailed` if the device copy primitive fails
pub unsafe fn copy_array(
    dst: &ResolvedArray,
    src: &ResolvedArray,
    copier: &dyn SpaceCopy,
) -> BfResult<()> {
    let bytes = check_transfer_extents(dst, src)?;
    if bytes == 0 {
        return Ok(());
    }
    if dst.data().is_null() || src.data().is_null() {
        return Err(BfError::InvalidPointer);
    }
    let len = usize::try_from(bytes).map_err(|_| BfError::InvalidArgument)?;

    let direction = TransferDirection::between(src.resolved_space(), dst.resolved_space());
    let contiguous = dst.is_contiguous_for_dtype() && src.is_contiguous_for_dtype();
    debug!(?direction, contiguous, bytes, "copying array");

    match (direction.is_host_only(), contiguous) {
        (true, true) => {
            // Safety: caller guarantees both ranges are valid for `len` bytes.
            unsafe {
                ptr::copy(
                    src.data().as_ptr().cast::<u8>(),
                    dst.data().as_ptr().cast::<u8>(),
                    len,
                );
            }
            Ok(())
        }
        (true, false) => unsafe { gather_copy(dst, src) },
        (false, true) => {
            let result = unsafe {
                copier.copy_bytes(
                    dst.data(),
                    dst.resolved_space(),
                    src.data(),
                    src.resolved_space(),
                    len,
                )
            };
            result.map_err(|err| {
                warn!(?direction, bytes, %err, "space-aware copy failed");
                BfError::MemOpFailed
            })
        }
        (false, false) => Err(BfError::Unsupported),
    }
}

/// Element-by-element host copy between strided layouts.
unsafe fn gather_copy(dst: &ArrayDescriptor, src: &ArrayDescriptor) -> BfResult<()> {
    let elem = src.dtype().size_bytes();
    if dst.dtype().size_bytes() != elem {
        return Err(BfError::Unsupported);
    }
    for (dst_off, src_off) in dst.offsets().zip(src.offsets()) {
        let dst_off = isize::try_from(dst_off).map_err(|_| BfError::InvalidArgument)?;
        let src_off = isize::try_from(src_off).map_err(|_| BfError::InvalidArgument)?;
        // Safety: caller guarantees every addressed element is valid.
        unsafe {
            ptr::copy(
                src.data().byte_offset(src_off).as_ptr().cast::<u8>(),
                dst.data().byte_offset(dst_off).as_ptr().cast::<u8>(),
                elem,
            );
        }
    }
    Ok(())
}

/// Counters for a [`Transfer`] engine.
#[derive(Debug, Default)]
pub struct TransferStats {
    transfers: AtomicU64,
    bytes: AtomicU64,
    failures: AtomicU64,
}

impl TransferStats {
    /// Create zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            transfers: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    fn record(&self, result: &BfResult<u64>) {
        match result {
            Ok(bytes) => {
                self.transfers.fetch_add(1, Ordering::Relaxed);
                self.bytes.fetch_add(*bytes, Ordering::Relaxed);
            }
            Err(_) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Completed transfers.
    #[must_use]
    pub fn transfers(&self) -> u64 {
        self.transfers.load(Ordering::Relaxed)
    }

    /// Bytes moved by completed transfers.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    /// Transfers that returned an error.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

/// Resolves and copies descriptors with a configured resolver and copy
/// primitive.
pub struct Transfer {
    resolver: RwLock<Arc<dyn SpaceResolver>>,
    copier: Arc<dyn SpaceCopy>,
    stats: TransferStats,
}

impl Transfer {
    /// Create an engine from a resolver and a copy primitive.
    pub fn new(resolver: impl SpaceResolver + 'static, copier: impl SpaceCopy + 'static) -> Self {
        Self {
            resolver: RwLock::new(Arc::new(resolver)),
            copier: Arc::new(copier),
            stats: TransferStats::new(),
        }
    }

    /// An engine for host-only processes.
    #[must_use]
    pub fn host() -> Self {
        Self::new(HostResolver::default(), HostOnlyCopy)
    }

    /// Replace the resolver used for later transfers.
    pub fn set_resolver(&self, resolver: impl SpaceResolver + 'static) {
        *self.resolver.write() = Arc::new(resolver);
    }

    /// Resolve a descriptor with the current resolver.
    ///
    /// # Errors
    ///
    /// Propagates resolver errors.
    pub fn resolve(&self, array: &ArrayDescriptor) -> BfResult<ResolvedArray> {
        let resolver = self.resolver.read().clone();
        resolver.resolve(array)
    }

    /// Resolve both descriptors and copy `src` into `dst`.
    ///
    /// # Safety
    ///
    /// Same as [`copy_array`].
    ///
    /// # Errors
    ///
    /// Same as [`copy_array`], plus resolver errors.
    pub unsafe fn copy(&self, dst: &ArrayDescriptor, src: &ArrayDescriptor) -> BfResult<()> {
        let result = self.resolve(dst).and_then(|dst| {
            let src = self.resolve(src)?;
            // Safety: forwarded from the caller.
            unsafe { copy_array(&dst, &src, self.copier.as_ref()) }?;
            src.byte_extent()
        });
        self.stats.record(&result);
        result.map(|_| ())
    }

    /// Transfer counters.
    #[must_use]
    pub fn stats(&self) -> &TransferStats {
        &self.stats
    }
}

impl fmt::Debug for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transfer")
            .field("transfers", &self.stats.transfers())
            .field("bytes", &self.stats.bytes())
            .field("failures", &self.stats.failures())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bf_array::{DType, MemorySpace};

    fn resolved(desc: ArrayDescriptor) -> ResolvedArray {
        ResolvedArray::try_from(desc).unwrap()
    }

    fn array(space: MemorySpace, dtype: DType, shape: &[u64], data: DataPtr) -> ArrayDescriptor {
        ArrayDescriptor::contiguous(space, dtype, shape, data).unwrap()
    }

    fn system(dtype: DType, shape: &[u64], data: DataPtr) -> ArrayDescriptor {
        array(MemorySpace::System, dtype, shape, data)
    }

    unsafe fn host_copy(dst: ArrayDescriptor, src: ArrayDescriptor) -> BfResult<()> {
        unsafe { copy_array(&resolved(dst), &resolved(src), &HostOnlyCopy) }
    }

    #[test]
    fn test_direction() {
        use ResolvedSpace::*;
        let between = TransferDirection::between;
        assert_eq!(between(System, AcceleratorHost), TransferDirection::HostToHost);
        assert_eq!(between(System, AcceleratorDevice), TransferDirection::HostToDevice);
        assert_eq!(
            between(AcceleratorDevice, AcceleratorManaged),
            TransferDirection::DeviceToHost
        );
        assert_eq!(
            between(AcceleratorDevice, AcceleratorDevice),
            TransferDirection::DeviceToDevice
        );
    }

    #[test]
    fn test_extent_check_allows_reshape() {
        let a = system(DType::F32, &[4, 4], DataPtr::null());
        let b = system(DType::CF32, &[8], DataPtr::null());
        assert_eq!(check_transfer_extents(&a, &b), Ok(64));
    }

    #[test]
    fn test_extent_check_rejects_mismatch() {
        let a = system(DType::F32, &[4, 4], DataPtr::null());
        let b = system(DType::F32, &[15], DataPtr::null());
        assert_eq!(check_transfer_extents(&a, &b), Err(BfError::InvalidArgument));
    }

    #[test]
    fn test_extent_check_empty_with_huge_extents() {
        let huge = ArrayDescriptor::describe(
            MemorySpace::System,
            DType::F64,
            &[u64::MAX, u64::MAX, 0],
            &[0, 0, 0],
            DataPtr::null(),
        )
        .unwrap();
        let empty = system(DType::U8, &[0], DataPtr::null());
        assert_eq!(check_transfer_extents(&huge, &empty), Ok(0));
        assert!(unsafe { host_copy(huge, empty) }.is_ok());
    }

    #[test]
    fn test_contiguous_host_copy() {
        let src_buf: Vec<f32> = (0..6).map(|i| i as f32).collect();
        let mut dst_buf = vec![0.0f32; 6];
        let src = system(DType::F32, &[2, 3], DataPtr::from_slice(&src_buf));
        let dst = array(
            MemorySpace::AcceleratorHost,
            DType::F32,
            &[6],
            DataPtr::from_mut_slice(&mut dst_buf),
        );

        unsafe { host_copy(dst, src) }.unwrap();
        assert_eq!(dst_buf, src_buf);
    }

    #[test]
    fn test_mismatch_fails_before_copy() {
        let src_buf = [1u8; 4];
        let mut dst_buf = [0u8; 8];
        let src = system(DType::U8, &[4], DataPtr::from_slice(&src_buf));
        let dst = system(DType::U8, &[8], DataPtr::from_mut_slice(&mut dst_buf));

        let err = unsafe { host_copy(dst, src) }.unwrap_err();
        assert_eq!(err, BfError::InvalidArgument);
        assert_eq!(dst_buf, [0u8; 8]);
    }

    #[test]
    fn test_null_pointer() {
        let mut dst_buf = [0u8; 4];
        let src = system(DType::U8, &[4], DataPtr::null());
        let dst = system(DType::U8, &[4], DataPtr::from_mut_slice(&mut dst_buf));
        let err = unsafe { host_copy(dst, src) }.unwrap_err();
        assert_eq!(err, BfError::InvalidPointer);
    }

    #[test]
    fn test_empty_copy_ignores_null() {
        let src = system(DType::U8, &[0], DataPtr::null());
        let dst = array(MemorySpace::AcceleratorDevice, DType::U8, &[0, 5], DataPtr::null());
        assert!(unsafe { host_copy(dst, src) }.is_ok());
    }

    #[test]
    fn test_transposed_gather() {
        // src is a 2x3 row-major matrix; read it through its transpose.
        let src_buf: Vec<i32> = vec![1, 2, 3, 4, 5, 6];
        let mut dst_buf = vec![0i32; 6];
        let src = system(DType::I32, &[2, 3], DataPtr::from_slice(&src_buf))
            .swap_axes(0, 1)
            .unwrap();
        let dst = system(DType::I32, &[3, 2], DataPtr::from_mut_slice(&mut dst_buf));

        unsafe { host_copy(dst, src) }.unwrap();
        assert_eq!(dst_buf, vec![1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn test_strided_copy_requires_matching_element_size() {
        let src_buf = [0u16; 4];
        let mut dst_buf = [0u8; 8];
        let src = ArrayDescriptor::describe(
            MemorySpace::System,
            DType::U16,
            &[2, 2],
            &[2, 4],
            DataPtr::from_slice(&src_buf),
        )
        .unwrap();
        let dst = system(DType::U8, &[8], DataPtr::from_mut_slice(&mut dst_buf));
        let err = unsafe { host_copy(dst, src) }.unwrap_err();
        assert_eq!(err, BfError::Unsupported);
    }

    #[test]
    fn test_device_copy_without_runtime_reports_mem_op_failed() {
        let src_buf = [1.0f64; 2];
        let src = system(DType::F64, &[2], DataPtr::from_slice(&src_buf));
        let dst = array(
            MemorySpace::AcceleratorDevice,
            DType::F64,
            &[2],
            DataPtr::new(0x1000 as *mut std::ffi::c_void),
        );
        let err = unsafe { host_copy(dst, src) }.unwrap_err();
        assert_eq!(err, BfError::MemOpFailed);
    }

    #[test]
    fn test_engine_resolves_auto_and_counts() {
        let engine = Transfer::host();
        let src_buf = [7u8; 3];
        let mut dst_buf = [0u8; 3];
        let src = array(MemorySpace::Auto, DType::U8, &[3], DataPtr::from_slice(&src_buf));
        let dst = array(MemorySpace::Auto, DType::U8, &[3], DataPtr::from_mut_slice(&mut dst_buf));

        unsafe { engine.copy(&dst, &src) }.unwrap();
        assert_eq!(dst_buf, [7u8; 3]);
        assert_eq!(engine.stats().transfers(), 1);
        assert_eq!(engine.stats().bytes(), 3);

        let short = array(MemorySpace::Auto, DType::U8, &[2], DataPtr::from_slice(&src_buf));
        assert_eq!(unsafe { engine.copy(&dst, &short) }, Err(BfError::InvalidArgument));
        assert_eq!(engine.stats().failures(), 1);
    }
}
