//! C ABI entry points.
//!
//! These functions let independently compiled components exchange array
//! descriptors and status codes with this runtime.
//!
//! # Calling Convention
//!
//! All functions use the C calling convention and are `no_mangle`.
//! Fallible functions return a status code as `c_int` (`0` is success)
//! and write results through out-pointers, which are left untouched on
//! failure. A panic inside the runtime is reported as `InternalError`
//! and never unwinds into the caller.

use std::ffi::{c_char, c_int, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::slice;

use bf_array::{row_major_strides, ArrayDescriptor, DType, DataPtr, MemorySpace, MAX_DIM};
use bf_status::{status_cstr, BfError, BfResult, StatusCode};
use tracing::error;

use crate::{accelerator_support_enabled, debug_enabled, transfer};

/// Descriptor record as seen from C.
///
/// Tags are plain integers and extents are signed, so every field is
/// validated when the record crosses into the runtime.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct BfArray {
    /// Non-owning pointer to the first element.
    pub data: *mut c_void,
    /// [`MemorySpace`] value.
    pub space: c_int,
    /// [`DType`] encoding.
    pub dtype: u32,
    /// Number of used dimensions.
    pub ndim: c_int,
    /// Extents; entries past `ndim` are ignored.
    pub shape: [i64; MAX_DIM],
    /// Byte strides; entries past `ndim` are ignored.
    pub strides: [i64; MAX_DIM],
}

impl BfArray {
    /// Validate the record.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for unknown tags, a rank outside
    /// `0..=MAX_DIM`, or a negative extent.
    pub fn to_descriptor(&self) -> BfResult<ArrayDescriptor> {
        let space = MemorySpace::try_from(self.space)?;
        let dtype = DType::from_raw(self.dtype)?;
        let ndim = checked_rank(self.ndim)?;
        ArrayDescriptor::from_signed_extents(
            space,
            dtype,
            &self.shape[..ndim],
            &self.strides[..ndim],
            DataPtr::new(self.data),
        )
    }

    /// The record for a validated descriptor.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if an extent does not fit in `i64`.
    pub fn from_descriptor(desc: &ArrayDescriptor) -> BfResult<Self> {
        let mut shape = [0i64; MAX_DIM];
        for (slot, &extent) in shape.iter_mut().zip(desc.shape()) {
            *slot = i64::try_from(extent).map_err(|_| BfError::InvalidArgument)?;
        }
        let mut strides = [0i64; MAX_DIM];
        strides[..desc.rank()].copy_from_slice(desc.strides());
        Ok(Self {
            data: desc.data().as_ptr(),
            space: desc.space().as_raw(),
            dtype: desc.dtype().as_raw(),
            // rank is bounded by MAX_DIM
            ndim: desc.rank() as c_int,
            shape,
            strides,
        })
    }
}

fn checked_rank(ndim: c_int) -> BfResult<usize> {
    usize::try_from(ndim)
        .ok()
        .filter(|&rank| rank <= MAX_DIM)
        .ok_or(BfError::InvalidArgument)
}

/// Run `body`, converting its result and any panic to a status code.
fn guarded(body: impl FnOnce() -> BfResult<()>) -> c_int {
    let status = match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(result) => StatusCode::from_result(&result),
        Err(_) => {
            error!("panic caught at C boundary");
            StatusCode::InternalError
        }
    };
    status.as_raw()
}

/// Read a caller-supplied record.
///
/// # Safety
///
/// `arr` must be null or point to a readable `BfArray`.
unsafe fn read_array(arr: *const BfArray) -> BfResult<ArrayDescriptor> {
    // Safety: forwarded from the caller.
    let arr = unsafe { arr.as_ref() }.ok_or(BfError::InvalidPointer)?;
    arr.to_descriptor()
}

/// Write through a caller-supplied out-pointer.
///
/// # Safety
///
/// `out` must be null or valid for a write of `T`.
unsafe fn write_out<T>(out: *mut T, value: T) -> BfResult<()> {
    if out.is_null() {
        return Err(BfError::InvalidPointer);
    }
    // Safety: non-null and writable per the caller.
    unsafe { out.write(value) };
    Ok(())
}

/// Get the message for a status code.
///
/// Returns a static NUL-terminated string. Unknown codes map to
/// "Unknown status code". The pointer must not be freed.
#[no_mangle]
pub extern "C" fn bf_get_status_string(status: c_int) -> *const c_char {
    status_cstr(status).as_ptr()
}

/// Returns 1 if the runtime was built with debugging support, else 0.
#[no_mangle]
pub extern "C" fn bf_get_debug_enabled() -> c_int {
    c_int::from(debug_enabled())
}

/// Returns 1 if the runtime was built with accelerator support, else 0.
#[no_mangle]
pub extern "C" fn bf_get_cuda_enabled() -> c_int {
    c_int::from(accelerator_support_enabled())
}

/// Fill in a descriptor record.
///
/// # Arguments
///
/// * `out` - Record to initialize
/// * `space` - Memory space value
/// * `dtype` - Element type encoding
/// * `ndim` - Rank, `0..=MAX_DIM`
/// * `shape` - `ndim` extents; may be null only when `ndim` is 0
/// * `strides` - `ndim` byte strides, or null for row-major
/// * `data` - Pointer to the first element; not owned
///
/// # Safety
///
/// `out` must be valid for writes. `shape` and a non-null `strides` must
/// each point to `ndim` readable values.
#[no_mangle]
pub unsafe extern "C" fn bf_array_init(
    out: *mut BfArray,
    space: c_int,
    dtype: u32,
    ndim: c_int,
    shape: *const i64,
    strides: *const i64,
    data: *mut c_void,
) -> c_int {
    guarded(|| {
        if out.is_null() {
            return Err(BfError::InvalidPointer);
        }
        let rank = checked_rank(ndim)?;
        let space = MemorySpace::try_from(space)?;
        let dtype = DType::from_raw(dtype)?;

        let shape: &[i64] = match rank {
            0 => &[],
            _ if shape.is_null() => return Err(BfError::InvalidPointer),
            // Safety: caller guarantees `ndim` readable extents.
            _ => unsafe { slice::from_raw_parts(shape, rank) },
        };
        let desc = if strides.is_null() {
            let extents = shape
                .iter()
                .map(|&e| u64::try_from(e).map_err(|_| BfError::InvalidArgument))
                .collect::<BfResult<Vec<u64>>>()?;
            let canonical = row_major_strides(&extents, dtype.size_bytes())?;
            let canonical = &canonical[..rank];
            ArrayDescriptor::describe(space, dtype, &extents, canonical, DataPtr::new(data))?
        } else {
            // Safety: caller guarantees `ndim` readable strides.
            let strides = unsafe { slice::from_raw_parts(strides, rank) };
            ArrayDescriptor::from_signed_extents(space, dtype, shape, strides, DataPtr::new(data))?
        };

        let record = BfArray::from_descriptor(&desc)?;
        // Safety: `out` is non-null and writable per the caller.
        unsafe { write_out(out, record) }
    })
}

/// Number of elements a record describes.
///
/// Reports `InvalidArgument` if the count overflows `u64`.
///
/// # Safety
///
/// `arr` must point to a readable record and `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn bf_array_element_count(arr: *const BfArray, out: *mut u64) -> c_int {
    guarded(|| {
        // Safety: forwarded from the caller.
        let desc = unsafe { read_array(arr) }?;
        let count = desc.checked_element_count()?;
        unsafe { write_out(out, count) }
    })
}

/// Number of bytes a record's elements occupy.
///
/// # Safety
///
/// `arr` must point to a readable record and `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn bf_array_byte_extent(arr: *const BfArray, out: *mut u64) -> c_int {
    guarded(|| {
        // Safety: forwarded from the caller.
        let desc = unsafe { read_array(arr) }?;
        let bytes = desc.byte_extent()?;
        unsafe { write_out(out, bytes) }
    })
}

/// Whether a record has canonical row-major strides for `elem_size`.
///
/// Writes 1 or 0 to `out`.
///
/// # Safety
///
/// `arr` must point to a readable record and `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn bf_array_is_contiguous(
    arr: *const BfArray,
    elem_size: usize,
    out: *mut c_int,
) -> c_int {
    guarded(|| {
        // Safety: forwarded from the caller.
        let desc = unsafe { read_array(arr) }?;
        unsafe { write_out(out, c_int::from(desc.is_contiguous(elem_size))) }
    })
}

/// Copy the elements of `src` into `dst`.
///
/// `Auto` spaces are resolved with the process configuration. Transfers
/// touching device-only memory report `MemOpFailed` unless an
/// accelerator copy primitive is available.
///
/// # Safety
///
/// Both records must be readable and their data pointers valid for every
/// byte they address; `dst` data must be writable.
#[no_mangle]
pub unsafe extern "C" fn bf_array_copy(dst: *const BfArray, src: *const BfArray) -> c_int {
    guarded(|| {
        // Safety: forwarded from the caller.
        let dst = unsafe { read_array(dst) }?;
        let src = unsafe { read_array(src) }?;
        unsafe { transfer().copy(&dst, &src) }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;
    use std::ptr;

    fn empty_record() -> BfArray {
        BfArray {
            data: ptr::null_mut(),
            space: 0,
            dtype: 0,
            ndim: 0,
            shape: [0; MAX_DIM],
            strides: [0; MAX_DIM],
        }
    }

    #[test]
    fn test_status_strings() {
        for code in StatusCode::ALL {
            let s = unsafe { CStr::from_ptr(bf_get_status_string(code.as_raw())) };
            assert_eq!(s.to_str().unwrap(), code.message());
        }
        let s = unsafe { CStr::from_ptr(bf_get_status_string(-42)) };
        assert_eq!(s.to_str().unwrap(), bf_status::UNKNOWN_STATUS);
    }

    #[test]
    fn test_flags() {
        assert_eq!(bf_get_debug_enabled() == 1, debug_enabled());
        assert_eq!(bf_get_cuda_enabled() == 1, accelerator_support_enabled());
    }

    #[test]
    fn test_init_canonical() {
        let mut rec = empty_record();
        let shape = [4i64, 4];
        let status = unsafe {
            bf_array_init(
                &mut rec,
                MemorySpace::System.as_raw(),
                DType::F32.as_raw(),
                2,
                shape.as_ptr(),
                ptr::null(),
                ptr::null_mut(),
            )
        };
        assert_eq!(status, 0);
        assert_eq!(rec.ndim, 2);
        assert_eq!(&rec.strides[..2], &[16, 4]);

        let mut contiguous = 0;
        assert_eq!(unsafe { bf_array_is_contiguous(&rec, 4, &mut contiguous) }, 0);
        assert_eq!(contiguous, 1);
    }

    #[test]
    fn test_init_rejects() {
        let mut rec = empty_record();
        let shape = [2i64, -1];
        let strides = [4i64, 4];
        let f32_raw = DType::F32.as_raw();
        let status = unsafe {
            bf_array_init(
                &mut rec,
                1,
                f32_raw,
                2,
                shape.as_ptr(),
                strides.as_ptr(),
                ptr::null_mut(),
            )
        };
        assert_eq!(status, StatusCode::InvalidArgument.as_raw());

        let status = unsafe {
            bf_array_init(
                &mut rec,
                1,
                f32_raw,
                4,
                shape.as_ptr(),
                strides.as_ptr(),
                ptr::null_mut(),
            )
        };
        assert_eq!(status, StatusCode::InvalidArgument.as_raw());

        let status = unsafe {
            bf_array_init(
                ptr::null_mut(),
                1,
                f32_raw,
                0,
                ptr::null(),
                ptr::null(),
                ptr::null_mut(),
            )
        };
        assert_eq!(status, StatusCode::InvalidPointer.as_raw());
    }

    #[test]
    fn test_init_canonical_for_huge_outer_extent() {
        let mut rec = empty_record();
        let shape = [1i64 << 62, 2];
        let status = unsafe {
            bf_array_init(
                &mut rec,
                MemorySpace::System.as_raw(),
                DType::F32.as_raw(),
                2,
                shape.as_ptr(),
                ptr::null(),
                ptr::null_mut(),
            )
        };
        assert_eq!(status, 0);
        assert_eq!(&rec.strides[..2], &[8, 4]);

        let mut contiguous = 0;
        assert_eq!(unsafe { bf_array_is_contiguous(&rec, 4, &mut contiguous) }, 0);
        assert_eq!(contiguous, 1);
    }

    #[test]
    fn test_element_count_overflow() {
        let rec = BfArray {
            space: MemorySpace::System.as_raw(),
            dtype: DType::U8.as_raw(),
            ndim: 3,
            shape: [i64::MAX, i64::MAX, 2],
            strides: [1, 1, 1],
            ..empty_record()
        };
        let mut count = 7u64;
        assert_eq!(
            unsafe { bf_array_element_count(&rec, &mut count) },
            StatusCode::InvalidArgument.as_raw()
        );
        assert_eq!(count, 7);

        let empty = BfArray {
            shape: [i64::MAX, i64::MAX, 0],
            ..rec
        };
        assert_eq!(unsafe { bf_array_element_count(&empty, &mut count) }, 0);
        assert_eq!(count, 0);
        let mut bytes = 7u64;
        assert_eq!(unsafe { bf_array_byte_extent(&empty, &mut bytes) }, 0);
        assert_eq!(bytes, 0);
    }

    #[test]
    fn test_null_out() {
        let rec = BfArray {
            space: MemorySpace::System.as_raw(),
            dtype: DType::U8.as_raw(),
            ..empty_record()
        };
        assert_eq!(
            unsafe { bf_array_element_count(&rec, ptr::null_mut()) },
            StatusCode::InvalidPointer.as_raw()
        );
        assert_eq!(
            unsafe { bf_array_element_count(ptr::null(), &mut 0) },
            StatusCode::InvalidPointer.as_raw()
        );
    }

    #[test]
    fn test_guarded_catches_panic() {
        let status = guarded(|| panic!("boom"));
        assert_eq!(status, StatusCode::InternalError.as_raw());
    }
}
