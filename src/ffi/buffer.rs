//! Buffer shim: `hs_buffer_*`.
//!
//! Same split as the person shim: unchecked disguised-pointer handles on the
//! fast path, registry ids on the `_checked` path.

use std::os::raw::c_int;

use super::error::{guard, guard_or};
use super::handles::{BufferHandle, BufferId};
use super::raw::{HsError, HsErrorCode};
use crate::error::{Error, Result};
use crate::native::{try_box, NativeBuffer};
use crate::registry::with_registry;

unsafe fn buffer_mut<'a>(h: BufferHandle) -> Option<&'a mut NativeBuffer> {
    (h.as_raw() as *mut NativeBuffer).as_mut()
}

fn checked_size(size: c_int) -> Result<usize> {
    usize::try_from(size)
        .map_err(|_| Error::InvalidArgument(format!("negative buffer size {}", size)))
}

fn size_to_c(size: usize) -> c_int {
    // Buffers are created from a c_int, so this never saturates in practice.
    c_int::try_from(size).unwrap_or(c_int::MAX)
}

// =============================================================================
// Fast path
// =============================================================================

/// Create a zero-filled buffer of `size` bytes.
///
/// Returns the invalid handle for a negative size or on allocation failure.
#[no_mangle]
pub extern "C" fn hs_buffer_new(size: c_int) -> BufferHandle {
    guard_or(BufferHandle::invalid(), || {
        match checked_size(size)
            .and_then(NativeBuffer::new)
            .and_then(try_box)
        {
            Ok(buffer) => BufferHandle::from_raw(Box::into_raw(buffer) as usize),
            Err(e) => {
                log::warn!("hs_buffer_new: {}", e);
                BufferHandle::invalid()
            }
        }
    })
}

/// Destroy a buffer. A null handle is ignored.
///
/// # Safety
///
/// `h` must be null or returned by `hs_buffer_new` and not yet deleted.
#[no_mangle]
pub unsafe extern "C" fn hs_buffer_delete(h: BufferHandle) {
    guard_or((), || {
        if h.is_valid() {
            drop(Box::from_raw(h.as_raw() as *mut NativeBuffer));
        }
    })
}

/// Start of the buffer's bytes; valid until the buffer is deleted.
///
/// Null only for a null handle.
///
/// # Safety
///
/// `h` must be null or live.
#[no_mangle]
pub unsafe extern "C" fn hs_buffer_data(h: BufferHandle) -> *mut u8 {
    guard_or(std::ptr::null_mut(), || {
        buffer_mut(h)
            .map(|b| b.data())
            .unwrap_or(std::ptr::null_mut())
    })
}

/// Buffer length in bytes, or 0 for a null handle.
///
/// # Safety
///
/// `h` must be null or live.
#[no_mangle]
pub unsafe extern "C" fn hs_buffer_size(h: BufferHandle) -> c_int {
    guard_or(0, || buffer_mut(h).map(|b| size_to_c(b.size())).unwrap_or(0))
}

// =============================================================================
// Checked path
// =============================================================================

/// Create a zero-filled buffer and store its id in `out`.
///
/// # Safety
///
/// `out` and `err` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn hs_buffer_new_checked(
    size: c_int,
    out: *mut BufferId,
    err: *mut HsError,
) -> HsErrorCode {
    guard(err, || {
        let out = out.as_mut().ok_or(Error::NullPointer)?;
        let buffer = try_box(NativeBuffer::new(checked_size(size)?)?)?;
        let raw = with_registry(|r| r.insert(buffer))?;
        *out = BufferId::from_raw(raw);
        Ok(())
    })
}

/// Destroy a buffer, reporting double free and invalid handles.
///
/// # Safety
///
/// `err` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn hs_buffer_delete_checked(h: BufferId, err: *mut HsError) -> HsErrorCode {
    guard(err, || {
        let buffer = with_registry(|r| r.remove::<NativeBuffer>(h.as_raw()))?;
        drop(buffer);
        Ok(())
    })
}

/// Store the start of the buffer's bytes in `out`.
///
/// # Safety
///
/// `out` and `err` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn hs_buffer_data_checked(
    h: BufferId,
    out: *mut *mut u8,
    err: *mut HsError,
) -> HsErrorCode {
    guard(err, || {
        let out = out.as_mut().ok_or(Error::NullPointer)?;
        *out = with_registry(|r| r.get_mut::<NativeBuffer>(h.as_raw()).map(|b| b.data()))?;
        Ok(())
    })
}

/// Store the buffer length in `out`.
///
/// # Safety
///
/// `out` and `err` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn hs_buffer_size_checked(
    h: BufferId,
    out: *mut c_int,
    err: *mut HsError,
) -> HsErrorCode {
    guard(err, || {
        let out = out.as_mut().ok_or(Error::NullPointer)?;
        *out = with_registry(|r| {
            r.get::<NativeBuffer>(h.as_raw())
                .map(|b| size_to_c(b.size()))
        })?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::raw::{HS_ERR_INVALID_ARGUMENT, HS_OK};

    #[test]
    fn test_fast_path_negative_size() {
        assert!(!hs_buffer_new(-1).is_valid());
    }

    #[test]
    fn test_fast_path_null_tolerance() {
        let null = BufferHandle::invalid();
        unsafe {
            assert!(hs_buffer_data(null).is_null());
            assert_eq!(hs_buffer_size(null), 0);
            hs_buffer_delete(null);
        }
    }

    #[test]
    fn test_checked_negative_size() {
        let mut id = BufferId::invalid();
        let code = unsafe { hs_buffer_new_checked(-5, &mut id, std::ptr::null_mut()) };
        assert_eq!(code, HS_ERR_INVALID_ARGUMENT);
        assert!(!id.is_valid());
    }

    #[test]
    fn test_checked_zero_size() {
        let mut id = BufferId::invalid();
        let mut data: *mut u8 = std::ptr::null_mut();
        let mut size: c_int = -1;
        unsafe {
            assert_eq!(hs_buffer_new_checked(0, &mut id, std::ptr::null_mut()), HS_OK);
            assert_eq!(hs_buffer_data_checked(id, &mut data, std::ptr::null_mut()), HS_OK);
            assert_eq!(hs_buffer_size_checked(id, &mut size, std::ptr::null_mut()), HS_OK);
            assert_eq!(hs_buffer_delete_checked(id, std::ptr::null_mut()), HS_OK);
        }
        assert!(!data.is_null());
        assert_eq!(size, 0);
    }
}
