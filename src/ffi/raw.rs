//! C-compatible types, error codes and memory management exports.

use std::ffi::CString;
use std::os::raw::{c_char, c_int};

/// Error code returned by checked C functions.
pub type HsErrorCode = c_int;

// Error codes
pub const HS_OK: HsErrorCode = 0;
pub const HS_ERR_INVALID_HANDLE: HsErrorCode = 1;
pub const HS_ERR_DOUBLE_FREE: HsErrorCode = 2;
pub const HS_ERR_USE_AFTER_FREE: HsErrorCode = 3;
pub const HS_ERR_WRONG_KIND: HsErrorCode = 4;
pub const HS_ERR_ALLOCATION: HsErrorCode = 5;
pub const HS_ERR_INVALID_ARGUMENT: HsErrorCode = 6;
pub const HS_ERR_NULL_POINTER: HsErrorCode = 7;
pub const HS_ERR_HANDLES_OUTSTANDING: HsErrorCode = 8;
pub const HS_ERR_PANIC: HsErrorCode = 9;
pub const HS_ERR_UNKNOWN: HsErrorCode = 99;

/// C error structure.
///
/// `message` is owned by the library until `hs_error_free` is called.
#[repr(C)]
#[derive(Debug)]
pub struct HsError {
    pub code: HsErrorCode,
    pub message: *mut c_char,
}

impl Default for HsError {
    fn default() -> Self {
        Self {
            code: HS_OK,
            message: std::ptr::null_mut(),
        }
    }
}

/// Move a Rust string to the C heap.
///
/// Interior NUL bytes are dropped rather than failing. Returns null only if
/// the copy cannot be allocated.
pub(crate) fn string_into_c(s: &str) -> *mut c_char {
    let mut bytes = Vec::new();
    if bytes.try_reserve_exact(s.len() + 1).is_err() {
        return std::ptr::null_mut();
    }
    bytes.extend(s.bytes().filter(|b| *b != 0));
    match CString::new(bytes) {
        Ok(c) => c.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Free a string returned by this library.
///
/// # Safety
///
/// `s` must be null or a pointer returned by this library that has not been
/// freed yet.
#[no_mangle]
pub unsafe extern "C" fn hs_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Release the message held by an error and reset it to `HS_OK`.
///
/// # Safety
///
/// `err` must be null or point to an `HsError` filled by this library.
#[no_mangle]
pub unsafe extern "C" fn hs_error_free(err: *mut HsError) {
    if err.is_null() {
        return;
    }
    let err = &mut *err;
    hs_free_string(err.message);
    err.message = std::ptr::null_mut();
    err.code = HS_OK;
}
