//! C string and caller-buffer marshalling.

use std::borrow::Cow;
use std::ffi::CStr;
use std::os::raw::{c_char, c_int};

use crate::native::copy_truncated;

/// Borrow a NUL-terminated C string, replacing invalid UTF-8.
///
/// # Safety
///
/// `s` must be null or point to a NUL-terminated string that outlives `'a`.
pub(crate) unsafe fn c_str_lossy<'a>(s: *const c_char) -> Option<Cow<'a, str>> {
    if s.is_null() {
        None
    } else {
        Some(CStr::from_ptr(s).to_string_lossy())
    }
}

/// Copy `src` into the caller's `buf` of `size` bytes, NUL-terminated.
///
/// Returns the number of data bytes written, or `None` when `buf` is null or
/// `size` is not positive. Never touches memory past `buf + size`.
///
/// # Safety
///
/// `buf` must be null or valid for writes of `size` bytes.
pub(crate) unsafe fn write_c_buffer(src: &str, buf: *mut c_char, size: c_int) -> Option<usize> {
    if buf.is_null() || size <= 0 {
        return None;
    }
    let dst = std::slice::from_raw_parts_mut(buf as *mut u8, size as usize);
    Some(copy_truncated(src.as_bytes(), dst))
}
