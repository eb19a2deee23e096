//! Native objects addressed through handles.
//!
//! Construction never aborts on out-of-memory: every allocation goes through
//! a fallible path and surfaces `Error::AllocationFailed`.

mod buffer;
mod person;

pub use buffer::NativeBuffer;
pub use person::NativePerson;

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use crate::error::{Error, Result};

/// Move `value` to the heap, reporting allocation failure instead of aborting.
pub(crate) fn try_box<T>(value: T) -> Result<Box<T>> {
    let layout = Layout::new::<T>();
    if layout.size() == 0 {
        return Ok(Box::new(value));
    }

    // SAFETY: layout has non-zero size.
    let raw = unsafe { alloc::alloc(layout) } as *mut T;
    let ptr = NonNull::new(raw).ok_or_else(|| {
        Error::AllocationFailed(format!(
            "{} bytes for {}",
            layout.size(),
            std::any::type_name::<T>()
        ))
    })?;

    // SAFETY: ptr is freshly allocated with T's layout by the global
    // allocator, which is what Box expects to free.
    unsafe {
        ptr.as_ptr().write(value);
        Ok(Box::from_raw(ptr.as_ptr()))
    }
}

/// Copy `s` into a freshly reserved `String`.
pub(crate) fn try_string(s: &str) -> Result<String> {
    let mut out = String::new();
    out.try_reserve_exact(s.len())
        .map_err(|e| Error::AllocationFailed(format!("{} byte string: {}", s.len(), e)))?;
    out.push_str(s);
    Ok(out)
}

/// Copy `src` into a caller-supplied buffer as a NUL-terminated string.
///
/// Writes at most `dst.len() - 1` data bytes plus the terminator and returns
/// the number of data bytes written. An empty `dst` is left untouched.
pub fn copy_truncated(src: &[u8], dst: &mut [u8]) -> usize {
    let Some(room) = dst.len().checked_sub(1) else {
        return 0;
    };
    let n = src.len().min(room);
    dst[..n].copy_from_slice(&src[..n]);
    dst[n] = 0;
    n
}
