//! Owned byte buffers.

use std::os::raw::c_int;
use std::ptr;

use crate::error::{Error, Result};
use crate::ffi::{self, check_error, BufferId};
use crate::registry::registry_alive;

/// A fixed-size, zero-filled byte buffer owned through a checked handle.
///
/// The bytes are borrowed straight from the native object, so slices handed
/// out by [`as_slice`](Buffer::as_slice) and
/// [`as_mut_slice`](Buffer::as_mut_slice) need no copy. Not `Send`.
///
/// The bytes live in the thread's registry. A `Buffer` kept in a
/// `thread_local!` can outlive that registry at thread exit; from then on it
/// reads as empty and dropping it only logs.
///
/// # Example
///
/// ```
/// use handle_shim::Buffer;
///
/// # fn main() -> handle_shim::Result<()> {
/// let mut buf = Buffer::new(1024)?;
/// buf.as_mut_slice()[..6].copy_from_slice(b"hello\0");
/// assert_eq!(&buf.as_slice()[..5], b"hello");
/// # Ok(())
/// # }
/// ```
pub struct Buffer {
    handle: BufferId,
    data: *mut u8,
    len: usize,
}

impl Buffer {
    /// Create a buffer of `size` zero bytes.
    pub fn new(size: usize) -> Result<Self> {
        let size = c_int::try_from(size)
            .map_err(|_| Error::InvalidArgument(format!("buffer size {} exceeds C int", size)))?;
        unsafe {
            let mut handle = BufferId::invalid();
            let mut err = ffi::HsError::default();

            let code = ffi::hs_buffer_new_checked(size, &mut handle, &mut err);
            check_error(code, &mut err)?;

            Self::from_raw(handle)
        }
    }

    /// Take ownership of a handle produced by [`Buffer::into_raw`] or by
    /// `hs_buffer_new_checked`.
    ///
    /// Fails without taking ownership if the handle is not a live buffer.
    ///
    /// # Safety
    ///
    /// The handle must not be owned by another `Buffer`, and nothing else
    /// may touch the bytes while this `Buffer` lives.
    pub unsafe fn from_raw(handle: BufferId) -> Result<Self> {
        let mut data: *mut u8 = ptr::null_mut();
        let mut size: c_int = 0;
        let mut err = ffi::HsError::default();

        let code = ffi::hs_buffer_data_checked(handle, &mut data, &mut err);
        check_error(code, &mut err)?;
        let code = ffi::hs_buffer_size_checked(handle, &mut size, &mut err);
        check_error(code, &mut err)?;

        Ok(Self {
            handle,
            data,
            len: usize::try_from(size).unwrap_or(0),
        })
    }

    /// Give up ownership without destroying the buffer.
    pub fn into_raw(self) -> BufferId {
        let handle = self.handle;
        std::mem::forget(self);
        handle
    }

    /// The underlying handle.
    pub fn id(&self) -> BufferId {
        self.handle
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn storage_alive(&self) -> bool {
        self.handle.is_valid() && registry_alive()
    }

    /// Empty once the buffer is closed or the thread's registry is gone.
    pub fn as_slice(&self) -> &[u8] {
        if !self.storage_alive() {
            return &[];
        }
        // SAFETY: the handle is owned by `self` and the registry still holds
        // the native buffer, so data/len describe live storage. Only `close`
        // or registry teardown frees it, and neither can run while `self` is
        // borrowed on this thread.
        unsafe { std::slice::from_raw_parts(self.data, self.len) }
    }

    /// Empty once the buffer is closed or the thread's registry is gone.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        if !self.storage_alive() {
            return &mut [];
        }
        // SAFETY: as above, and `&mut self` makes the borrow unique.
        unsafe { std::slice::from_raw_parts_mut(self.data, self.len) }
    }

    /// Destroy the buffer now. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if !self.handle.is_valid() {
            return Ok(());
        }

        unsafe {
            let mut err = ffi::HsError::default();
            let code = ffi::hs_buffer_delete_checked(self.handle, &mut err);
            self.handle = BufferId::invalid();
            self.data = ptr::null_mut();
            self.len = 0;
            check_error(code, &mut err)
        }
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        let raw = self.handle.as_raw();
        if let Err(e) = self.close() {
            log::warn!("dropping buffer {:#x}: {}", raw, e);
        }
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("handle", &format_args!("{:#x}", self.handle.as_raw()))
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_buffer_is_empty() {
        let mut b = Buffer::new(8).unwrap();
        b.close().unwrap();
        assert!(b.is_empty());
        assert!(b.as_slice().is_empty());
        assert!(b.as_mut_slice().is_empty());
        b.close().unwrap();
    }

    #[test]
    fn test_outlives_registry_at_thread_exit() {
        use std::cell::RefCell;
        use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

        static DROPPED: AtomicBool = AtomicBool::new(false);
        static REGISTRY_ALIVE: AtomicBool = AtomicBool::new(true);
        static VISIBLE_LEN: AtomicUsize = AtomicUsize::new(usize::MAX);

        struct Holder(Option<Buffer>);

        impl Drop for Holder {
            fn drop(&mut self) {
                if let Some(buf) = self.0.take() {
                    REGISTRY_ALIVE.store(registry_alive(), Ordering::SeqCst);
                    VISIBLE_LEN.store(buf.as_slice().len(), Ordering::SeqCst);
                    drop(buf);
                    DROPPED.store(true, Ordering::SeqCst);
                }
            }
        }

        thread_local! {
            static HOLDER: RefCell<Holder> = const { RefCell::new(Holder(None)) };
        }

        std::thread::spawn(|| {
            // Touch the holder first so it is torn down after the registry.
            HOLDER.with(|_| ());
            let mut buf = Buffer::new(32).unwrap();
            buf.as_mut_slice()[0] = 7;
            HOLDER.with(|h| h.borrow_mut().0 = Some(buf));
        })
        .join()
        .expect("thread exit should not panic");

        assert!(DROPPED.load(Ordering::SeqCst));
        let len = VISIBLE_LEN.load(Ordering::SeqCst);
        if REGISTRY_ALIVE.load(Ordering::SeqCst) {
            assert_eq!(len, 32);
        } else {
            assert_eq!(len, 0);
        }
    }

    #[test]
    fn test_oversized_request() {
        let err = Buffer::new(usize::MAX).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
