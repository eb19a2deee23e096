//! Owned person objects.

use std::ffi::CStr;
use std::marker::PhantomData;
use std::os::raw::{c_char, c_int};
use std::ptr;

use crate::error::{Error, Result};
use crate::ffi::{self, check_error, PersonId};

/// A person owned through a checked handle.
///
/// Dropping a `Person` destroys the underlying object. Handles are tied to
/// the thread that created them, so `Person` is not `Send`.
///
/// # Example
///
/// ```
/// use handle_shim::Person;
///
/// # fn main() -> handle_shim::Result<()> {
/// let mut p = Person::new("gopher", 10)?;
/// assert_eq!(p.name()?, "gopher");
///
/// p.set("ferris", 8)?;
/// assert_eq!(p.age()?, 8);
/// # Ok(())
/// # }
/// ```
pub struct Person {
    handle: PersonId,
    _not_send: PhantomData<*const ()>,
}

impl Person {
    /// Create a person.
    pub fn new(name: &str, age: i32) -> Result<Self> {
        let name_c = to_c_string(name)?;
        unsafe {
            let mut handle = PersonId::invalid();
            let mut err = ffi::HsError::default();

            let code = ffi::hs_person_new_checked(name_c.as_ptr(), age, &mut handle, &mut err);
            check_error(code, &mut err)?;

            Ok(Self::from_id(handle))
        }
    }

    fn from_id(handle: PersonId) -> Self {
        Self {
            handle,
            _not_send: PhantomData,
        }
    }

    /// Take ownership of a handle produced by [`Person::into_raw`] or by
    /// `hs_person_new_checked`.
    ///
    /// # Safety
    ///
    /// The handle must not be owned by another `Person`, and must have been
    /// issued on the current thread.
    pub unsafe fn from_raw(handle: PersonId) -> Self {
        Self::from_id(handle)
    }

    /// Give up ownership without destroying the object.
    ///
    /// The caller becomes responsible for `hs_person_delete_checked`.
    pub fn into_raw(self) -> PersonId {
        let handle = self.handle;
        std::mem::forget(self);
        handle
    }

    /// The underlying handle.
    pub fn id(&self) -> PersonId {
        self.handle
    }

    /// The full name.
    pub fn name(&self) -> Result<String> {
        self.check_open()?;
        unsafe {
            let mut out: *mut c_char = ptr::null_mut();
            let mut err = ffi::HsError::default();

            let code = ffi::hs_person_name_checked(self.handle, &mut out, &mut err);
            check_error(code, &mut err)?;

            let s = CStr::from_ptr(out).to_string_lossy().into_owned();
            ffi::hs_free_string(out);
            Ok(s)
        }
    }

    /// Copy the name into `buf` as a NUL-terminated string.
    ///
    /// At most `buf.len() - 1` bytes of the name are copied; the rest is
    /// cut off. Returns the number of name bytes written.
    pub fn name_into(&self, buf: &mut [u8]) -> Result<usize> {
        self.check_open()?;
        let size = c_int::try_from(buf.len()).unwrap_or(c_int::MAX);
        unsafe {
            let mut written: usize = 0;
            let mut err = ffi::HsError::default();

            let code = ffi::hs_person_get_name_checked(
                self.handle,
                buf.as_mut_ptr() as *mut c_char,
                size,
                &mut written,
                &mut err,
            );
            check_error(code, &mut err)?;

            Ok(written)
        }
    }

    pub fn age(&self) -> Result<i32> {
        self.check_open()?;
        unsafe {
            let mut age: c_int = 0;
            let mut err = ffi::HsError::default();

            let code = ffi::hs_person_get_age_checked(self.handle, &mut age, &mut err);
            check_error(code, &mut err)?;

            Ok(age)
        }
    }

    /// Replace name and age.
    pub fn set(&mut self, name: &str, age: i32) -> Result<()> {
        self.check_open()?;
        let name_c = to_c_string(name)?;
        unsafe {
            let mut err = ffi::HsError::default();
            let code = ffi::hs_person_set_checked(self.handle, name_c.as_ptr(), age, &mut err);
            check_error(code, &mut err)
        }
    }

    /// Destroy the person now.
    ///
    /// This is called automatically on drop, but can be called explicitly
    /// to handle any errors. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if !self.handle.is_valid() {
            return Ok(());
        }

        unsafe {
            let mut err = ffi::HsError::default();
            let code = ffi::hs_person_delete_checked(self.handle, &mut err);
            self.handle = PersonId::invalid();
            check_error(code, &mut err)
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.handle.is_valid() {
            Ok(())
        } else {
            Err(Error::UseAfterFree)
        }
    }
}

impl Drop for Person {
    fn drop(&mut self) {
        let raw = self.handle.as_raw();
        // Ignore errors on drop
        if let Err(e) = self.close() {
            log::warn!("dropping person {:#x}: {}", raw, e);
        }
    }
}

impl std::fmt::Debug for Person {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Person")
            .field("handle", &format_args!("{:#x}", self.handle.as_raw()))
            .finish()
    }
}

/// C strings cannot carry NUL; the name is cut at the first one, matching
/// what a C caller passing the same bytes would get.
fn to_c_string(s: &str) -> Result<std::ffi::CString> {
    let end = s.find('\0').unwrap_or(s.len());
    std::ffi::CString::new(&s[..end]).map_err(|e| Error::InvalidArgument(e.to_string()))
}
