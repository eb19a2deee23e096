//! Person shim: `hs_person_*`.
//!
//! The plain functions are the fast path. A `PersonHandle` is the object's
//! address in disguise and nothing is checked: deleting twice, or using a
//! handle after `hs_person_delete`, is undefined behavior. The `_checked`
//! twins work on registry-issued `PersonId`s and report every contract
//! violation as an error code.

use std::os::raw::{c_char, c_int};

use super::error::{guard, guard_or};
use super::handles::{PersonHandle, PersonId};
use super::raw::{string_into_c, HsError, HsErrorCode};
use super::string::{c_str_lossy, write_c_buffer};
use crate::error::Error;
use crate::native::{try_box, NativePerson};
use crate::registry::with_registry;

unsafe fn person_mut<'a>(h: PersonHandle) -> Option<&'a mut NativePerson> {
    (h.as_raw() as *mut NativePerson).as_mut()
}

// =============================================================================
// Fast path
// =============================================================================

/// Create a person. A null `name` is taken as empty.
///
/// Returns the invalid handle if allocation fails.
///
/// # Safety
///
/// `name` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn hs_person_new(name: *const c_char, age: c_int) -> PersonHandle {
    guard_or(PersonHandle::invalid(), || {
        let name = c_str_lossy(name).unwrap_or_default();
        match NativePerson::new(&name, age).and_then(try_box) {
            Ok(person) => PersonHandle::from_raw(Box::into_raw(person) as usize),
            Err(e) => {
                log::warn!("hs_person_new: {}", e);
                PersonHandle::invalid()
            }
        }
    })
}

/// Destroy a person. A null handle is ignored.
///
/// # Safety
///
/// `h` must be null or returned by `hs_person_new` and not yet deleted.
#[no_mangle]
pub unsafe extern "C" fn hs_person_delete(h: PersonHandle) {
    guard_or((), || {
        if h.is_valid() {
            drop(Box::from_raw(h.as_raw() as *mut NativePerson));
        }
    })
}

/// Update name and age. A null `name` keeps the current name.
///
/// # Safety
///
/// `h` must be null or live; `name` must be null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn hs_person_set(h: PersonHandle, name: *const c_char, age: c_int) {
    guard_or((), || {
        let Some(person) = person_mut(h) else {
            return;
        };
        match c_str_lossy(name) {
            Some(name) => {
                if let Err(e) = person.set(&name, age) {
                    log::warn!("hs_person_set: {}", e);
                }
            }
            None => person.set_age(age),
        }
    })
}

/// Copy the name into `buf`, truncated to `size - 1` bytes plus NUL.
///
/// Returns `buf`, or null if `h` or `buf` is null or `size <= 0`.
///
/// # Safety
///
/// `h` must be null or live; `buf` must be null or writable for `size` bytes.
#[no_mangle]
pub unsafe extern "C" fn hs_person_get_name(
    h: PersonHandle,
    buf: *mut c_char,
    size: c_int,
) -> *mut c_char {
    guard_or(std::ptr::null_mut(), || {
        let Some(person) = person_mut(h) else {
            return std::ptr::null_mut();
        };
        match write_c_buffer(person.name(), buf, size) {
            Some(_) => buf,
            None => std::ptr::null_mut(),
        }
    })
}

/// Get the age, or 0 for a null handle.
///
/// # Safety
///
/// `h` must be null or live.
#[no_mangle]
pub unsafe extern "C" fn hs_person_get_age(h: PersonHandle) -> c_int {
    guard_or(0, || person_mut(h).map(|p| p.age()).unwrap_or(0))
}

// =============================================================================
// Checked path
// =============================================================================

/// Create a person and store its id in `out`.
///
/// # Safety
///
/// `name` must be null or NUL-terminated; `out` and `err` must be null or
/// writable.
#[no_mangle]
pub unsafe extern "C" fn hs_person_new_checked(
    name: *const c_char,
    age: c_int,
    out: *mut PersonId,
    err: *mut HsError,
) -> HsErrorCode {
    guard(err, || {
        let out = out.as_mut().ok_or(Error::NullPointer)?;
        let name = c_str_lossy(name).ok_or(Error::NullPointer)?;
        let person = try_box(NativePerson::new(&name, age)?)?;
        let raw = with_registry(|r| r.insert(person))?;
        *out = PersonId::from_raw(raw);
        Ok(())
    })
}

/// Destroy a person.
///
/// Fails with `HS_ERR_DOUBLE_FREE` if `h` was already destroyed and
/// `HS_ERR_INVALID_HANDLE` if it was never issued on this thread.
///
/// # Safety
///
/// `err` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn hs_person_delete_checked(h: PersonId, err: *mut HsError) -> HsErrorCode {
    guard(err, || {
        let person = with_registry(|r| r.remove::<NativePerson>(h.as_raw()))?;
        drop(person);
        Ok(())
    })
}

/// Update name and age.
///
/// # Safety
///
/// `name` must be null or NUL-terminated; `err` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn hs_person_set_checked(
    h: PersonId,
    name: *const c_char,
    age: c_int,
    err: *mut HsError,
) -> HsErrorCode {
    guard(err, || {
        let name = c_str_lossy(name).ok_or(Error::NullPointer)?;
        with_registry(|r| r.get_mut::<NativePerson>(h.as_raw())?.set(&name, age))
    })
}

/// Copy the name into `buf`, truncated to `size - 1` bytes plus NUL.
///
/// Truncation is not an error. The number of data bytes written goes to
/// `written` when it is non-null.
///
/// # Safety
///
/// `buf` must be null or writable for `size` bytes; `written` and `err`
/// must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn hs_person_get_name_checked(
    h: PersonId,
    buf: *mut c_char,
    size: c_int,
    written: *mut usize,
    err: *mut HsError,
) -> HsErrorCode {
    guard(err, || {
        if buf.is_null() {
            return Err(Error::NullPointer);
        }
        if size <= 0 {
            return Err(Error::InvalidArgument(format!("buffer size {}", size)));
        }
        let n = with_registry(|r| {
            let person = r.get::<NativePerson>(h.as_raw())?;
            write_c_buffer(person.name(), buf, size).ok_or(Error::NullPointer)
        })?;
        if let Some(written) = written.as_mut() {
            *written = n;
        }
        Ok(())
    })
}

/// Return a heap copy of the full name in `out`.
///
/// The caller frees it with `hs_free_string`.
///
/// # Safety
///
/// `out` and `err` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn hs_person_name_checked(
    h: PersonId,
    out: *mut *mut c_char,
    err: *mut HsError,
) -> HsErrorCode {
    guard(err, || {
        let out = out.as_mut().ok_or(Error::NullPointer)?;
        let copy = with_registry(|r| {
            let person = r.get::<NativePerson>(h.as_raw())?;
            Ok::<_, Error>(string_into_c(person.name()))
        })?;
        if copy.is_null() {
            return Err(Error::AllocationFailed("name copy".to_string()));
        }
        *out = copy;
        Ok(())
    })
}

/// Store the age in `out`.
///
/// # Safety
///
/// `out` and `err` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn hs_person_get_age_checked(
    h: PersonId,
    out: *mut c_int,
    err: *mut HsError,
) -> HsErrorCode {
    guard(err, || {
        let out = out.as_mut().ok_or(Error::NullPointer)?;
        *out = with_registry(|r| r.get::<NativePerson>(h.as_raw()).map(|p| p.age()))?;
        Ok(())
    })
}
