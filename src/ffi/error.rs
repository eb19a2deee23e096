//! Error conversion utilities for FFI.
//!
//! Outbound: `Error` -> code + heap message in an `HsError` out-parameter.
//! Inbound: `check_error` turns a code + `HsError` back into `Result`.

use std::any::Any;
use std::ffi::CStr;
use std::panic::{self, AssertUnwindSafe};

use super::raw::{
    hs_error_free, string_into_c, HsError, HsErrorCode, HS_ERR_ALLOCATION, HS_ERR_DOUBLE_FREE,
    HS_ERR_HANDLES_OUTSTANDING, HS_ERR_INVALID_ARGUMENT, HS_ERR_INVALID_HANDLE,
    HS_ERR_NULL_POINTER, HS_ERR_PANIC, HS_ERR_UNKNOWN, HS_ERR_USE_AFTER_FREE, HS_ERR_WRONG_KIND,
    HS_OK,
};
use crate::error::{Error, Result};

/// Map an error to its C code.
pub fn error_code(err: &Error) -> HsErrorCode {
    match err {
        Error::InvalidHandle => HS_ERR_INVALID_HANDLE,
        Error::DoubleFree => HS_ERR_DOUBLE_FREE,
        Error::UseAfterFree => HS_ERR_USE_AFTER_FREE,
        Error::WrongKind { .. } => HS_ERR_WRONG_KIND,
        Error::AllocationFailed(_) => HS_ERR_ALLOCATION,
        Error::InvalidArgument(_) => HS_ERR_INVALID_ARGUMENT,
        Error::NullPointer => HS_ERR_NULL_POINTER,
        Error::HandlesOutstanding(_) => HS_ERR_HANDLES_OUTSTANDING,
        Error::Panic(_) => HS_ERR_PANIC,
        Error::Unknown(_) => HS_ERR_UNKNOWN,
    }
}

/// Store `e` into the caller's error slot and return its code.
///
/// # Safety
///
/// `err` must be null or point to a writable `HsError`.
pub unsafe fn set_error(err: *mut HsError, e: &Error) -> HsErrorCode {
    let code = error_code(e);
    if !err.is_null() {
        let slot = &mut *err;
        // A previous message left in the slot would leak.
        hs_error_free(slot);
        slot.code = code;
        slot.message = string_into_c(&e.to_string());
    }
    code
}

/// Run one checked operation at the C boundary.
///
/// Panics are caught and reported as `HS_ERR_PANIC`; nothing unwinds into
/// the caller.
///
/// # Safety
///
/// `err` must be null or point to a writable `HsError`.
pub unsafe fn guard<F>(err: *mut HsError, op: F) -> HsErrorCode
where
    F: FnOnce() -> Result<()>,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(op))
        .unwrap_or_else(|payload| Err(Error::Panic(panic_message(payload.as_ref()))));

    match outcome {
        Ok(()) => {
            if !err.is_null() {
                hs_error_free(err);
            }
            HS_OK
        }
        Err(e) => {
            log::warn!("checked call failed: {}", e);
            set_error(err, &e)
        }
    }
}

/// Run one fast-path operation at the C boundary.
///
/// A panic is logged and turned into `fallback`, the sentinel the operation
/// would return for bad input.
pub fn guard_or<T, F>(fallback: T, op: F) -> T
where
    F: FnOnce() -> T,
{
    panic::catch_unwind(AssertUnwindSafe(op)).unwrap_or_else(|payload| {
        log::warn!("fast-path call panicked: {}", panic_message(payload.as_ref()));
        fallback
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Convert an `HsError` to a Rust Error and free its message.
///
/// # Safety
///
/// The `err` pointer must be valid and initialized.
pub unsafe fn error_from_hs(err: *mut HsError) -> Error {
    if err.is_null() {
        return Error::Unknown("null error pointer".to_string());
    }

    let err_ref = &*err;
    let code = err_ref.code;

    let message = if err_ref.message.is_null() {
        "Unknown error".to_string()
    } else {
        CStr::from_ptr(err_ref.message)
            .to_string_lossy()
            .into_owned()
    };

    hs_error_free(err);

    match code {
        HS_ERR_INVALID_HANDLE => Error::InvalidHandle,
        HS_ERR_DOUBLE_FREE => Error::DoubleFree,
        HS_ERR_USE_AFTER_FREE => Error::UseAfterFree,
        HS_ERR_WRONG_KIND => parse_wrong_kind(&message),
        HS_ERR_ALLOCATION => Error::AllocationFailed(strip_prefix(message, "allocation failed: ")),
        HS_ERR_INVALID_ARGUMENT => {
            Error::InvalidArgument(strip_prefix(message, "invalid argument: "))
        }
        HS_ERR_NULL_POINTER => Error::NullPointer,
        HS_ERR_HANDLES_OUTSTANDING => Error::HandlesOutstanding(
            message
                .split_whitespace()
                .next()
                .and_then(|n| n.parse().ok())
                .unwrap_or(0),
        ),
        HS_ERR_PANIC => Error::Panic(strip_prefix(message, "panic: ")),
        _ => Error::Unknown(message),
    }
}

fn strip_prefix(message: String, prefix: &str) -> String {
    match message.strip_prefix(prefix) {
        Some(rest) => rest.to_string(),
        None => message,
    }
}

fn parse_wrong_kind(message: &str) -> Error {
    let rest = message
        .strip_prefix("wrong handle kind: expected ")
        .unwrap_or(message);
    let (expected, found) = rest.split_once(", found ").unwrap_or((rest, ""));
    Error::WrongKind {
        expected: expected.to_string(),
        found: found.to_string(),
    }
}

/// Check an error code and convert to Result.
///
/// # Safety
///
/// The `err` pointer must be valid and initialized.
pub unsafe fn check_error(code: HsErrorCode, err: *mut HsError) -> Result<()> {
    if code == HS_OK {
        // Free the error struct even on success (safe no-op)
        if !err.is_null() {
            hs_error_free(err);
        }
        Ok(())
    } else {
        Err(error_from_hs(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn round_trip(e: Error) -> Error {
        let mut slot = HsError::default();
        unsafe {
            let code = set_error(&mut slot, &e);
            check_error(code, &mut slot).unwrap_err()
        }
    }

    #[test]
    fn test_errors_survive_the_boundary() {
        for e in [
            Error::InvalidHandle,
            Error::DoubleFree,
            Error::UseAfterFree,
            Error::WrongKind {
                expected: "person".into(),
                found: "buffer".into(),
            },
            Error::AllocationFailed("handle table full (4 live)".into()),
            Error::InvalidArgument("negative buffer size -1".into()),
            Error::NullPointer,
            Error::HandlesOutstanding(3),
            Error::Panic("boom".into()),
        ] {
            assert_eq!(round_trip(e.clone()), e);
        }
    }

    #[test]
    fn test_guard_catches_panic() {
        let mut slot = HsError::default();
        let code = unsafe { guard(&mut slot, || panic!("kaboom")) };
        assert_eq!(code, HS_ERR_PANIC);
        let e = unsafe { error_from_hs(&mut slot) };
        assert_eq!(e, Error::Panic("kaboom".into()));
        assert!(slot.message.is_null());
    }

    #[test]
    fn test_guard_ok_clears_stale_error() {
        let mut slot = HsError::default();
        unsafe { set_error(&mut slot, &Error::NullPointer) };
        let code = unsafe { guard(&mut slot, || Ok(())) };
        assert_eq!(code, HS_OK);
        assert_eq!(slot.code, HS_OK);
        assert!(slot.message.is_null());
    }

    #[test]
    fn test_guard_or_returns_sentinel_on_panic() {
        let out: *mut u8 = guard_or(std::ptr::null_mut(), || panic!("kaboom"));
        assert!(out.is_null());
        assert_eq!(guard_or(0, || -> i32 { panic!("{}", 7) }), 0);
        assert_eq!(guard_or(0, || 42), 42);
    }

    #[test]
    fn test_guard_tolerates_null_slot() {
        let code = unsafe { guard(std::ptr::null_mut(), || Err(Error::DoubleFree)) };
        assert_eq!(code, HS_ERR_DOUBLE_FREE);
    }

    #[test]
    fn test_unknown_code() {
        let mut slot = HsError {
            code: 42,
            message: string_into_c("mystery"),
        };
        let e = unsafe { check_error(42, &mut slot) }.unwrap_err();
        assert_eq!(e, Error::Unknown("mystery".into()));
    }
}
