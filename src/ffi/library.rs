//! Library-level exports: version, init/shutdown, diagnostics.

use std::os::raw::{c_char, c_int};

use super::error::guard;
use super::raw::{HsError, HsErrorCode};
use crate::registry::with_registry;
use crate::types::Options;
use crate::version;

const API_VERSION: &std::ffi::CStr = c"0.1.0";

/// API version string. Static; never free it.
#[no_mangle]
pub extern "C" fn hs_api_version() -> *const c_char {
    API_VERSION.as_ptr()
}

/// Whether code built against `major.minor` can use this library.
#[no_mangle]
pub extern "C" fn hs_api_version_compatible(major: c_int, minor: c_int) -> bool {
    major == version::MAJOR && minor <= version::MINOR
}

/// Initialize the calling thread: logging plus registry options read from
/// the environment. Reference counted.
///
/// # Safety
///
/// `err` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn hs_init(err: *mut HsError) -> HsErrorCode {
    init_with_options(&Options::from_env(), err)
}

pub(crate) unsafe fn init_with_options(options: &Options, err: *mut HsError) -> HsErrorCode {
    guard(err, || {
        let _ = env_logger::try_init();
        with_registry(|r| {
            r.configure(options);
            r.acquire();
            log::debug!("handle-shim initialized: {:?}", r.options());
            Ok(())
        })
    })
}

/// Balance one `hs_init`.
///
/// The last shutdown fails with `HS_ERR_HANDLES_OUTSTANDING` while the
/// thread still owns live checked handles; nothing is freed behind them.
///
/// # Safety
///
/// `err` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn hs_shutdown(err: *mut HsError) -> HsErrorCode {
    guard(err, || with_registry(|r| r.release()))
}

/// Live checked handles on the calling thread.
#[no_mangle]
pub extern "C" fn hs_live_handles() -> usize {
    with_registry(|r| Ok(r.live())).unwrap_or(0)
}
