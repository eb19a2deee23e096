//! Native objects behind opaque handles, exposed through a C ABI.
//!
//! The crate exports two families of C functions for each object kind
//! (see `include/handle_shim.h`):
//!
//! - the fast path (`hs_person_new`, `hs_buffer_data`, ...), where a handle
//!   is the object's address and misuse is undefined behavior;
//! - the checked path (`hs_person_new_checked`, ...), where handles come from
//!   a generational registry and double free, use after free, foreign
//!   handles and wrong-kind handles are reported as error codes.
//!
//! Rust callers use the owning wrappers [`Person`] and [`Buffer`], which sit
//! on the checked path and release their object on drop.
//!
//! # Example
//!
//! ```
//! use handle_shim::{Buffer, Person};
//!
//! fn main() -> handle_shim::Result<()> {
//!     handle_shim::init()?;
//!
//!     let p = Person::new("gopher", 10)?;
//!     println!("{}, {} years old.", p.name()?, p.age()?);
//!
//!     let mut buf = Buffer::new(1024)?;
//!     buf.as_mut_slice()[..5].copy_from_slice(b"hello");
//!
//!     drop(p);
//!     drop(buf);
//!     handle_shim::shutdown()?;
//!     Ok(())
//! }
//! ```
//!
//! # Threads
//!
//! Checked handles belong to the thread that created them; the wrappers are
//! not `Send`. Fast-path handles can cross threads, but then the caller
//! provides the synchronization: no locking happens inside.

pub mod buffer;
pub mod error;
pub mod ffi;
pub mod native;
pub mod person;
mod registry;
pub mod types;

// Re-export main types at the crate root
pub use buffer::Buffer;
pub use error::{Error, Result};
pub use ffi::{BufferHandle, BufferId, PersonHandle, PersonId};
pub use native::{NativeBuffer, NativePerson};
pub use person::Person;
pub use types::Options;

use std::ffi::CStr;

/// API version constants.
pub mod version {
    /// API major version.
    pub const MAJOR: i32 = 0;
    /// API minor version.
    pub const MINOR: i32 = 1;
    /// API patch version.
    pub const PATCH: i32 = 0;
}

/// Get the API version string (e.g., "0.1.0").
pub fn api_version() -> String {
    unsafe {
        let ptr = ffi::hs_api_version();
        if ptr.is_null() {
            return String::new();
        }
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

/// Check if the library is compatible with the given version.
///
/// Returns `true` if the library is compatible with code compiled against
/// the specified major.minor version.
pub fn api_version_compatible(major: i32, minor: i32) -> bool {
    ffi::hs_api_version_compatible(major, minor)
}

/// Initialize the calling thread with options from the environment.
///
/// Installs the `env_logger` backend if no logger is set yet. Optional: the
/// checked API works with default options without it. Reference counted.
pub fn init() -> Result<()> {
    init_with(Options::from_env())
}

/// Initialize the calling thread with explicit options.
pub fn init_with(options: Options) -> Result<()> {
    unsafe {
        let mut err = ffi::HsError::default();
        let code = ffi::library::init_with_options(&options, &mut err);
        ffi::check_error(code, &mut err)
    }
}

/// Balance one [`init`].
///
/// The last call fails with [`Error::HandlesOutstanding`] while the thread
/// still owns live checked handles.
pub fn shutdown() -> Result<()> {
    unsafe {
        let mut err = ffi::HsError::default();
        let code = ffi::hs_shutdown(&mut err);
        ffi::check_error(code, &mut err)
    }
}

/// Number of live checked handles on the calling thread.
pub fn live_handles() -> usize {
    ffi::hs_live_handles()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_version() {
        let version = api_version();
        assert_eq!(version, "0.1.0");
        assert_eq!(
            version,
            format!("{}.{}.{}", version::MAJOR, version::MINOR, version::PATCH)
        );
    }

    #[test]
    fn test_api_version_compatible() {
        assert!(api_version_compatible(0, 1));
        assert!(api_version_compatible(0, 0));
        assert!(!api_version_compatible(1, 0));
        assert!(!api_version_compatible(0, 99));
    }

    #[test]
    fn test_init_with_limits_handles() {
        init_with(Options { max_handles: 1 }).unwrap();
        let p = Person::new("a", 1).unwrap();
        assert!(Person::new("b", 2).unwrap_err().is_allocation_failed());
        drop(p);
        shutdown().unwrap();
    }
}
