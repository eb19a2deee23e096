//! Error types for the handle-shim crate.

use thiserror::Error;

/// Result type alias for handle-shim operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for handle-shim operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Handle is null or was never issued.
    #[error("invalid handle")]
    InvalidHandle,

    /// Handle was already destroyed and is being destroyed again.
    #[error("double free")]
    DoubleFree,

    /// Handle was already destroyed and is being used.
    #[error("use after free")]
    UseAfterFree,

    /// Handle refers to an object of another kind.
    #[error("wrong handle kind: expected {expected}, found {found}")]
    WrongKind {
        /// Kind the operation works on.
        expected: String,
        /// Kind stored behind the handle.
        found: String,
    },

    /// Memory or handle table exhausted.
    #[error("allocation failed: {0}")]
    AllocationFailed(String),

    /// Function argument is invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A required pointer argument was null.
    #[error("null pointer")]
    NullPointer,

    /// Shutdown requested while handles are still live.
    #[error("{0} handles still outstanding")]
    HandlesOutstanding(usize),

    /// A panic was caught at the C boundary.
    #[error("panic: {0}")]
    Panic(String),

    /// Unknown error.
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl Error {
    /// Check if this is an invalid handle error.
    pub fn is_invalid_handle(&self) -> bool {
        matches!(self, Error::InvalidHandle)
    }

    /// Check if this is a double free error.
    pub fn is_double_free(&self) -> bool {
        matches!(self, Error::DoubleFree)
    }

    /// Check if this is a use after free error.
    pub fn is_use_after_free(&self) -> bool {
        matches!(self, Error::UseAfterFree)
    }

    /// Check if this is an allocation failure.
    pub fn is_allocation_failed(&self) -> bool {
        matches!(self, Error::AllocationFailed(_))
    }
}
