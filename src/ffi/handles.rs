//! Handle types for opaque references to native objects.
//!
//! Each handle type is a newtype wrapper around a pointer-sized integer
//! (`uintptr_t` on the C side) so handle kinds cannot be mixed up in Rust.

/// Macro to define a handle type.
macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[repr(C)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name {
            _h: usize,
        }

        impl $name {
            /// Create an invalid (null) handle.
            #[inline]
            pub const fn invalid() -> Self {
                Self { _h: 0 }
            }

            /// Check if this handle is valid (non-zero).
            ///
            /// Non-zero says nothing about liveness.
            #[inline]
            pub const fn is_valid(&self) -> bool {
                self._h != 0
            }

            /// Build a handle from its raw integer value.
            #[inline]
            pub const fn from_raw(raw: usize) -> Self {
                Self { _h: raw }
            }

            /// The raw integer value seen by C callers.
            #[inline]
            pub const fn as_raw(&self) -> usize {
                self._h
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::invalid()
            }
        }
    };
}

define_handle!(
    /// Fast-path person handle: a disguised `NativePerson` pointer.
    PersonHandle
);
define_handle!(
    /// Fast-path buffer handle: a disguised `NativeBuffer` pointer.
    BufferHandle
);
define_handle!(
    /// Checked person handle issued by the registry.
    PersonId
);
define_handle!(
    /// Checked buffer handle issued by the registry.
    BufferId
);
