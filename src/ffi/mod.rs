//! The exported C ABI.
//!
//! Every symbol carries the `hs_` prefix and is declared in
//! `include/handle_shim.h`. Rust users should prefer the safe wrappers in
//! the parent modules, which are built on the `_checked` functions here.

pub mod buffer;
pub mod error;
pub mod handles;
pub mod library;
pub mod person;
pub mod raw;
mod string;

pub use buffer::*;
pub use error::{check_error, error_from_hs};
pub use handles::*;
pub use library::*;
pub use person::*;
pub use raw::*;
