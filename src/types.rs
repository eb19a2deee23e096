//! Configuration types.

use crate::registry::MAX_SLOTS;

/// Environment variable read by [`Options::from_env`].
pub const ENV_MAX_HANDLES: &str = "HANDLE_SHIM_MAX_HANDLES";

/// Default live-handle limit per thread.
pub const DEFAULT_MAX_HANDLES: usize = 65_536;

/// Options for the checked handle registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Maximum number of live checked handles on one thread.
    ///
    /// Creating one more fails with `Error::AllocationFailed`. Clamped to
    /// the handle layout's index range.
    pub max_handles: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_handles: DEFAULT_MAX_HANDLES.min(MAX_SLOTS),
        }
    }
}

impl Options {
    /// Defaults, overridden by `HANDLE_SHIM_MAX_HANDLES` when it holds a
    /// positive integer.
    pub fn from_env() -> Self {
        let mut opts = Self::default();
        if let Ok(value) = std::env::var(ENV_MAX_HANDLES) {
            match parse_max_handles(&value) {
                Some(n) => opts.max_handles = n,
                None => log::warn!(
                    "ignoring {}={:?}: expected a positive integer",
                    ENV_MAX_HANDLES,
                    value
                ),
            }
        }
        opts
    }

    /// Copy with `max_handles` clamped to what a handle can address.
    pub(crate) fn clamped(&self) -> Self {
        Self {
            max_handles: self.max_handles.min(MAX_SLOTS),
        }
    }
}

fn parse_max_handles(value: &str) -> Option<usize> {
    match value.trim().parse::<usize>() {
        Ok(0) | Err(_) => None,
        Ok(n) => Some(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_within_layout() {
        let opts = Options::default();
        assert!(opts.max_handles > 0);
        assert!(opts.max_handles <= MAX_SLOTS);
    }

    #[test]
    fn test_parse_max_handles() {
        assert_eq!(parse_max_handles("128"), Some(128));
        assert_eq!(parse_max_handles(" 7 "), Some(7));
        assert_eq!(parse_max_handles("0"), None);
        assert_eq!(parse_max_handles("-3"), None);
        assert_eq!(parse_max_handles("lots"), None);
    }

    #[test]
    fn test_clamped() {
        let opts = Options {
            max_handles: usize::MAX,
        };
        assert_eq!(opts.clamped().max_handles, MAX_SLOTS);
    }
}
