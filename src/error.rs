//! Error type shared by every lookup and removal.

use thiserror::Error;

/// Error returned when an operation targets an entry the list does not hold.
///
/// Configuration problems are never reported here: invalid settings are
/// coerced to defaults by [`Config::new`](crate::Config::new).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The key (or the minimum/maximum position) is not present.
    /// Every lookup and removal on an empty list yields this.
    #[error("key not found")]
    NotFound,
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
