//! Result type alias for relocp operations

/// Convenient result type used throughout the relocp workspace
pub type Result<T> = std::result::Result<T, crate::Error>;
