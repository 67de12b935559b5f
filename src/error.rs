//! Error types for authorization sessions

use thiserror::Error;

/// The main error type for session operations.
///
/// Directory failures surface as `UserNotFound`, `UnsupportedFormat` or
/// `Directory`; the refresh protocol dispatches on exactly those variants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    /// The requested operation was denied.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Credentials or authentication policy rejected the user.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// A namespace element had the wrong shape.
    #[error("invalid namespace: {0}")]
    InvalidNamespace(String),

    /// The directory has no such user.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// An authentication subsystem rejected the cached credential shape.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Any other directory failure, assumed transient.
    #[error("directory error: {0}")]
    Directory(String),

    /// No authentication restriction set matched the connection.
    #[error("authentication restriction unmet: {0}")]
    RestrictionUnmet(String),

    /// A malformed name, range or action string.
    #[error("bad value: {0}")]
    BadValue(String),

    /// Configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// The OS random source failed.
    #[error("entropy source failed: {0}")]
    Entropy(String),
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, AuthzError>;

/// Convert any displayable error to a config error
pub(crate) fn config_err<E: std::fmt::Display>(e: E) -> AuthzError {
    AuthzError::Config(e.to_string())
}
