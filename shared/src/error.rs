//! Error types for the Kokotajlo chat backend.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur inside the chat backend.
///
/// None of these ever reach a chat caller directly: provider tiers turn them
/// into failed [`ProviderResult`](crate::providers::ProviderResult)s and the
/// catalog turns them into an empty catalog.
#[derive(Error, Debug)]
pub enum Error {
    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),


    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catalog source could not be used
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Upstream provider answered with something unusable
    #[error("Provider error: {0}")]
    Provider(String),

    /// HTTP transport error (includes timeouts)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            _ => 500,
        }
    }

    /// Machine-readable error type used in the JSON error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            _ => "internal_server_error",
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Error::Validation(errors.to_string())
    }
}
