//! Generation client error types.

use fabula_core::error::DomainError;
use thiserror::Error;

/// Failures talking to a generation provider.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// No endpoint URL was configured for this provider.
    #[error("AI {0} generation URL is not configured")]
    NotConfigured(&'static str),

    /// The HTTP client could not be constructed.
    #[error("unable to build HTTP client: {0}")]
    Client(String),

    /// Connecting, sending or reading the body failed (including timeouts).
    #[error("request failed: {0}")]
    Transport(String),

    /// The provider answered outside 200–299.
    #[error("API returned HTTP {0}")]
    Status(u16),

    /// The body was not a JSON object or array.
    #[error("Invalid JSON response from API")]
    InvalidJson,

    /// The JSON was well-formed but missing or mistyping required fields.
    #[error("{0}")]
    InvalidResponse(String),
}

impl From<GenerationError> for DomainError {
    fn from(err: GenerationError) -> Self {
        DomainError::Upstream(err.to_string())
    }
}
