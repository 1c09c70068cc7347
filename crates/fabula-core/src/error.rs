//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Input was present but invalid, or an ownership check failed.
    #[error("{0}")]
    Validation(String),

    /// One or more required fields were absent or empty.
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    /// An entity was not found.
    #[error("{0}")]
    NotFound(String),

    /// A generation provider was unreachable or answered with something unusable.
    #[error("upstream service error: {0}")]
    Upstream(String),

    /// An unexpected persistence failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl DomainError {
    /// Shorthand for the "story not found" error used across handlers.
    #[must_use]
    pub fn story_not_found() -> Self {
        Self::NotFound("Story not found".to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_message_lists_fields() {
        let err = DomainError::MissingFields(vec!["title".into(), "plot".into()]);
        assert_eq!(err.to_string(), "Missing required fields: title, plot");
    }

    #[test]
    fn test_upstream_message_is_prefixed() {
        let err = DomainError::Upstream("API returned HTTP 503".into());
        assert_eq!(
            err.to_string(),
            "upstream service error: API returned HTTP 503"
        );
    }
}
