//! Input validation shared by the HTTP layer and the handlers.

use fabula_core::error::DomainError;

/// Message returned for non-positive story ids.
pub const INVALID_STORY_ID: &str = "Invalid story id";

/// Collects the names of required fields that are absent.
///
/// Strings count as absent when empty.
#[derive(Debug, Default)]
pub struct RequiredFields {
    missing: Vec<String>,
}

impl RequiredFields {
    /// Starts an empty check.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires a non-empty string.
    #[must_use]
    pub fn text(mut self, name: &str, value: Option<&str>) -> Self {
        if value.is_none_or(str::is_empty) {
            self.missing.push(name.to_owned());
        }
        self
    }

    /// Requires any value.
    #[must_use]
    pub fn value<T>(mut self, name: &str, value: Option<&T>) -> Self {
        if value.is_none() {
            self.missing.push(name.to_owned());
        }
        self
    }

    /// Finishes the check.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::MissingFields` listing the absent fields in the
    /// order they were checked.
    pub fn check(self) -> Result<(), DomainError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(DomainError::MissingFields(self.missing))
        }
    }
}

/// Column widths of the bounded text fields.
pub mod widths {
    pub const TITLE: usize = 255;
    pub const KIND: usize = 50;
    pub const PROVIDER: usize = 50;
    pub const MODEL: usize = 100;
    pub const VOICE_NAME: usize = 100;
    pub const AUDIO_FILE_ID: usize = 255;
}

/// Rejects a string longer than `max` characters. Absent values pass.
///
/// # Errors
///
/// Returns `DomainError::Validation` naming the field and its limit.
pub fn max_length(name: &str, value: Option<&str>, max: usize) -> Result<(), DomainError> {
    match value {
        Some(value) if value.chars().count() > max => Err(DomainError::Validation(format!(
            "{name} must be at most {max} characters"
        ))),
        _ => Ok(()),
    }
}

/// Rejects ids that cannot name a persisted row.
///
/// # Errors
///
/// Returns `DomainError::Validation` when `id` is zero or negative.
pub fn positive_story_id(id: i64) -> Result<i64, DomainError> {
    if id > 0 {
        Ok(id)
    } else {
        Err(DomainError::Validation(INVALID_STORY_ID.to_owned()))
    }
}
