//! Domain entities and the inputs used to create or change them.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Top-level creative-writing record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Story {
    /// Story identifier.
    pub id: i64,
    /// Story title.
    pub title: String,
    /// Story genre, e.g. "fable".
    #[serde(rename = "type")]
    pub kind: String,
    /// Plot outline supplied by the author.
    pub plot: String,
    /// Lessons the story should convey.
    pub teachings: String,
    /// Free-form notes forwarded to the generation providers.
    pub other_notes: Option<String>,
    /// The text generation chosen as canonical, if any.
    pub final_text_generation_id: Option<i64>,
    /// The audio generation chosen as canonical, if any.
    pub final_audio_generation_id: Option<i64>,
    /// Target reading length.
    pub duration_minutes: Option<i32>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// One candidate (generated or manually edited) text body for a story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextGeneration {
    /// Generation identifier.
    pub id: i64,
    /// Owning story.
    pub story_id: i64,
    /// The generated text.
    pub full_text: String,
    /// Plot snapshot at generation time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>,
    /// Teachings snapshot at generation time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teachings: Option<String>,
    /// Reading length of this text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i32>,
    /// Provider that produced the text.
    pub provider: Option<String>,
    /// Model that produced the text.
    pub model: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// One rendered audio artifact derived from a specific text generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioGeneration {
    /// Generation identifier.
    pub id: i64,
    /// Owning story.
    pub story_id: i64,
    /// The text generation this audio was rendered from.
    pub text_generation_id: i64,
    /// Opaque storage handle returned by the audio provider.
    pub audio_file_id: String,
    /// Length of the rendered audio.
    pub duration_seconds: Option<i32>,
    /// Voice used for rendering.
    pub voice_name: Option<String>,
    /// Provider that rendered the audio.
    pub provider: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A story together with all of its generations, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoryDetails {
    /// The story itself.
    #[serde(flatten)]
    pub story: Story,
    /// Text candidates for the story.
    pub text_generations: Vec<TextGeneration>,
    /// Audio renderings for the story.
    pub audio_generations: Vec<AudioGeneration>,
}

/// Fields required to create a story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStory {
    pub title: String,
    pub kind: String,
    pub plot: String,
    pub teachings: String,
    pub other_notes: Option<String>,
    pub duration_minutes: Option<i32>,
}

/// A partial story update. `None` leaves a field untouched; for nullable
/// columns `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoryChanges {
    pub title: Option<String>,
    pub kind: Option<String>,
    pub plot: Option<String>,
    pub teachings: Option<String>,
    pub other_notes: Option<Option<String>>,
    pub duration_minutes: Option<Option<i32>>,
}

impl StoryChanges {
    /// Returns `true` when no field would be modified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.kind.is_none()
            && self.plot.is_none()
            && self.teachings.is_none()
            && self.other_notes.is_none()
            && self.duration_minutes.is_none()
    }
}

/// Fields required to persist a text generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTextGeneration {
    pub story_id: i64,
    pub full_text: String,
    pub plot: Option<String>,
    pub teachings: Option<String>,
    pub duration_minutes: Option<i32>,
    pub provider: Option<String>,
    pub model: Option<String>,
}

/// An in-place edit of an existing text generation. `full_text` is always
/// replaced; the optional fields only when supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextGenerationEdit {
    pub id: i64,
    pub full_text: String,
    pub plot: Option<String>,
    pub teachings: Option<String>,
    pub duration_minutes: Option<i32>,
}

impl TextGenerationEdit {
    /// Applies this edit to a loaded generation.
    pub fn apply_to(&self, generation: &mut TextGeneration) {
        generation.full_text.clone_from(&self.full_text);
        if let Some(plot) = &self.plot {
            generation.plot = Some(plot.clone());
        }
        if let Some(teachings) = &self.teachings {
            generation.teachings = Some(teachings.clone());
        }
        if let Some(duration) = self.duration_minutes {
            generation.duration_minutes = Some(duration);
        }
    }
}

/// Fields required to persist an audio generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAudioGeneration {
    pub story_id: i64,
    pub text_generation_id: i64,
    pub audio_file_id: String,
    pub duration_seconds: Option<i32>,
    pub voice_name: Option<String>,
    pub provider: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn sample_generation() -> TextGeneration {
        TextGeneration {
            id: 7,
            story_id: 1,
            full_text: "Once upon a time".to_owned(),
            plot: Some("old plot".to_owned()),
            teachings: None,
            duration_minutes: None,
            provider: Some("acme".to_owned()),
            model: None,
            created_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_edit_replaces_text_and_keeps_unsupplied_fields() {
        // Arrange
        let mut generation = sample_generation();
        let edit = TextGenerationEdit {
            id: 7,
            full_text: "Edited".to_owned(),
            plot: None,
            teachings: Some("be kind".to_owned()),
            duration_minutes: Some(12),
        };

        // Act
        edit.apply_to(&mut generation);

        // Assert
        assert_eq!(generation.full_text, "Edited");
        assert_eq!(generation.plot.as_deref(), Some("old plot"));
        assert_eq!(generation.teachings.as_deref(), Some("be kind"));
        assert_eq!(generation.duration_minutes, Some(12));
    }

    #[test]
    fn test_story_serializes_kind_as_type() {
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let story = Story {
            id: 1,
            title: "A".to_owned(),
            kind: "fable".to_owned(),
            plot: "p".to_owned(),
            teachings: "t".to_owned(),
            other_notes: None,
            final_text_generation_id: None,
            final_audio_generation_id: None,
            duration_minutes: None,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&story).unwrap();

        assert_eq!(json["type"], "fable");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn test_text_generation_omits_absent_snapshot_fields() {
        let mut generation = sample_generation();
        generation.plot = None;

        let json = serde_json::to_value(&generation).unwrap();

        assert!(json.get("plot").is_none());
        assert!(json.get("duration_minutes").is_none());
        assert_eq!(json["full_text"], "Once upon a time");
        assert!(json["model"].is_null());
    }

    #[test]
    fn test_story_changes_is_empty_only_without_fields() {
        assert!(StoryChanges::default().is_empty());
        let changes = StoryChanges {
            other_notes: Some(None),
            ..StoryChanges::default()
        };
        assert!(!changes.is_empty());
    }
}
