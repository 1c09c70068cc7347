//! Row types and conversions between sqlx and domain types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use fabula_core::error::DomainError;
use fabula_core::model::{AudioGeneration, Story, TextGeneration};
use sqlx::FromRow;

pub(crate) const STORY_COLUMNS: &str = "id, title, type, plot, teachings, other_notes, \
     final_text_generation_id, final_audio_generation_id, duration_minutes, created_at, updated_at";

pub(crate) const TEXT_GENERATION_COLUMNS: &str =
    "id, story_id, full_text, plot, teachings, duration_minutes, provider, model, created_at";

pub(crate) const AUDIO_GENERATION_COLUMNS: &str = "id, story_id, text_generation_id, audio_file_id, \
     duration_seconds, voice_name, provider, created_at";

#[derive(Debug, FromRow)]
pub(crate) struct StoryRow {
    id: i64,
    title: String,
    #[sqlx(rename = "type")]
    kind: String,
    plot: String,
    teachings: String,
    other_notes: Option<String>,
    final_text_generation_id: Option<i64>,
    final_audio_generation_id: Option<i64>,
    duration_minutes: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StoryRow> for Story {
    fn from(row: StoryRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            kind: row.kind,
            plot: row.plot,
            teachings: row.teachings,
            other_notes: row.other_notes,
            final_text_generation_id: row.final_text_generation_id,
            final_audio_generation_id: row.final_audio_generation_id,
            duration_minutes: row.duration_minutes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct TextGenerationRow {
    id: i64,
    story_id: i64,
    full_text: String,
    plot: Option<String>,
    teachings: Option<String>,
    duration_minutes: Option<i32>,
    provider: Option<String>,
    model: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<TextGenerationRow> for TextGeneration {
    fn from(row: TextGenerationRow) -> Self {
        Self {
            id: row.id,
            story_id: row.story_id,
            full_text: row.full_text,
            plot: row.plot,
            teachings: row.teachings,
            duration_minutes: row.duration_minutes,
            provider: row.provider,
            model: row.model,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct AudioGenerationRow {
    id: i64,
    story_id: i64,
    text_generation_id: i64,
    audio_file_id: String,
    duration_seconds: Option<i32>,
    voice_name: Option<String>,
    provider: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<AudioGenerationRow> for AudioGeneration {
    fn from(row: AudioGenerationRow) -> Self {
        Self {
            id: row.id,
            story_id: row.story_id,
            text_generation_id: row.text_generation_id,
            audio_file_id: row.audio_file_id,
            duration_seconds: row.duration_seconds,
            voice_name: row.voice_name,
            provider: row.provider,
            created_at: row.created_at,
        }
    }
}

/// Maps any sqlx failure onto the domain's storage error.
#[allow(clippy::needless_pass_by_value)]
pub(crate) fn storage_error(err: sqlx::Error) -> DomainError {
    DomainError::Storage(err.to_string())
}

/// Error for an insert whose row could not be read back.
pub(crate) fn missing_after_insert(entity: &str) -> DomainError {
    DomainError::Storage(format!("Unable to fetch {entity} after insert."))
}

/// Groups rows already ordered by recency under their story id.
pub(crate) fn group_by_story<T>(
    items: impl IntoIterator<Item = T>,
    story_id: impl Fn(&T) -> i64,
) -> BTreeMap<i64, Vec<T>> {
    let mut grouped: BTreeMap<i64, Vec<T>> = BTreeMap::new();
    for item in items {
        grouped.entry(story_id(&item)).or_default().push(item);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_by_story_preserves_order_within_groups() {
        let rows = vec![(2, "b1"), (1, "a1"), (2, "b2"), (1, "a2")];

        let grouped = group_by_story(rows, |(story_id, _)| *story_id);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[&1], vec![(1, "a1"), (1, "a2")]);
        assert_eq!(grouped[&2], vec![(2, "b1"), (2, "b2")]);
    }

    #[test]
    fn test_missing_after_insert_is_storage_error() {
        match missing_after_insert("story") {
            DomainError::Storage(msg) => assert_eq!(msg, "Unable to fetch story after insert."),
            other => panic!("expected Storage, got {other:?}"),
        }
    }
}
