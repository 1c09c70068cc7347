//! Repository and transactional store abstractions.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::DomainError;
use crate::model::{
    AudioGeneration, NewAudioGeneration, NewStory, NewTextGeneration, Story, StoryChanges,
    TextGeneration, TextGenerationEdit,
};

/// Persistence for stories.
#[async_trait]
pub trait StoryRepository: Send + Sync {
    /// Lists stories newest first.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Story>, DomainError>;

    /// Loads a story by id.
    async fn find(&self, id: i64) -> Result<Option<Story>, DomainError>;

    /// Inserts a story and returns the freshly persisted row.
    async fn create(&self, new_story: &NewStory) -> Result<Story, DomainError>;

    /// Applies a partial update. Returns `None` if the story does not exist.
    async fn update(&self, id: i64, changes: &StoryChanges) -> Result<Option<Story>, DomainError>;

    /// Sets whichever final-generation ids are supplied. Ownership is the
    /// caller's responsibility.
    async fn update_final_generations(
        &self,
        id: i64,
        final_text_generation_id: Option<i64>,
        final_audio_generation_id: Option<i64>,
    ) -> Result<Option<Story>, DomainError>;

    /// Deletes a story and, by cascade, its generations. Returns `false` if
    /// nothing was deleted.
    async fn delete(&self, id: i64) -> Result<bool, DomainError>;
}

/// Persistence for text generations.
#[async_trait]
pub trait TextGenerationRepository: Send + Sync {
    /// Loads a text generation by id.
    async fn find(&self, id: i64) -> Result<Option<TextGeneration>, DomainError>;

    /// All text generations of a story, newest first.
    async fn find_by_story_id(&self, story_id: i64) -> Result<Vec<TextGeneration>, DomainError>;

    /// Text generations of several stories grouped by story id, newest first
    /// within each group. Stories without generations are absent from the map.
    async fn find_by_story_ids(
        &self,
        story_ids: &[i64],
    ) -> Result<BTreeMap<i64, Vec<TextGeneration>>, DomainError>;

    /// Inserts a text generation and returns the freshly persisted row.
    async fn create(&self, new_generation: &NewTextGeneration)
    -> Result<TextGeneration, DomainError>;

    /// Inserts several text generations atomically.
    async fn create_batch(
        &self,
        new_generations: &[NewTextGeneration],
    ) -> Result<Vec<TextGeneration>, DomainError>;

    /// Whether the generation `id` is owned by `story_id`.
    async fn belongs_to_story(&self, id: i64, story_id: i64) -> Result<bool, DomainError>;
}

/// Persistence for audio generations.
#[async_trait]
pub trait AudioGenerationRepository: Send + Sync {
    /// Loads an audio generation by id.
    async fn find(&self, id: i64) -> Result<Option<AudioGeneration>, DomainError>;

    /// All audio generations of a story, newest first.
    async fn find_by_story_id(&self, story_id: i64) -> Result<Vec<AudioGeneration>, DomainError>;

    /// Audio generations of several stories grouped by story id, newest first
    /// within each group.
    async fn find_by_story_ids(
        &self,
        story_ids: &[i64],
    ) -> Result<BTreeMap<i64, Vec<AudioGeneration>>, DomainError>;

    /// Inserts an audio generation and returns the freshly persisted row.
    async fn create(
        &self,
        new_generation: &NewAudioGeneration,
    ) -> Result<AudioGeneration, DomainError>;

    /// Whether the generation `id` is owned by `story_id`.
    async fn belongs_to_story(&self, id: i64, story_id: i64) -> Result<bool, DomainError>;
}

/// Opens units of work that run on a single connection.
#[async_trait]
pub trait StoryStore: Send + Sync {
    /// Begins a transaction.
    async fn begin(&self) -> Result<Box<dyn StoryTransaction>, DomainError>;
}

/// The mutations the finalization workflow performs atomically.
///
/// Nothing is visible to other readers until [`StoryTransaction::commit`]
/// succeeds. Dropping an uncommitted transaction discards its changes.
#[async_trait]
pub trait StoryTransaction: Send {
    /// Edits a text generation in place.
    async fn update_text_generation(&mut self, edit: &TextGenerationEdit)
    -> Result<(), DomainError>;

    /// Marks a text generation as the story's final text, copying its
    /// duration onto the story when one is given.
    async fn promote_final_text(
        &mut self,
        story_id: i64,
        text_generation_id: i64,
        duration_minutes: Option<i32>,
    ) -> Result<(), DomainError>;

    /// Inserts an audio generation and returns the persisted row.
    async fn insert_audio_generation(
        &mut self,
        new_generation: &NewAudioGeneration,
    ) -> Result<AudioGeneration, DomainError>;

    /// Marks an audio generation as the story's final audio.
    async fn promote_final_audio(
        &mut self,
        story_id: i64,
        audio_generation_id: i64,
    ) -> Result<(), DomainError>;

    /// Makes every change visible.
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;

    /// Discards every change.
    async fn rollback(self: Box<Self>) -> Result<(), DomainError>;
}
