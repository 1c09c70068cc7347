//! In-memory implementations of every repository trait, plus a store that always fails.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fabula_core::error::DomainError;
use fabula_core::model::{
    AudioGeneration, NewAudioGeneration, NewStory, NewTextGeneration, Story, StoryChanges,
    TextGeneration, TextGenerationEdit,
};
use fabula_core::repository::{
    AudioGenerationRepository, StoryRepository, StoryStore, StoryTransaction,
    TextGenerationRepository,
};

/// 2026-01-15T10:00:00Z; every write advances the clock by one second.
const EPOCH_SECONDS: i64 = 1_768_471_200;

#[derive(Debug, Clone, Default)]
struct State {
    stories: BTreeMap<i64, Story>,
    text_generations: BTreeMap<i64, TextGeneration>,
    audio_generations: BTreeMap<i64, AudioGeneration>,
    last_story_id: i64,
    last_text_generation_id: i64,
    last_audio_generation_id: i64,
    ticks: i64,
}

impl State {
    fn now(&mut self) -> DateTime<Utc> {
        self.ticks += 1;
        DateTime::from_timestamp(EPOCH_SECONDS + self.ticks, 0).unwrap_or_default()
    }

    fn touch_story(&mut self, story_id: i64) -> Option<&mut Story> {
        let now = self.now();
        let story = self.stories.get_mut(&story_id)?;
        story.updated_at = now;
        Some(story)
    }

    fn insert_story(&mut self, new_story: &NewStory) -> Story {
        self.last_story_id += 1;
        let now = self.now();
        let story = Story {
            id: self.last_story_id,
            title: new_story.title.clone(),
            kind: new_story.kind.clone(),
            plot: new_story.plot.clone(),
            teachings: new_story.teachings.clone(),
            other_notes: new_story.other_notes.clone(),
            final_text_generation_id: None,
            final_audio_generation_id: None,
            duration_minutes: new_story.duration_minutes,
            created_at: now,
            updated_at: now,
        };
        self.stories.insert(story.id, story.clone());
        story
    }

    fn insert_text_generation(
        &mut self,
        new_generation: &NewTextGeneration,
    ) -> Result<TextGeneration, DomainError> {
        if !self.stories.contains_key(&new_generation.story_id) {
            return Err(DomainError::Storage(
                "violates foreign key constraint text_generations_story_id_fkey".to_owned(),
            ));
        }
        self.last_text_generation_id += 1;
        let generation = TextGeneration {
            id: self.last_text_generation_id,
            story_id: new_generation.story_id,
            full_text: new_generation.full_text.clone(),
            plot: new_generation.plot.clone(),
            teachings: new_generation.teachings.clone(),
            duration_minutes: new_generation.duration_minutes,
            provider: new_generation.provider.clone(),
            model: new_generation.model.clone(),
            created_at: self.now(),
        };
        self.text_generations
            .insert(generation.id, generation.clone());
        Ok(generation)
    }

    fn insert_audio_generation(
        &mut self,
        new_generation: &NewAudioGeneration,
    ) -> Result<AudioGeneration, DomainError> {
        if !self.stories.contains_key(&new_generation.story_id)
            || !self
                .text_generations
                .contains_key(&new_generation.text_generation_id)
        {
            return Err(DomainError::Storage(
                "violates foreign key constraint on audio_generations".to_owned(),
            ));
        }
        self.last_audio_generation_id += 1;
        let generation = AudioGeneration {
            id: self.last_audio_generation_id,
            story_id: new_generation.story_id,
            text_generation_id: new_generation.text_generation_id,
            audio_file_id: new_generation.audio_file_id.clone(),
            duration_seconds: new_generation.duration_seconds,
            voice_name: new_generation.voice_name.clone(),
            provider: new_generation.provider.clone(),
            created_at: self.now(),
        };
        self.audio_generations
            .insert(generation.id, generation.clone());
        Ok(generation)
    }
}

fn newest_first<T: Clone>(
    items: impl Iterator<Item = T>,
    key: impl Fn(&T) -> (DateTime<Utc>, i64),
) -> Vec<T> {
    let mut items: Vec<T> = items.collect();
    items.sort_by_key(|item| std::cmp::Reverse(key(item)));
    items
}

/// An in-memory store implementing every repository trait plus
/// [`StoryStore`]. Transactions stage changes on a copy of the state and
/// publish it on commit, so rollback leaves the store untouched.
///
/// Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    begun: Arc<AtomicUsize>,
    committed: Arc<AtomicUsize>,
    fail_audio_insert: bool,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle on the same state whose transactions fail when
    /// inserting an audio generation.
    #[must_use]
    pub fn with_failing_audio_insert(&self) -> Self {
        Self {
            fail_audio_insert: true,
            ..self.clone()
        }
    }

    /// Number of transactions opened so far.
    #[must_use]
    pub fn begun_transactions(&self) -> usize {
        self.begun.load(Ordering::SeqCst)
    }

    /// Number of transactions committed so far.
    #[must_use]
    pub fn committed_transactions(&self) -> usize {
        self.committed.load(Ordering::SeqCst)
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl StoryRepository for InMemoryStore {
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Story>, DomainError> {
        let stories = newest_first(self.state().stories.values().cloned(), |s| {
            (s.created_at, s.id)
        });
        Ok(stories
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect())
    }

    async fn find(&self, id: i64) -> Result<Option<Story>, DomainError> {
        Ok(self.state().stories.get(&id).cloned())
    }

    async fn create(&self, new_story: &NewStory) -> Result<Story, DomainError> {
        Ok(self.state().insert_story(new_story))
    }

    async fn update(&self, id: i64, changes: &StoryChanges) -> Result<Option<Story>, DomainError> {
        let mut state = self.state();
        if changes.is_empty() {
            return Ok(state.stories.get(&id).cloned());
        }
        let Some(story) = state.touch_story(id) else {
            return Ok(None);
        };
        if let Some(title) = &changes.title {
            story.title.clone_from(title);
        }
        if let Some(kind) = &changes.kind {
            story.kind.clone_from(kind);
        }
        if let Some(plot) = &changes.plot {
            story.plot.clone_from(plot);
        }
        if let Some(teachings) = &changes.teachings {
            story.teachings.clone_from(teachings);
        }
        if let Some(other_notes) = &changes.other_notes {
            story.other_notes.clone_from(other_notes);
        }
        if let Some(duration_minutes) = changes.duration_minutes {
            story.duration_minutes = duration_minutes;
        }
        Ok(Some(story.clone()))
    }

    async fn update_final_generations(
        &self,
        id: i64,
        final_text_generation_id: Option<i64>,
        final_audio_generation_id: Option<i64>,
    ) -> Result<Option<Story>, DomainError> {
        let mut state = self.state();
        if final_text_generation_id.is_none() && final_audio_generation_id.is_none() {
            return Ok(state.stories.get(&id).cloned());
        }
        let Some(story) = state.touch_story(id) else {
            return Ok(None);
        };
        if final_text_generation_id.is_some() {
            story.final_text_generation_id = final_text_generation_id;
        }
        if final_audio_generation_id.is_some() {
            story.final_audio_generation_id = final_audio_generation_id;
        }
        Ok(Some(story.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, DomainError> {
        let mut state = self.state();
        if state.stories.remove(&id).is_none() {
            return Ok(false);
        }
        state.text_generations.retain(|_, g| g.story_id != id);
        state.audio_generations.retain(|_, g| g.story_id != id);
        Ok(true)
    }
}

#[async_trait]
impl TextGenerationRepository for InMemoryStore {
    async fn find(&self, id: i64) -> Result<Option<TextGeneration>, DomainError> {
        Ok(self.state().text_generations.get(&id).cloned())
    }

    async fn find_by_story_id(&self, story_id: i64) -> Result<Vec<TextGeneration>, DomainError> {
        let state = self.state();
        Ok(newest_first(
            state
                .text_generations
                .values()
                .filter(|g| g.story_id == story_id)
                .cloned(),
            |g| (g.created_at, g.id),
        ))
    }

    async fn find_by_story_ids(
        &self,
        story_ids: &[i64],
    ) -> Result<BTreeMap<i64, Vec<TextGeneration>>, DomainError> {
        let mut grouped = BTreeMap::new();
        for &story_id in story_ids {
            let generations = TextGenerationRepository::find_by_story_id(self, story_id).await?;
            if !generations.is_empty() {
                grouped.insert(story_id, generations);
            }
        }
        Ok(grouped)
    }

    async fn create(
        &self,
        new_generation: &NewTextGeneration,
    ) -> Result<TextGeneration, DomainError> {
        self.state().insert_text_generation(new_generation)
    }

    async fn create_batch(
        &self,
        new_generations: &[NewTextGeneration],
    ) -> Result<Vec<TextGeneration>, DomainError> {
        let mut state = self.state();
        let mut staged = state.clone();
        let created = new_generations
            .iter()
            .map(|new_generation| staged.insert_text_generation(new_generation))
            .collect::<Result<Vec<_>, _>>()?;
        *state = staged;
        Ok(created)
    }

    async fn belongs_to_story(&self, id: i64, story_id: i64) -> Result<bool, DomainError> {
        Ok(self
            .state()
            .text_generations
            .get(&id)
            .is_some_and(|g| g.story_id == story_id))
    }
}

#[async_trait]
impl AudioGenerationRepository for InMemoryStore {
    async fn find(&self, id: i64) -> Result<Option<AudioGeneration>, DomainError> {
        Ok(self.state().audio_generations.get(&id).cloned())
    }

    async fn find_by_story_id(&self, story_id: i64) -> Result<Vec<AudioGeneration>, DomainError> {
        let state = self.state();
        Ok(newest_first(
            state
                .audio_generations
                .values()
                .filter(|g| g.story_id == story_id)
                .cloned(),
            |g| (g.created_at, g.id),
        ))
    }

    async fn find_by_story_ids(
        &self,
        story_ids: &[i64],
    ) -> Result<BTreeMap<i64, Vec<AudioGeneration>>, DomainError> {
        let mut grouped = BTreeMap::new();
        for &story_id in story_ids {
            let generations = AudioGenerationRepository::find_by_story_id(self, story_id).await?;
            if !generations.is_empty() {
                grouped.insert(story_id, generations);
            }
        }
        Ok(grouped)
    }

    async fn create(
        &self,
        new_generation: &NewAudioGeneration,
    ) -> Result<AudioGeneration, DomainError> {
        self.state().insert_audio_generation(new_generation)
    }

    async fn belongs_to_story(&self, id: i64, story_id: i64) -> Result<bool, DomainError> {
        Ok(self
            .state()
            .audio_generations
            .get(&id)
            .is_some_and(|g| g.story_id == story_id))
    }
}

#[async_trait]
impl StoryStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoryTransaction>, DomainError> {
        self.begun.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemoryTransaction {
            staged: self.state().clone(),
            store: self.clone(),
        }))
    }
}

/// Stages changes on a private copy of the store's state.
struct InMemoryTransaction {
    store: InMemoryStore,
    staged: State,
}

#[async_trait]
impl StoryTransaction for InMemoryTransaction {
    async fn update_text_generation(
        &mut self,
        edit: &TextGenerationEdit,
    ) -> Result<(), DomainError> {
        let generation = self
            .staged
            .text_generations
            .get_mut(&edit.id)
            .ok_or_else(|| DomainError::NotFound(format!("Text generation {} not found", edit.id)))?;
        edit.apply_to(generation);
        Ok(())
    }

    async fn promote_final_text(
        &mut self,
        story_id: i64,
        text_generation_id: i64,
        duration_minutes: Option<i32>,
    ) -> Result<(), DomainError> {
        let story = self
            .staged
            .touch_story(story_id)
            .ok_or_else(DomainError::story_not_found)?;
        story.final_text_generation_id = Some(text_generation_id);
        if duration_minutes.is_some() {
            story.duration_minutes = duration_minutes;
        }
        Ok(())
    }

    async fn insert_audio_generation(
        &mut self,
        new_generation: &NewAudioGeneration,
    ) -> Result<AudioGeneration, DomainError> {
        if self.store.fail_audio_insert {
            return Err(DomainError::Storage("disk full".to_owned()));
        }
        self.staged.insert_audio_generation(new_generation)
    }

    async fn promote_final_audio(
        &mut self,
        story_id: i64,
        audio_generation_id: i64,
    ) -> Result<(), DomainError> {
        let story = self
            .staged
            .touch_story(story_id)
            .ok_or_else(DomainError::story_not_found)?;
        story.final_audio_generation_id = Some(audio_generation_id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let Self { store, staged } = *self;
        *store.state() = staged;
        store.committed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        Ok(())
    }
}

/// A store whose every operation fails with a storage error. Useful for
/// testing error-handling paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingStore;

fn connection_refused() -> DomainError {
    DomainError::Storage("connection refused".into())
}

#[async_trait]
impl StoryRepository for FailingStore {
    async fn list(&self, _limit: i64, _offset: i64) -> Result<Vec<Story>, DomainError> {
        Err(connection_refused())
    }

    async fn find(&self, _id: i64) -> Result<Option<Story>, DomainError> {
        Err(connection_refused())
    }

    async fn create(&self, _new_story: &NewStory) -> Result<Story, DomainError> {
        Err(connection_refused())
    }

    async fn update(
        &self,
        _id: i64,
        _changes: &StoryChanges,
    ) -> Result<Option<Story>, DomainError> {
        Err(connection_refused())
    }

    async fn update_final_generations(
        &self,
        _id: i64,
        _final_text_generation_id: Option<i64>,
        _final_audio_generation_id: Option<i64>,
    ) -> Result<Option<Story>, DomainError> {
        Err(connection_refused())
    }

    async fn delete(&self, _id: i64) -> Result<bool, DomainError> {
        Err(connection_refused())
    }
}

#[async_trait]
impl TextGenerationRepository for FailingStore {
    async fn find(&self, _id: i64) -> Result<Option<TextGeneration>, DomainError> {
        Err(connection_refused())
    }

    async fn find_by_story_id(&self, _story_id: i64) -> Result<Vec<TextGeneration>, DomainError> {
        Err(connection_refused())
    }

    async fn find_by_story_ids(
        &self,
        _story_ids: &[i64],
    ) -> Result<BTreeMap<i64, Vec<TextGeneration>>, DomainError> {
        Err(connection_refused())
    }

    async fn create(
        &self,
        _new_generation: &NewTextGeneration,
    ) -> Result<TextGeneration, DomainError> {
        Err(connection_refused())
    }

    async fn create_batch(
        &self,
        _new_generations: &[NewTextGeneration],
    ) -> Result<Vec<TextGeneration>, DomainError> {
        Err(connection_refused())
    }

    async fn belongs_to_story(&self, _id: i64, _story_id: i64) -> Result<bool, DomainError> {
        Err(connection_refused())
    }
}

#[async_trait]
impl AudioGenerationRepository for FailingStore {
    async fn find(&self, _id: i64) -> Result<Option<AudioGeneration>, DomainError> {
        Err(connection_refused())
    }

    async fn find_by_story_id(
        &self,
        _story_id: i64,
    ) -> Result<Vec<AudioGeneration>, DomainError> {
        Err(connection_refused())
    }

    async fn find_by_story_ids(
        &self,
        _story_ids: &[i64],
    ) -> Result<BTreeMap<i64, Vec<AudioGeneration>>, DomainError> {
        Err(connection_refused())
    }

    async fn create(
        &self,
        _new_generation: &NewAudioGeneration,
    ) -> Result<AudioGeneration, DomainError> {
        Err(connection_refused())
    }

    async fn belongs_to_story(&self, _id: i64, _story_id: i64) -> Result<bool, DomainError> {
        Err(connection_refused())
    }
}

#[async_trait]
impl StoryStore for FailingStore {
    async fn begin(&self) -> Result<Box<dyn StoryTransaction>, DomainError> {
        Err(connection_refused())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_story() -> NewStory {
        NewStory {
            title: "A".to_owned(),
            kind: "fable".to_owned(),
            plot: "p".to_owned(),
            teachings: "t".to_owned(),
            other_notes: None,
            duration_minutes: None,
        }
    }

    fn new_text(story_id: i64) -> NewTextGeneration {
        NewTextGeneration {
            story_id,
            full_text: "x".to_owned(),
            plot: None,
            teachings: None,
            duration_minutes: None,
            provider: None,
            model: None,
        }
    }

    #[tokio::test]
    async fn test_rollback_discards_staged_changes() {
        // Arrange
        let store = InMemoryStore::new();
        let story = StoryRepository::create(&store, &new_story()).await.unwrap();
        let text = TextGenerationRepository::create(&store, &new_text(story.id))
            .await
            .unwrap();

        // Act
        let mut tx = store.begin().await.unwrap();
        tx.promote_final_text(story.id, text.id, Some(3))
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        // Assert
        let reloaded = StoryRepository::find(&store, story.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded, story);
        assert_eq!(store.committed_transactions(), 0);
    }

    #[tokio::test]
    async fn test_create_batch_is_all_or_nothing() {
        let store = InMemoryStore::new();
        let story = StoryRepository::create(&store, &new_story()).await.unwrap();

        let result = store
            .create_batch(&[new_text(story.id), new_text(story.id + 100)])
            .await;

        assert!(matches!(result, Err(DomainError::Storage(_))));
        assert!(
            TextGenerationRepository::find_by_story_id(&store, story.id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_list_pages_newest_first() {
        let store = InMemoryStore::new();
        for _ in 0..3 {
            StoryRepository::create(&store, &new_story()).await.unwrap();
        }

        let page = store.list(2, 1).await.unwrap();

        let ids: Vec<i64> = page.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }
}
