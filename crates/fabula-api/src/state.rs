//! Shared application state.

use std::sync::Arc;

use fabula_core::generation::{AudioGenerator, TextGenerator};
use fabula_core::repository::{
    AudioGenerationRepository, StoryRepository, StoryStore, TextGenerationRepository,
};
use fabula_store::{
    PgAudioGenerationRepository, PgStoryRepository, PgStoryStore, PgTextGenerationRepository,
};
use fabula_stories::application::StoryRepositories;
use fabula_stories::application::finalize::FinalizeServices;
use sqlx::PgPool;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Story persistence.
    pub stories: Arc<dyn StoryRepository>,
    /// Text generation persistence.
    pub text_generations: Arc<dyn TextGenerationRepository>,
    /// Audio generation persistence.
    pub audio_generations: Arc<dyn AudioGenerationRepository>,
    /// Transactions for the finalization workflow.
    pub store: Arc<dyn StoryStore>,
    /// Text provider client.
    pub text_generator: Arc<dyn TextGenerator>,
    /// Audio provider client.
    pub audio_generator: Arc<dyn AudioGenerator>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        stories: Arc<dyn StoryRepository>,
        text_generations: Arc<dyn TextGenerationRepository>,
        audio_generations: Arc<dyn AudioGenerationRepository>,
        store: Arc<dyn StoryStore>,
        text_generator: Arc<dyn TextGenerator>,
        audio_generator: Arc<dyn AudioGenerator>,
    ) -> Self {
        Self {
            stories,
            text_generations,
            audio_generations,
            store,
            text_generator,
            audio_generator,
        }
    }

    /// State backed by PostgreSQL; every repository shares `pool`.
    #[must_use]
    pub fn postgres(
        pool: PgPool,
        text_generator: Arc<dyn TextGenerator>,
        audio_generator: Arc<dyn AudioGenerator>,
    ) -> Self {
        Self::new(
            Arc::new(PgStoryRepository::new(pool.clone())),
            Arc::new(PgTextGenerationRepository::new(pool.clone())),
            Arc::new(PgAudioGenerationRepository::new(pool.clone())),
            Arc::new(PgStoryStore::new(pool)),
            text_generator,
            audio_generator,
        )
    }

    /// Borrows the repositories for a handler call.
    #[must_use]
    pub fn repositories(&self) -> StoryRepositories<'_> {
        StoryRepositories {
            stories: self.stories.as_ref(),
            text_generations: self.text_generations.as_ref(),
            audio_generations: self.audio_generations.as_ref(),
        }
    }

    /// Borrows the finalization collaborators.
    #[must_use]
    pub fn finalize_services(&self) -> FinalizeServices<'_> {
        FinalizeServices {
            store: self.store.as_ref(),
            audio_generator: self.audio_generator.as_ref(),
        }
    }
}
