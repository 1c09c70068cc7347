//! Application layer: command handlers, the finalization workflow and
//! query handlers.

use fabula_core::repository::{
    AudioGenerationRepository, StoryRepository, TextGenerationRepository,
};

pub mod command_handlers;
pub mod finalize;
pub mod query_handlers;

/// The three repositories most handlers need, borrowed together.
#[derive(Clone, Copy)]
pub struct StoryRepositories<'a> {
    /// Story persistence.
    pub stories: &'a dyn StoryRepository,
    /// Text generation persistence.
    pub text_generations: &'a dyn TextGenerationRepository,
    /// Audio generation persistence.
    pub audio_generations: &'a dyn AudioGenerationRepository,
}

impl<'a> StoryRepositories<'a> {
    /// Borrows all three repositories from one value implementing them, such
    /// as an in-memory store.
    #[must_use]
    pub fn from_store<S>(store: &'a S) -> Self
    where
        S: StoryRepository + TextGenerationRepository + AudioGenerationRepository,
    {
        Self {
            stories: store,
            text_generations: store,
            audio_generations: store,
        }
    }
}
