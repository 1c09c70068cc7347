//! Fabula Store — PostgreSQL persistence for stories and their generations.
//!
//! Every repository holds a clone of the same [`sqlx::PgPool`]; the
//! finalization workflow gets a dedicated connection through
//! [`pg_story_store::PgStoryStore`].

pub mod pg_audio_generation_repository;
pub mod pg_story_repository;
pub mod pg_story_store;
pub mod pg_text_generation_repository;
mod rows;

pub use pg_audio_generation_repository::PgAudioGenerationRepository;
pub use pg_story_repository::PgStoryRepository;
pub use pg_story_store::PgStoryStore;
pub use pg_text_generation_repository::PgTextGenerationRepository;

/// Schema migrations embedded from the workspace `migrations/` directory.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");
