//! `PostgreSQL` implementation of the transactional `StoryStore`.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

use fabula_core::error::DomainError;
use fabula_core::model::{AudioGeneration, NewAudioGeneration, TextGenerationEdit};
use fabula_core::repository::{StoryStore, StoryTransaction};

use crate::pg_audio_generation_repository::insert_audio_generation;
use crate::pg_text_generation_repository::apply_text_generation_edit;
use crate::rows::storage_error;

/// Opens `PostgreSQL` transactions for the finalization workflow.
#[derive(Debug, Clone)]
pub struct PgStoryStore {
    pool: PgPool,
}

impl PgStoryStore {
    /// Creates a new `PgStoryStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoryStore for PgStoryStore {
    async fn begin(&self) -> Result<Box<dyn StoryTransaction>, DomainError> {
        let tx = self.pool.begin().await.map_err(storage_error)?;
        debug!("story transaction started");
        Ok(Box::new(PgStoryTransaction { tx }))
    }
}

/// A unit of work pinned to one pooled connection.
pub struct PgStoryTransaction {
    tx: Transaction<'static, Postgres>,
}

fn story_vanished(story_id: i64) -> DomainError {
    DomainError::NotFound(format!("Story {story_id} not found"))
}

#[async_trait]
impl StoryTransaction for PgStoryTransaction {
    async fn update_text_generation(
        &mut self,
        edit: &TextGenerationEdit,
    ) -> Result<(), DomainError> {
        apply_text_generation_edit(&mut self.tx, edit).await
    }

    #[instrument(skip(self))]
    async fn promote_final_text(
        &mut self,
        story_id: i64,
        text_generation_id: i64,
        duration_minutes: Option<i32>,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE stories SET \
             final_text_generation_id = $2, \
             duration_minutes = COALESCE($3, duration_minutes), \
             updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(story_id)
        .bind(text_generation_id)
        .bind(duration_minutes)
        .execute(&mut *self.tx)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(story_vanished(story_id));
        }
        Ok(())
    }

    async fn insert_audio_generation(
        &mut self,
        new_generation: &NewAudioGeneration,
    ) -> Result<AudioGeneration, DomainError> {
        insert_audio_generation(&mut self.tx, new_generation).await
    }

    #[instrument(skip(self))]
    async fn promote_final_audio(
        &mut self,
        story_id: i64,
        audio_generation_id: i64,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE stories SET final_audio_generation_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(story_id)
        .bind(audio_generation_id)
        .execute(&mut *self.tx)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(story_vanished(story_id));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx.commit().await.map_err(storage_error)
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.tx.rollback().await.map_err(storage_error)
    }
}
