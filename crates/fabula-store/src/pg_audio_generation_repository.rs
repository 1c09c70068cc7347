//! `PostgreSQL` implementation of the `AudioGenerationRepository` trait.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, instrument};

use fabula_core::error::DomainError;
use fabula_core::model::{AudioGeneration, NewAudioGeneration};
use fabula_core::repository::AudioGenerationRepository;

use crate::rows::{
    AUDIO_GENERATION_COLUMNS, AudioGenerationRow, group_by_story, missing_after_insert,
    storage_error,
};

/// PostgreSQL-backed audio generation repository.
#[derive(Debug, Clone)]
pub struct PgAudioGenerationRepository {
    pool: PgPool,
}

impl PgAudioGenerationRepository {
    /// Creates a new `PgAudioGenerationRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn find_audio_generation(
    conn: &mut PgConnection,
    id: i64,
) -> Result<Option<AudioGeneration>, sqlx::Error> {
    let sql = format!("SELECT {AUDIO_GENERATION_COLUMNS} FROM audio_generations WHERE id = $1");
    let row = sqlx::query_as::<_, AudioGenerationRow>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(AudioGeneration::from))
}

/// Inserts an audio generation on `conn` and reads it back.
pub(crate) async fn insert_audio_generation(
    conn: &mut PgConnection,
    new_generation: &NewAudioGeneration,
) -> Result<AudioGeneration, DomainError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO audio_generations \
         (story_id, text_generation_id, audio_file_id, duration_seconds, voice_name, provider) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
    )
    .bind(new_generation.story_id)
    .bind(new_generation.text_generation_id)
    .bind(&new_generation.audio_file_id)
    .bind(new_generation.duration_seconds)
    .bind(&new_generation.voice_name)
    .bind(&new_generation.provider)
    .fetch_one(&mut *conn)
    .await
    .map_err(storage_error)?;

    debug!(
        audio_generation_id = id,
        story_id = new_generation.story_id,
        "audio generation inserted"
    );

    find_audio_generation(conn, id)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| missing_after_insert("audio generation"))
}

#[async_trait]
impl AudioGenerationRepository for PgAudioGenerationRepository {
    async fn find(&self, id: i64) -> Result<Option<AudioGeneration>, DomainError> {
        let mut conn = self.pool.acquire().await.map_err(storage_error)?;
        find_audio_generation(&mut conn, id)
            .await
            .map_err(storage_error)
    }

    async fn find_by_story_id(&self, story_id: i64) -> Result<Vec<AudioGeneration>, DomainError> {
        let sql = format!(
            "SELECT {AUDIO_GENERATION_COLUMNS} FROM audio_generations \
             WHERE story_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, AudioGenerationRow>(&sql)
            .bind(story_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(rows.into_iter().map(AudioGeneration::from).collect())
    }

    async fn find_by_story_ids(
        &self,
        story_ids: &[i64],
    ) -> Result<BTreeMap<i64, Vec<AudioGeneration>>, DomainError> {
        if story_ids.is_empty() {
            return Ok(BTreeMap::new());
        }

        let sql = format!(
            "SELECT {AUDIO_GENERATION_COLUMNS} FROM audio_generations \
             WHERE story_id = ANY($1) ORDER BY story_id, created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, AudioGenerationRow>(&sql)
            .bind(story_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(group_by_story(
            rows.into_iter().map(AudioGeneration::from),
            |generation| generation.story_id,
        ))
    }

    #[instrument(skip(self, new_generation), fields(story_id = new_generation.story_id))]
    async fn create(
        &self,
        new_generation: &NewAudioGeneration,
    ) -> Result<AudioGeneration, DomainError> {
        let mut conn = self.pool.acquire().await.map_err(storage_error)?;
        insert_audio_generation(&mut conn, new_generation).await
    }

    async fn belongs_to_story(&self, id: i64, story_id: i64) -> Result<bool, DomainError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM audio_generations WHERE id = $1 AND story_id = $2)",
        )
        .bind(id)
        .bind(story_id)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)
    }
}
