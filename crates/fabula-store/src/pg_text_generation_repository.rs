//! `PostgreSQL` implementation of the `TextGenerationRepository` trait.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, instrument};

use fabula_core::error::DomainError;
use fabula_core::model::{NewTextGeneration, TextGeneration, TextGenerationEdit};
use fabula_core::repository::TextGenerationRepository;

use crate::rows::{
    TEXT_GENERATION_COLUMNS, TextGenerationRow, group_by_story, missing_after_insert,
    storage_error,
};

/// PostgreSQL-backed text generation repository.
#[derive(Debug, Clone)]
pub struct PgTextGenerationRepository {
    pool: PgPool,
}

impl PgTextGenerationRepository {
    /// Creates a new `PgTextGenerationRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn find_text_generation(
    conn: &mut PgConnection,
    id: i64,
) -> Result<Option<TextGeneration>, sqlx::Error> {
    let sql = format!("SELECT {TEXT_GENERATION_COLUMNS} FROM text_generations WHERE id = $1");
    let row = sqlx::query_as::<_, TextGenerationRow>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(TextGeneration::from))
}

/// Inserts a text generation on `conn` and reads it back.
pub(crate) async fn insert_text_generation(
    conn: &mut PgConnection,
    new_generation: &NewTextGeneration,
) -> Result<TextGeneration, DomainError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO text_generations \
         (story_id, full_text, plot, teachings, duration_minutes, provider, model) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
    )
    .bind(new_generation.story_id)
    .bind(&new_generation.full_text)
    .bind(&new_generation.plot)
    .bind(&new_generation.teachings)
    .bind(new_generation.duration_minutes)
    .bind(&new_generation.provider)
    .bind(&new_generation.model)
    .fetch_one(&mut *conn)
    .await
    .map_err(storage_error)?;

    debug!(
        text_generation_id = id,
        story_id = new_generation.story_id,
        "text generation inserted"
    );

    find_text_generation(conn, id)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| missing_after_insert("text generation"))
}

/// Applies an in-place edit on `conn`. Unsupplied optional fields keep
/// their stored value.
pub(crate) async fn apply_text_generation_edit(
    conn: &mut PgConnection,
    edit: &TextGenerationEdit,
) -> Result<(), DomainError> {
    let result = sqlx::query(
        "UPDATE text_generations SET \
         full_text = $2, \
         plot = COALESCE($3, plot), \
         teachings = COALESCE($4, teachings), \
         duration_minutes = COALESCE($5, duration_minutes) \
         WHERE id = $1",
    )
    .bind(edit.id)
    .bind(&edit.full_text)
    .bind(&edit.plot)
    .bind(&edit.teachings)
    .bind(edit.duration_minutes)
    .execute(conn)
    .await
    .map_err(storage_error)?;

    if result.rows_affected() == 0 {
        return Err(DomainError::NotFound(format!(
            "Text generation {} not found",
            edit.id
        )));
    }
    Ok(())
}

#[async_trait]
impl TextGenerationRepository for PgTextGenerationRepository {
    async fn find(&self, id: i64) -> Result<Option<TextGeneration>, DomainError> {
        let mut conn = self.pool.acquire().await.map_err(storage_error)?;
        find_text_generation(&mut conn, id)
            .await
            .map_err(storage_error)
    }

    async fn find_by_story_id(&self, story_id: i64) -> Result<Vec<TextGeneration>, DomainError> {
        let sql = format!(
            "SELECT {TEXT_GENERATION_COLUMNS} FROM text_generations \
             WHERE story_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, TextGenerationRow>(&sql)
            .bind(story_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(rows.into_iter().map(TextGeneration::from).collect())
    }

    async fn find_by_story_ids(
        &self,
        story_ids: &[i64],
    ) -> Result<BTreeMap<i64, Vec<TextGeneration>>, DomainError> {
        if story_ids.is_empty() {
            return Ok(BTreeMap::new());
        }

        let sql = format!(
            "SELECT {TEXT_GENERATION_COLUMNS} FROM text_generations \
             WHERE story_id = ANY($1) ORDER BY story_id, created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, TextGenerationRow>(&sql)
            .bind(story_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(group_by_story(
            rows.into_iter().map(TextGeneration::from),
            |generation| generation.story_id,
        ))
    }

    #[instrument(skip(self, new_generation), fields(story_id = new_generation.story_id))]
    async fn create(
        &self,
        new_generation: &NewTextGeneration,
    ) -> Result<TextGeneration, DomainError> {
        let mut conn = self.pool.acquire().await.map_err(storage_error)?;
        insert_text_generation(&mut conn, new_generation).await
    }

    #[instrument(skip(self, new_generations), fields(count = new_generations.len()))]
    async fn create_batch(
        &self,
        new_generations: &[NewTextGeneration],
    ) -> Result<Vec<TextGeneration>, DomainError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;
        let mut created = Vec::with_capacity(new_generations.len());
        for new_generation in new_generations {
            // An early return drops `tx`, which rolls the batch back.
            created.push(insert_text_generation(&mut tx, new_generation).await?);
        }
        tx.commit().await.map_err(storage_error)?;
        Ok(created)
    }

    async fn belongs_to_story(&self, id: i64, story_id: i64) -> Result<bool, DomainError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM text_generations WHERE id = $1 AND story_id = $2)",
        )
        .bind(id)
        .bind(story_id)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)
    }
}
