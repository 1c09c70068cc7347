//! `PostgreSQL` implementation of the `StoryRepository` trait.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::{debug, instrument};

use fabula_core::error::DomainError;
use fabula_core::model::{NewStory, Story, StoryChanges};
use fabula_core::repository::StoryRepository;

use crate::rows::{STORY_COLUMNS, StoryRow, missing_after_insert, storage_error};

/// PostgreSQL-backed story repository.
#[derive(Debug, Clone)]
pub struct PgStoryRepository {
    pool: PgPool,
}

impl PgStoryRepository {
    /// Creates a new `PgStoryRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) async fn find_story(
    conn: &mut PgConnection,
    id: i64,
) -> Result<Option<Story>, sqlx::Error> {
    let sql = format!("SELECT {STORY_COLUMNS} FROM stories WHERE id = $1");
    let row = sqlx::query_as::<_, StoryRow>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(Story::from))
}

#[async_trait]
impl StoryRepository for PgStoryRepository {
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Story>, DomainError> {
        let sql = format!(
            "SELECT {STORY_COLUMNS} FROM stories ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query_as::<_, StoryRow>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(rows.into_iter().map(Story::from).collect())
    }

    async fn find(&self, id: i64) -> Result<Option<Story>, DomainError> {
        let mut conn = self.pool.acquire().await.map_err(storage_error)?;
        find_story(&mut conn, id).await.map_err(storage_error)
    }

    #[instrument(skip(self, new_story), fields(title = %new_story.title))]
    async fn create(&self, new_story: &NewStory) -> Result<Story, DomainError> {
        let mut conn = self.pool.acquire().await.map_err(storage_error)?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO stories (title, type, plot, teachings, other_notes, duration_minutes) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(&new_story.title)
        .bind(&new_story.kind)
        .bind(&new_story.plot)
        .bind(&new_story.teachings)
        .bind(&new_story.other_notes)
        .bind(new_story.duration_minutes)
        .fetch_one(&mut *conn)
        .await
        .map_err(storage_error)?;

        debug!(story_id = id, "story inserted");

        find_story(&mut conn, id)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| missing_after_insert("story"))
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, id: i64, changes: &StoryChanges) -> Result<Option<Story>, DomainError> {
        let mut conn = self.pool.acquire().await.map_err(storage_error)?;
        if changes.is_empty() {
            return find_story(&mut conn, id).await.map_err(storage_error);
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE stories SET ");
        {
            let mut fields = builder.separated(", ");
            if let Some(title) = &changes.title {
                fields.push("title = ").push_bind_unseparated(title.clone());
            }
            if let Some(kind) = &changes.kind {
                fields.push("type = ").push_bind_unseparated(kind.clone());
            }
            if let Some(plot) = &changes.plot {
                fields.push("plot = ").push_bind_unseparated(plot.clone());
            }
            if let Some(teachings) = &changes.teachings {
                fields.push("teachings = ").push_bind_unseparated(teachings.clone());
            }
            if let Some(other_notes) = &changes.other_notes {
                fields
                    .push("other_notes = ")
                    .push_bind_unseparated(other_notes.clone());
            }
            if let Some(duration_minutes) = changes.duration_minutes {
                fields
                    .push("duration_minutes = ")
                    .push_bind_unseparated(duration_minutes);
            }
            fields.push("updated_at = NOW()");
        }
        builder.push(" WHERE id = ").push_bind(id);

        builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(storage_error)?;

        find_story(&mut conn, id).await.map_err(storage_error)
    }

    #[instrument(skip(self))]
    async fn update_final_generations(
        &self,
        id: i64,
        final_text_generation_id: Option<i64>,
        final_audio_generation_id: Option<i64>,
    ) -> Result<Option<Story>, DomainError> {
        let mut conn = self.pool.acquire().await.map_err(storage_error)?;
        if final_text_generation_id.is_none() && final_audio_generation_id.is_none() {
            return find_story(&mut conn, id).await.map_err(storage_error);
        }

        sqlx::query(
            "UPDATE stories SET \
             final_text_generation_id = COALESCE($2, final_text_generation_id), \
             final_audio_generation_id = COALESCE($3, final_audio_generation_id), \
             updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(final_text_generation_id)
        .bind(final_audio_generation_id)
        .execute(&mut *conn)
        .await
        .map_err(storage_error)?;

        find_story(&mut conn, id).await.map_err(storage_error)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> Result<bool, DomainError> {
        // Clearing the final ids first keeps the SET NULL actions on the
        // generation foreign keys from touching the row being deleted.
        let mut tx = self.pool.begin().await.map_err(storage_error)?;
        sqlx::query(
            "UPDATE stories SET final_text_generation_id = NULL, \
             final_audio_generation_id = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;

        let result = sqlx::query("DELETE FROM stories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;
        Ok(result.rows_affected() > 0)
    }
}
