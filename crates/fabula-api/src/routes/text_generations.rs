//! Routes for a story's text candidates.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use fabula_core::error::DomainError;
use fabula_core::model::TextGeneration;
use fabula_stories::application::{command_handlers, query_handlers};
use fabula_stories::domain::commands::CreateTextGeneration;
use fabula_stories::domain::validation::{RequiredFields, max_length, widths};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{ApiJson, StoryId};
use crate::state::AppState;

/// Request body for POST /api/stories/{id}/text-generations.
#[derive(Debug, Deserialize)]
pub struct CreateTextGenerationRequest {
    pub full_text: Option<String>,
    pub plot: Option<String>,
    pub teachings: Option<String>,
    pub duration_minutes: Option<i32>,
    pub provider: Option<String>,
    pub model: Option<String>,
}

impl CreateTextGenerationRequest {
    fn into_command(self, story_id: i64) -> Result<CreateTextGeneration, DomainError> {
        RequiredFields::new()
            .text("full_text", self.full_text.as_deref())
            .check()?;
        max_length("provider", self.provider.as_deref(), widths::PROVIDER)?;
        max_length("model", self.model.as_deref(), widths::MODEL)?;

        Ok(CreateTextGeneration {
            correlation_id: Uuid::new_v4(),
            story_id,
            full_text: self.full_text.unwrap_or_default(),
            plot: self.plot,
            teachings: self.teachings,
            duration_minutes: self.duration_minutes,
            provider: self.provider,
            model: self.model,
        })
    }
}

async fn list_text_generations(
    State(state): State<AppState>,
    StoryId(id): StoryId,
) -> Result<Json<Vec<TextGeneration>>, ApiError> {
    let generations = query_handlers::list_text_generations(id, state.repositories()).await?;
    Ok(Json(generations))
}

#[instrument(skip(state, request), fields(story_id = id))]
async fn create_text_generation(
    State(state): State<AppState>,
    StoryId(id): StoryId,
    ApiJson(request): ApiJson<CreateTextGenerationRequest>,
) -> Result<(StatusCode, Json<TextGeneration>), ApiError> {
    let command = request.into_command(id)?;

    info!(correlation_id = %command.correlation_id, "handling create_text_generation command");

    let generation =
        command_handlers::handle_create_text_generation(&command, state.repositories()).await?;
    Ok((StatusCode::CREATED, Json(generation)))
}

/// Returns the router for text generations.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/stories/{id}/text-generations",
        get(list_text_generations).post(create_text_generation),
    )
}
