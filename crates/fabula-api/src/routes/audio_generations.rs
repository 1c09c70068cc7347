//! Routes for a story's audio renderings.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use fabula_core::error::DomainError;
use fabula_core::model::AudioGeneration;
use fabula_stories::application::{command_handlers, query_handlers};
use fabula_stories::domain::commands::CreateAudioGeneration;
use fabula_stories::domain::validation::{RequiredFields, max_length, widths};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{ApiJson, StoryId};
use crate::state::AppState;

/// Request body for POST /api/stories/{id}/audio-generations.
#[derive(Debug, Deserialize)]
pub struct CreateAudioGenerationRequest {
    pub text_generation_id: Option<i64>,
    pub audio_file_id: Option<String>,
    pub duration_seconds: Option<i32>,
    pub voice_name: Option<String>,
    pub provider: Option<String>,
}

impl CreateAudioGenerationRequest {
    fn into_command(self, story_id: i64) -> Result<CreateAudioGeneration, DomainError> {
        RequiredFields::new()
            .value("text_generation_id", self.text_generation_id.as_ref())
            .text("audio_file_id", self.audio_file_id.as_deref())
            .check()?;
        max_length("audio_file_id", self.audio_file_id.as_deref(), widths::AUDIO_FILE_ID)?;
        max_length("voice_name", self.voice_name.as_deref(), widths::VOICE_NAME)?;
        max_length("provider", self.provider.as_deref(), widths::PROVIDER)?;

        Ok(CreateAudioGeneration {
            correlation_id: Uuid::new_v4(),
            story_id,
            text_generation_id: self.text_generation_id.unwrap_or_default(),
            audio_file_id: self.audio_file_id.unwrap_or_default(),
            duration_seconds: self.duration_seconds,
            voice_name: self.voice_name,
            provider: self.provider,
        })
    }
}

async fn list_audio_generations(
    State(state): State<AppState>,
    StoryId(id): StoryId,
) -> Result<Json<Vec<AudioGeneration>>, ApiError> {
    let generations = query_handlers::list_audio_generations(id, state.repositories()).await?;
    Ok(Json(generations))
}

#[instrument(skip(state, request), fields(story_id = id))]
async fn create_audio_generation(
    State(state): State<AppState>,
    StoryId(id): StoryId,
    ApiJson(request): ApiJson<CreateAudioGenerationRequest>,
) -> Result<(StatusCode, Json<AudioGeneration>), ApiError> {
    let command = request.into_command(id)?;

    info!(correlation_id = %command.correlation_id, "handling create_audio_generation command");

    let generation =
        command_handlers::handle_create_audio_generation(&command, state.repositories()).await?;
    Ok((StatusCode::CREATED, Json(generation)))
}

/// Returns the router for audio generations.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/stories/{id}/audio-generations",
        get(list_audio_generations).post(create_audio_generation),
    )
}
