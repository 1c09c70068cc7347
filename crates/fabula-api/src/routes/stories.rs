//! Routes for stories: CRUD, final-generation selection and finalization.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use fabula_core::error::DomainError;
use fabula_core::model::{NewStory, Story, StoryChanges, StoryDetails, TextGenerationEdit};
use fabula_stories::application::query_handlers::{self, ListStories, StoryListing};
use fabula_stories::application::{command_handlers, finalize};
use fabula_stories::domain::commands;
use fabula_stories::domain::validation::{RequiredFields, max_length, widths};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery, StoryId};
use crate::state::AppState;

/// Deserializes a field that distinguishes "absent" (`None`) from `null`
/// (`Some(None)`). Use together with `#[serde(default)]`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Query string for GET /api/stories. Values are read as integers the
/// lenient way, so `limit=abc` means `0` and is then clamped.
#[derive(Debug, Default, Deserialize)]
pub struct ListStoriesQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
    /// `1` attaches generation lists.
    pub include_generations: Option<String>,
}

impl ListStoriesQuery {
    fn into_query(self) -> ListStories {
        ListStories {
            limit: self.limit.as_deref().map(leading_integer),
            offset: self.offset.as_deref().map(leading_integer),
            include_generations: self.include_generations.as_deref().map(leading_integer) == Some(1),
        }
    }
}

/// Reads the leading optionally-signed digits of `raw`, ignoring leading
/// whitespace. No digits reads as `0`; overflow saturates.
fn leading_integer(raw: &str) -> i64 {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0_i64, |acc, digit| {
            acc.saturating_mul(10).saturating_add(i64::from(digit - b'0'))
        });
    if negative { -magnitude } else { magnitude }
}

/// Request body for POST /api/stories.
#[derive(Debug, Deserialize)]
pub struct CreateStoryRequest {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub plot: Option<String>,
    pub teachings: Option<String>,
    #[serde(alias = "duration_minutes")]
    pub duration: Option<i32>,
    #[serde(alias = "otherNotes")]
    pub other_notes: Option<String>,
}

impl CreateStoryRequest {
    fn into_new_story(self) -> Result<NewStory, DomainError> {
        RequiredFields::new()
            .text("title", self.title.as_deref())
            .text("type", self.kind.as_deref())
            .text("plot", self.plot.as_deref())
            .text("teachings", self.teachings.as_deref())
            .check()?;
        max_length("title", self.title.as_deref(), widths::TITLE)?;
        max_length("type", self.kind.as_deref(), widths::KIND)?;

        Ok(NewStory {
            title: self.title.unwrap_or_default(),
            kind: self.kind.unwrap_or_default(),
            plot: self.plot.unwrap_or_default(),
            teachings: self.teachings.unwrap_or_default(),
            other_notes: self.other_notes.filter(|notes| !notes.is_empty()),
            duration_minutes: self.duration,
        })
    }
}

/// Request body for PUT/PATCH /api/stories/{id}. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateStoryRequest {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub plot: Option<String>,
    pub teachings: Option<String>,
    #[serde(default, alias = "otherNotes", deserialize_with = "double_option")]
    pub other_notes: Option<Option<String>>,
    #[serde(default, alias = "duration", deserialize_with = "double_option")]
    pub duration_minutes: Option<Option<i32>>,
}

impl UpdateStoryRequest {
    fn into_changes(self) -> Result<StoryChanges, DomainError> {
        max_length("title", self.title.as_deref(), widths::TITLE)?;
        max_length("type", self.kind.as_deref(), widths::KIND)?;

        Ok(StoryChanges {
            title: self.title,
            kind: self.kind,
            plot: self.plot,
            teachings: self.teachings,
            other_notes: self.other_notes,
            duration_minutes: self.duration_minutes,
        })
    }
}

/// Request body for PATCH /api/stories/{id}/final-generations.
#[derive(Debug, Default, Deserialize)]
pub struct FinalGenerationsRequest {
    pub final_text_generation_id: Option<i64>,
    pub final_audio_generation_id: Option<i64>,
}

/// One entry of the finalize request's `text_generations` array.
#[derive(Debug, Deserialize)]
pub struct TextGenerationEditRequest {
    pub id: Option<i64>,
    pub full_text: Option<String>,
    pub plot: Option<String>,
    pub teachings: Option<String>,
    pub duration_minutes: Option<i32>,
}

/// Request body for POST /api/stories/{id}/finalize.
#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    pub final_text_generation_id: Option<i64>,
    pub text_generations: Option<Vec<TextGenerationEditRequest>>,
    pub voice_name: Option<String>,
    pub provider: Option<String>,
}

impl FinalizeRequest {
    fn into_command(self, story_id: i64) -> Result<commands::FinalizeStory, DomainError> {
        RequiredFields::new()
            .value("final_text_generation_id", self.final_text_generation_id.as_ref())
            .value("text_generations", self.text_generations.as_ref())
            .check()?;
        max_length("voice_name", self.voice_name.as_deref(), widths::VOICE_NAME)?;
        max_length("provider", self.provider.as_deref(), widths::PROVIDER)?;

        let text_generations = self
            .text_generations
            .unwrap_or_default()
            .into_iter()
            .map(|entry| match (entry.id, entry.full_text) {
                (Some(id), Some(full_text)) if !full_text.is_empty() => Ok(TextGenerationEdit {
                    id,
                    full_text,
                    plot: entry.plot,
                    teachings: entry.teachings,
                    duration_minutes: entry.duration_minutes,
                }),
                _ => Err(DomainError::Validation(
                    "Each text generation requires id and full_text".to_owned(),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(commands::FinalizeStory {
            correlation_id: Uuid::new_v4(),
            story_id,
            final_text_generation_id: self.final_text_generation_id.unwrap_or_default(),
            text_generations,
            voice_name: self.voice_name.filter(|v| !v.is_empty()),
            provider: self.provider.filter(|p| !p.is_empty()),
        })
    }
}

/// Response body for DELETE /api/stories/{id}.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// GET /api/stories
#[instrument(skip(state))]
async fn list_stories(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListStoriesQuery>,
) -> Result<Json<StoryListing>, ApiError> {
    let listing = query_handlers::list_stories(query.into_query(), state.repositories()).await?;
    Ok(Json(listing))
}

/// POST /api/stories
#[instrument(skip(state, request))]
async fn create_story(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateStoryRequest>,
) -> Result<(StatusCode, Json<StoryDetails>), ApiError> {
    let command = commands::CreateStory {
        correlation_id: Uuid::new_v4(),
        story: request.into_new_story()?,
    };

    info!(correlation_id = %command.correlation_id, "handling create_story command");

    let details = command_handlers::handle_create_story(
        &command,
        state.repositories(),
        state.text_generator.as_ref(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(details)))
}

/// GET /api/stories/{id}
#[instrument(skip(state), fields(story_id = id))]
async fn get_story(
    State(state): State<AppState>,
    StoryId(id): StoryId,
) -> Result<Json<StoryDetails>, ApiError> {
    Ok(Json(query_handlers::get_story(id, state.repositories()).await?))
}

/// PUT/PATCH /api/stories/{id}
#[instrument(skip(state, request), fields(story_id = id))]
async fn update_story(
    State(state): State<AppState>,
    StoryId(id): StoryId,
    ApiJson(request): ApiJson<UpdateStoryRequest>,
) -> Result<Json<Story>, ApiError> {
    let command = commands::UpdateStory {
        correlation_id: Uuid::new_v4(),
        story_id: id,
        changes: request.into_changes()?,
    };

    info!(correlation_id = %command.correlation_id, "handling update_story command");

    let story = command_handlers::handle_update_story(&command, state.repositories()).await?;
    Ok(Json(story))
}

/// DELETE /api/stories/{id}
#[instrument(skip(state), fields(story_id = id))]
async fn delete_story(
    State(state): State<AppState>,
    StoryId(id): StoryId,
) -> Result<Json<MessageResponse>, ApiError> {
    let command = commands::DeleteStory {
        correlation_id: Uuid::new_v4(),
        story_id: id,
    };

    info!(correlation_id = %command.correlation_id, "handling delete_story command");

    command_handlers::handle_delete_story(&command, state.repositories()).await?;
    Ok(Json(MessageResponse {
        message: "Story deleted",
    }))
}

/// PATCH /api/stories/{id}/final-generations
#[instrument(skip(state, request), fields(story_id = id))]
async fn set_final_generations(
    State(state): State<AppState>,
    StoryId(id): StoryId,
    ApiJson(request): ApiJson<FinalGenerationsRequest>,
) -> Result<Json<Story>, ApiError> {
    let command = commands::SetFinalGenerations {
        correlation_id: Uuid::new_v4(),
        story_id: id,
        final_text_generation_id: request.final_text_generation_id,
        final_audio_generation_id: request.final_audio_generation_id,
    };

    info!(correlation_id = %command.correlation_id, "handling set_final_generations command");

    let story =
        command_handlers::handle_set_final_generations(&command, state.repositories()).await?;
    Ok(Json(story))
}

/// POST /api/stories/{id}/finalize
#[instrument(skip(state, request), fields(story_id = id))]
async fn finalize_story(
    State(state): State<AppState>,
    StoryId(id): StoryId,
    ApiJson(request): ApiJson<FinalizeRequest>,
) -> Result<Json<StoryDetails>, ApiError> {
    let command = request.into_command(id)?;

    info!(correlation_id = %command.correlation_id, "handling finalize_story command");

    let details = finalize::handle_finalize_story(
        &command,
        state.repositories(),
        state.finalize_services(),
    )
    .await?;
    Ok(Json(details))
}

/// Returns the router for stories.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/stories", get(list_stories).post(create_story))
        .route(
            "/api/stories/{id}",
            get(get_story)
                .put(update_story)
                .patch(update_story)
                .delete(delete_story),
        )
        .route(
            "/api/stories/{id}/final-generations",
            patch(set_final_generations),
        )
        .route("/api/stories/{id}/finalize", post(finalize_story))
}
