//! Query handlers for the story context.
//!
//! Read-only lookups that hydrate stories with their generations.

use fabula_core::error::DomainError;
use fabula_core::model::{AudioGeneration, Story, StoryDetails, TextGeneration};
use serde::Serialize;
use tracing::instrument;

use crate::application::StoryRepositories;

/// Page size used when the caller gives none.
pub const DEFAULT_LIMIT: i64 = 50;
/// Largest page size a caller may request.
pub const MAX_LIMIT: i64 = 100;

/// Paging and hydration options for [`list_stories`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListStories {
    /// Requested page size; clamped to `1..=MAX_LIMIT`.
    pub limit: Option<i64>,
    /// Requested offset; negative values become zero.
    pub offset: Option<i64>,
    /// Whether to attach generation lists to every story.
    pub include_generations: bool,
}

impl ListStories {
    /// The effective `(limit, offset)` pair.
    #[must_use]
    pub fn page(&self) -> (i64, i64) {
        (
            self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            self.offset.unwrap_or(0).max(0),
        )
    }
}

/// A page of stories, bare or hydrated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StoryListing {
    /// Stories without generation lists.
    Stories(Vec<Story>),
    /// Stories with their text and audio generations.
    Detailed(Vec<StoryDetails>),
}

/// Lists stories newest first.
///
/// # Errors
///
/// Returns `DomainError::Storage` if a repository call fails.
#[instrument(skip(repos))]
pub async fn list_stories(
    query: ListStories,
    repos: StoryRepositories<'_>,
) -> Result<StoryListing, DomainError> {
    let (limit, offset) = query.page();
    let stories = repos.stories.list(limit, offset).await?;
    if !query.include_generations {
        return Ok(StoryListing::Stories(stories));
    }

    let ids: Vec<i64> = stories.iter().map(|story| story.id).collect();
    let mut texts = repos.text_generations.find_by_story_ids(&ids).await?;
    let mut audios = repos.audio_generations.find_by_story_ids(&ids).await?;

    Ok(StoryListing::Detailed(
        stories
            .into_iter()
            .map(|story| StoryDetails {
                text_generations: texts.remove(&story.id).unwrap_or_default(),
                audio_generations: audios.remove(&story.id).unwrap_or_default(),
                story,
            })
            .collect(),
    ))
}

/// Loads a story with all of its generations.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the story does not exist.
/// Returns `DomainError::Storage` if a repository call fails.
#[instrument(skip(repos))]
pub async fn get_story(
    story_id: i64,
    repos: StoryRepositories<'_>,
) -> Result<StoryDetails, DomainError> {
    let story = require_story(story_id, repos).await?;
    let text_generations = repos.text_generations.find_by_story_id(story_id).await?;
    let audio_generations = repos.audio_generations.find_by_story_id(story_id).await?;
    Ok(StoryDetails {
        story,
        text_generations,
        audio_generations,
    })
}

/// Lists a story's text generations, newest first.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the story does not exist.
pub async fn list_text_generations(
    story_id: i64,
    repos: StoryRepositories<'_>,
) -> Result<Vec<TextGeneration>, DomainError> {
    require_story(story_id, repos).await?;
    repos.text_generations.find_by_story_id(story_id).await
}

/// Lists a story's audio generations, newest first.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the story does not exist.
pub async fn list_audio_generations(
    story_id: i64,
    repos: StoryRepositories<'_>,
) -> Result<Vec<AudioGeneration>, DomainError> {
    require_story(story_id, repos).await?;
    repos.audio_generations.find_by_story_id(story_id).await
}

pub(crate) async fn require_story(
    story_id: i64,
    repos: StoryRepositories<'_>,
) -> Result<Story, DomainError> {
    repos
        .stories
        .find(story_id)
        .await?
        .ok_or_else(DomainError::story_not_found)
}
