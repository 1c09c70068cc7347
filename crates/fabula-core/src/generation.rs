//! Generation provider abstractions and their payloads.
//!
//! Providers are opaque synchronous HTTP services. Implementations report
//! every failure as [`DomainError::Upstream`].

use async_trait::async_trait;
use serde::Serialize;

use crate::error::DomainError;
use crate::model::{Story, TextGeneration};

/// Number of candidates a text provider must return per request.
pub const TEXT_CANDIDATE_COUNT: usize = 3;

/// Body sent to the text provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextGenerationRequest {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub plot: String,
    pub teachings: String,
    #[serde(rename = "duration", skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i32>,
    #[serde(rename = "otherNotes", skip_serializing_if = "Option::is_none")]
    pub other_notes: Option<String>,
}

impl From<&Story> for TextGenerationRequest {
    fn from(story: &Story) -> Self {
        Self {
            title: story.title.clone(),
            kind: story.kind.clone(),
            plot: story.plot.clone(),
            teachings: story.teachings.clone(),
            duration_minutes: story.duration_minutes,
            other_notes: story.other_notes.clone(),
        }
    }
}

/// Body sent to the audio provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioGenerationRequest {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub full_text: String,
    pub teachings: String,
    #[serde(rename = "duration", skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i32>,
    #[serde(rename = "otherNotes", skip_serializing_if = "Option::is_none")]
    pub other_notes: Option<String>,
    #[serde(rename = "voice", skip_serializing_if = "Option::is_none")]
    pub voice_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl AudioGenerationRequest {
    /// Builds the payload for rendering `final_text` of `story`. The text's
    /// own duration wins over the story's.
    #[must_use]
    pub fn for_final_text(story: &Story, final_text: &TextGeneration) -> Self {
        Self {
            title: story.title.clone(),
            kind: story.kind.clone(),
            full_text: final_text.full_text.clone(),
            teachings: story.teachings.clone(),
            duration_minutes: final_text.duration_minutes.or(story.duration_minutes),
            other_notes: story.other_notes.clone(),
            voice_name: None,
            provider: None,
        }
    }

    /// Sets the voice and provider overrides.
    #[must_use]
    pub fn with_overrides(mut self, voice_name: Option<String>, provider: Option<String>) -> Self {
        self.voice_name = voice_name;
        self.provider = provider;
        self
    }
}

/// One text candidate returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedText {
    pub generated_text: String,
}

/// The audio artifact returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedAudio {
    pub audio_file_id: String,
    pub duration_seconds: Option<i32>,
}

/// A text generation provider.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Requests exactly [`TEXT_CANDIDATE_COUNT`] candidates.
    async fn generate_text(
        &self,
        request: &TextGenerationRequest,
    ) -> Result<Vec<GeneratedText>, DomainError>;

    /// Provider name recorded on persisted candidates.
    fn provider_name(&self) -> Option<&str>;

    /// Model name recorded on persisted candidates.
    fn model_name(&self) -> Option<&str>;
}

/// An audio generation provider.
#[async_trait]
pub trait AudioGenerator: Send + Sync {
    /// Renders text to audio. May take a long time.
    async fn generate_audio(
        &self,
        request: &AudioGenerationRequest,
    ) -> Result<GeneratedAudio, DomainError>;

    /// Provider name recorded when the caller supplies no override.
    fn provider_name(&self) -> Option<&str>;
}
