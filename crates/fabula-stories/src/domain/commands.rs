//! Commands for the story context.

use fabula_core::command::Command;
use fabula_core::model::{NewStory, StoryChanges, TextGenerationEdit};
use uuid::Uuid;

/// Command to create a story and request its first text candidates.
#[derive(Debug, Clone)]
pub struct CreateStory {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The story fields.
    pub story: NewStory,
}

impl Command for CreateStory {
    fn command_type(&self) -> &'static str {
        "stories.create_story"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to partially update a story.
#[derive(Debug, Clone)]
pub struct UpdateStory {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The story identifier.
    pub story_id: i64,
    /// Fields to change.
    pub changes: StoryChanges,
}

impl Command for UpdateStory {
    fn command_type(&self) -> &'static str {
        "stories.update_story"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to delete a story and its generations.
#[derive(Debug, Clone)]
pub struct DeleteStory {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The story identifier.
    pub story_id: i64,
}

impl Command for DeleteStory {
    fn command_type(&self) -> &'static str {
        "stories.delete_story"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to point a story at already existing final generations.
#[derive(Debug, Clone)]
pub struct SetFinalGenerations {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The story identifier.
    pub story_id: i64,
    /// Text generation to mark as final, if any.
    pub final_text_generation_id: Option<i64>,
    /// Audio generation to mark as final, if any.
    pub final_audio_generation_id: Option<i64>,
}

impl Command for SetFinalGenerations {
    fn command_type(&self) -> &'static str {
        "stories.set_final_generations"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to finalize a story: apply text edits, render the chosen text to
/// audio and promote both as the story's canonical output.
#[derive(Debug, Clone)]
pub struct FinalizeStory {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The story identifier.
    pub story_id: i64,
    /// The text generation to promote.
    pub final_text_generation_id: i64,
    /// In-place edits to apply to the story's text generations.
    pub text_generations: Vec<TextGenerationEdit>,
    /// Voice override for the audio provider.
    pub voice_name: Option<String>,
    /// Provider override for the audio provider.
    pub provider: Option<String>,
}

impl Command for FinalizeStory {
    fn command_type(&self) -> &'static str {
        "stories.finalize_story"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to record a manually supplied text generation.
#[derive(Debug, Clone)]
pub struct CreateTextGeneration {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The owning story.
    pub story_id: i64,
    /// The text body.
    pub full_text: String,
    /// Plot snapshot.
    pub plot: Option<String>,
    /// Teachings snapshot.
    pub teachings: Option<String>,
    /// Reading length.
    pub duration_minutes: Option<i32>,
    /// Provider attribution.
    pub provider: Option<String>,
    /// Model attribution.
    pub model: Option<String>,
}

impl Command for CreateTextGeneration {
    fn command_type(&self) -> &'static str {
        "stories.create_text_generation"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to record an audio artifact rendered outside the finalize flow.
#[derive(Debug, Clone)]
pub struct CreateAudioGeneration {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The owning story.
    pub story_id: i64,
    /// The text generation the audio was rendered from.
    pub text_generation_id: i64,
    /// Opaque storage handle.
    pub audio_file_id: String,
    /// Audio length.
    pub duration_seconds: Option<i32>,
    /// Voice used.
    pub voice_name: Option<String>,
    /// Provider used.
    pub provider: Option<String>,
}

impl Command for CreateAudioGeneration {
    fn command_type(&self) -> &'static str {
        "stories.create_audio_generation"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
