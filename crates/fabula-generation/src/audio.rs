//! Audio generation client.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, instrument};

use fabula_core::error::DomainError;
use fabula_core::generation::{AudioGenerationRequest, AudioGenerator, GeneratedAudio};

use crate::config::ClientConfig;
use crate::error::GenerationError;
use crate::http::JsonPoster;

/// Calls the audio provider. Requests can take up to the configured
/// timeout (an hour by default).
#[derive(Debug, Clone)]
pub struct HttpAudioGenerator {
    poster: JsonPoster,
    provider: Option<String>,
}

impl HttpAudioGenerator {
    /// Creates a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::Client` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, GenerationError> {
        Ok(Self {
            poster: JsonPoster::new(config, "audio")?,
            provider: config.provider.clone(),
        })
    }
}

/// Validates an `{"audio_file_id": ..., "duration_seconds": ...}` body. Some
/// providers wrap the object in a one-element array; the first element is
/// used in that case.
pub(crate) fn parse_audio(body: &Value) -> Result<GeneratedAudio, GenerationError> {
    let object = match body {
        Value::Array(items) => items.first(),
        other => Some(other),
    };

    let audio_file_id = object
        .and_then(|o| o.get("audio_file_id"))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            GenerationError::InvalidResponse(
                "Response missing or invalid \"audio_file_id\"".to_owned(),
            )
        })?;

    // A non-integer duration is dropped rather than rejected.
    let duration_seconds = object
        .and_then(|o| o.get("duration_seconds"))
        .and_then(Value::as_i64)
        .and_then(|d| i32::try_from(d).ok());

    Ok(GeneratedAudio {
        audio_file_id: audio_file_id.to_owned(),
        duration_seconds,
    })
}

#[async_trait]
impl AudioGenerator for HttpAudioGenerator {
    #[instrument(skip(self, request), fields(title = %request.title))]
    async fn generate_audio(
        &self,
        request: &AudioGenerationRequest,
    ) -> Result<GeneratedAudio, DomainError> {
        let body = self.poster.post(request).await?;
        let audio = parse_audio(&body)?;
        info!(audio_file_id = %audio.audio_file_id, "audio generation completed");
        Ok(audio)
    }

    fn provider_name(&self) -> Option<&str> {
        self.provider.as_deref()
    }
}
