//! Text generation client.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, instrument};

use fabula_core::error::DomainError;
use fabula_core::generation::{
    GeneratedText, TEXT_CANDIDATE_COUNT, TextGenerationRequest, TextGenerator,
};

use crate::config::ClientConfig;
use crate::error::GenerationError;
use crate::http::JsonPoster;

/// Calls the text provider and expects exactly three candidates back.
#[derive(Debug, Clone)]
pub struct HttpTextGenerator {
    poster: JsonPoster,
    provider: Option<String>,
    model: Option<String>,
}

impl HttpTextGenerator {
    /// Creates a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::Client` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, GenerationError> {
        Ok(Self {
            poster: JsonPoster::new(config, "text")?,
            provider: config.provider.clone(),
            model: config.model.clone(),
        })
    }
}

/// Validates a `{"generations": [{"generated_text": ...}, ...]}` body.
pub(crate) fn parse_generations(body: &Value) -> Result<Vec<GeneratedText>, GenerationError> {
    let generations = body
        .get("generations")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            GenerationError::InvalidResponse("Response missing \"generations\" array".to_owned())
        })?;

    if generations.len() != TEXT_CANDIDATE_COUNT {
        return Err(GenerationError::InvalidResponse(format!(
            "Expected {TEXT_CANDIDATE_COUNT} generations, got {}",
            generations.len()
        )));
    }

    generations
        .iter()
        .enumerate()
        .map(|(index, generation)| {
            generation
                .get("generated_text")
                .and_then(Value::as_str)
                .map(|text| GeneratedText {
                    generated_text: text.to_owned(),
                })
                .ok_or_else(|| {
                    GenerationError::InvalidResponse(format!(
                        "Generation {index} missing or invalid \"generated_text\""
                    ))
                })
        })
        .collect()
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    #[instrument(skip(self, request), fields(title = %request.title))]
    async fn generate_text(
        &self,
        request: &TextGenerationRequest,
    ) -> Result<Vec<GeneratedText>, DomainError> {
        let body = self.poster.post(request).await?;
        let generations = parse_generations(&body)?;
        info!(count = generations.len(), "text generation completed");
        Ok(generations)
    }

    fn provider_name(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    fn model_name(&self) -> Option<&str> {
        self.model.as_deref()
    }
}
