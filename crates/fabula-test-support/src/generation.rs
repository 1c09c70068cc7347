//! Scripted generation providers.

use std::sync::Mutex;

use async_trait::async_trait;
use fabula_core::error::DomainError;
use fabula_core::generation::{
    AudioGenerationRequest, AudioGenerator, GeneratedAudio, GeneratedText, TextGenerationRequest,
    TextGenerator,
};

/// Returns the same candidates for every request and records what it was
/// asked.
#[derive(Debug, Default)]
pub struct StubTextGenerator {
    texts: Vec<String>,
    provider: Option<String>,
    model: Option<String>,
    requests: Mutex<Vec<TextGenerationRequest>>,
}

impl StubTextGenerator {
    /// Creates a generator answering with `texts`, attributed to the
    /// "stub" provider and "stub-model" model.
    #[must_use]
    pub fn new<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            texts: texts.into_iter().map(Into::into).collect(),
            provider: Some("stub".to_owned()),
            model: Some("stub-model".to_owned()),
            requests: Mutex::default(),
        }
    }

    /// Generator answering with three distinct candidates.
    #[must_use]
    pub fn three() -> Self {
        Self::new(["first draft", "second draft", "third draft"])
    }

    /// Requests received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn requests(&self) -> Vec<TextGenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for StubTextGenerator {
    async fn generate_text(
        &self,
        request: &TextGenerationRequest,
    ) -> Result<Vec<GeneratedText>, DomainError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self
            .texts
            .iter()
            .map(|text| GeneratedText {
                generated_text: text.clone(),
            })
            .collect())
    }

    fn provider_name(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    fn model_name(&self) -> Option<&str> {
        self.model.as_deref()
    }
}

/// A text provider that is always down.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingTextGenerator;

#[async_trait]
impl TextGenerator for FailingTextGenerator {
    async fn generate_text(
        &self,
        _request: &TextGenerationRequest,
    ) -> Result<Vec<GeneratedText>, DomainError> {
        Err(DomainError::Upstream("API returned HTTP 500".to_owned()))
    }

    fn provider_name(&self) -> Option<&str> {
        None
    }

    fn model_name(&self) -> Option<&str> {
        None
    }
}

/// Returns a fixed artifact and records every request.
#[derive(Debug)]
pub struct StubAudioGenerator {
    audio: GeneratedAudio,
    provider: Option<String>,
    requests: Mutex<Vec<AudioGenerationRequest>>,
}

impl StubAudioGenerator {
    /// Creates a generator returning `audio_file_id` with the given duration,
    /// attributed to the "stub-voice" provider.
    #[must_use]
    pub fn new(audio_file_id: impl Into<String>, duration_seconds: Option<i32>) -> Self {
        Self {
            audio: GeneratedAudio {
                audio_file_id: audio_file_id.into(),
                duration_seconds,
            },
            provider: Some("stub-voice".to_owned()),
            requests: Mutex::default(),
        }
    }

    /// Requests received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn requests(&self) -> Vec<AudioGenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for StubAudioGenerator {
    fn default() -> Self {
        Self::new("audio-file-1", Some(120))
    }
}

#[async_trait]
impl AudioGenerator for StubAudioGenerator {
    async fn generate_audio(
        &self,
        request: &AudioGenerationRequest,
    ) -> Result<GeneratedAudio, DomainError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.audio.clone())
    }

    fn provider_name(&self) -> Option<&str> {
        self.provider.as_deref()
    }
}

/// An audio provider that is always down. Counts the calls it receives.
#[derive(Debug, Default)]
pub struct FailingAudioGenerator {
    calls: Mutex<usize>,
}

impl FailingAudioGenerator {
    /// Number of requests received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl AudioGenerator for FailingAudioGenerator {
    async fn generate_audio(
        &self,
        _request: &AudioGenerationRequest,
    ) -> Result<GeneratedAudio, DomainError> {
        *self.calls.lock().unwrap() += 1;
        Err(DomainError::Upstream("API returned HTTP 503".to_owned()))
    }

    fn provider_name(&self) -> Option<&str> {
        None
    }
}
