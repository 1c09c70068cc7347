//! Fabula Generation — clients for the external AI providers.
//!
//! Both providers are plain JSON-over-HTTP endpoints called synchronously
//! with a hard timeout and no retries. Every failure surfaces as
//! [`fabula_core::error::DomainError::Upstream`].

pub mod audio;
pub mod config;
pub mod error;
mod http;
pub mod text;

pub use audio::HttpAudioGenerator;
pub use config::ClientConfig;
pub use error::GenerationError;
pub use text::HttpTextGenerator;
