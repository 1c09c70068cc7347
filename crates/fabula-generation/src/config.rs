//! Client configuration.

use std::time::Duration;

/// Request timeout for text generation.
pub const DEFAULT_TEXT_TIMEOUT: Duration = Duration::from_secs(120);

/// Request timeout for audio generation, which can run for a long time.
pub const DEFAULT_AUDIO_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Connect timeout shared by both clients.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for one generation provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Endpoint URL. `None` or blank leaves the client unconfigured.
    pub url: Option<String>,
    /// Sent as a bearer token when non-empty.
    pub api_key: Option<String>,
    /// Provider name recorded on persisted generations.
    pub provider: Option<String>,
    /// Model name recorded on persisted generations.
    pub model: Option<String>,
    /// Hard limit for the whole request.
    pub timeout: Duration,
    /// Limit for establishing the connection.
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Unconfigured text client settings with the default timeouts.
    #[must_use]
    pub fn text_defaults() -> Self {
        Self::with_timeout(DEFAULT_TEXT_TIMEOUT)
    }

    /// Unconfigured audio client settings with the default timeouts.
    #[must_use]
    pub fn audio_defaults() -> Self {
        Self::with_timeout(DEFAULT_AUDIO_TIMEOUT)
    }

    fn with_timeout(timeout: Duration) -> Self {
        Self {
            url: None,
            api_key: None,
            provider: None,
            model: None,
            timeout,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Sets the endpoint URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the bearer token.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}
