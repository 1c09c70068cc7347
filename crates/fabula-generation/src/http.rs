//! JSON POST transport shared by both clients.

use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::GenerationError;

#[derive(Debug, Clone)]
pub(crate) struct JsonPoster {
    client: Client,
    url: Option<String>,
    api_key: Option<String>,
    /// "text" or "audio", used in error messages.
    kind: &'static str,
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

impl JsonPoster {
    pub(crate) fn new(config: &ClientConfig, kind: &'static str) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| GenerationError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url: non_blank(config.url.as_ref()),
            api_key: non_blank(config.api_key.as_ref()),
            kind,
        })
    }

    /// Posts `body` and returns the decoded JSON document.
    pub(crate) async fn post<T: Serialize + Sync>(&self, body: &T) -> Result<Value, GenerationError> {
        let url = self
            .url
            .as_deref()
            .ok_or(GenerationError::NotConfigured(self.kind))?;

        debug!(kind = self.kind, url, "sending generation request");

        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(body);
        if let Some(api_key) = &self.api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {api_key}"));
        }

        let response = request.send().await.map_err(|e| {
            warn!(kind = self.kind, error = %e, "generation request failed");
            GenerationError::Transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(kind = self.kind, status = status.as_u16(), "generation provider returned an error status");
            return Err(GenerationError::Status(status.as_u16()));
        }

        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        match serde_json::from_str::<Value>(&text) {
            Ok(value @ (Value::Object(_) | Value::Array(_))) => Ok(value),
            _ => Err(GenerationError::InvalidJson),
        }
    }
}
