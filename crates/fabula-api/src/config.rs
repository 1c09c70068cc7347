//! Environment-driven server configuration.

use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use fabula_generation::ClientConfig;
use fabula_generation::config::{
    DEFAULT_AUDIO_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, DEFAULT_TEXT_TIMEOUT,
};

use crate::error::AppError;

/// Everything the server reads from its environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Upper bound on pooled connections.
    pub database_max_connections: u32,
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Text provider settings.
    pub text_generation: ClientConfig,
    /// Audio provider settings.
    pub audio_generation: ClientConfig,
    /// OTLP collector endpoint; span export is off when unset.
    pub otlp_endpoint: Option<String>,
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or a numeric
    /// variable does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or a numeric
    /// variable does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let database_url = get("DATABASE_URL").ok_or_else(|| {
            AppError::Config("DATABASE_URL environment variable must be set".to_owned())
        })?;
        let connect_timeout = parse_secs(
            &get,
            "AI_GENERATION_CONNECT_TIMEOUT_SECS",
            DEFAULT_CONNECT_TIMEOUT,
        )?;

        Ok(Self {
            database_url,
            database_max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", 10)?,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port: parse_or(&get, "PORT", 3000)?,
            text_generation: ClientConfig {
                url: get("AI_TEXT_GENERATION_URL"),
                api_key: get("AI_TEXT_GENERATION_API_KEY"),
                provider: get("AI_TEXT_GENERATION_PROVIDER"),
                model: get("AI_TEXT_GENERATION_MODEL"),
                timeout: parse_secs(&get, "AI_TEXT_GENERATION_TIMEOUT_SECS", DEFAULT_TEXT_TIMEOUT)?,
                connect_timeout,
            },
            audio_generation: ClientConfig {
                url: get("AI_AUDIO_GENERATION_URL"),
                api_key: get("AI_AUDIO_GENERATION_API_KEY"),
                provider: get("AI_AUDIO_GENERATION_PROVIDER"),
                model: None,
                timeout: parse_secs(
                    &get,
                    "AI_AUDIO_GENERATION_TIMEOUT_SECS",
                    DEFAULT_AUDIO_TIMEOUT,
                )?,
                connect_timeout,
            },
            otlp_endpoint: get("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }

    /// The socket address to listen on.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST` is not an IP address.
    pub fn bind_address(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| AppError::Config(format!("{key} must be a valid number: {e}"))),
        None => Ok(default),
    }
}

fn parse_secs(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Result<Duration, AppError> {
    parse_or(get, key, default.as_secs()).map(Duration::from_secs)
}
