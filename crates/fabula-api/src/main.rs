//! Fabula API server entry point.

use std::sync::Arc;

use fabula_api::config::AppConfig;
use fabula_api::error::AppError;
use fabula_api::state::AppState;
use fabula_api::telemetry;
use fabula_generation::{HttpAudioGenerator, HttpTextGenerator};
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let tracer_provider = telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!("Starting Fabula API server");

    // Create database connection pool.
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    fabula_store::MIGRATOR.run(&pool).await?;

    let text_generator = HttpTextGenerator::new(&config.text_generation)?;
    let audio_generator = HttpAudioGenerator::new(&config.audio_generation)?;
    let app_state = AppState::postgres(pool, Arc::new(text_generator), Arc::new(audio_generator));

    let app = fabula_api::app(app_state);

    // Start server.
    let addr = config.bind_address()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for shutdown signal");
            }
        })
        .await?;

    tracing::info!("Server stopped");
    telemetry::shutdown(tracer_provider);

    Ok(())
}
