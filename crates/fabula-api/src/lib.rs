//! Fabula API — HTTP surface for stories and their generations.

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod config;
pub mod cors;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;
pub mod telemetry;

/// Builds the full router over `state`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::index::router())
        .merge(routes::stories::router())
        .merge(routes::text_generations::router())
        .merge(routes::audio_generations::router())
        .fallback(routes::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors::layer())
        .layer(axum::middleware::from_fn(cors::preflight_no_content))
        .with_state(state)
}
