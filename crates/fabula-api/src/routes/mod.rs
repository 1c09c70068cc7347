//! Route modules.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::ErrorBody;

pub mod audio_generations;
pub mod health;
pub mod index;
pub mod stories;
pub mod text_generations;

/// Fallback for unknown paths.
pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        axum::Json(ErrorBody {
            error: "Not found".to_owned(),
            fields: None,
        }),
    )
        .into_response()
}


#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use fabula_test_support::InMemoryStore;
    use serde_json::json;

    use super::testing::{send, test_app};

    #[tokio::test]
    async fn test_unknown_route_returns_json_404() {
        let (status, json) = send(test_app(&InMemoryStore::new()), "GET", "/nope", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json, json!({"error": "Not found"}));
    }
}
