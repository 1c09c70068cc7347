//! `GET /api`: a list of the available routes.

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::state::AppState;

const ROUTES: &[(&str, &str)] = &[
    ("GET", "/api/stories"),
    ("POST", "/api/stories"),
    ("GET", "/api/stories/{id}"),
    ("PUT", "/api/stories/{id}"),
    ("PATCH", "/api/stories/{id}"),
    ("DELETE", "/api/stories/{id}"),
    ("PATCH", "/api/stories/{id}/final-generations"),
    ("POST", "/api/stories/{id}/finalize"),
    ("GET", "/api/stories/{id}/text-generations"),
    ("POST", "/api/stories/{id}/text-generations"),
    ("GET", "/api/stories/{id}/audio-generations"),
    ("POST", "/api/stories/{id}/audio-generations"),
];

/// One advertised route.
#[derive(Serialize)]
pub struct RouteInfo {
    pub method: &'static str,
    pub path: &'static str,
}

/// Response body for `GET /api`.
#[derive(Serialize)]
pub struct IndexResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub routes: Vec<RouteInfo>,
}

async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        name: "Fabula API",
        version: env!("CARGO_PKG_VERSION"),
        routes: ROUTES
            .iter()
            .map(|&(method, path)| RouteInfo { method, path })
            .collect(),
    })
}

/// Returns the index router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api", get(index))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use fabula_test_support::InMemoryStore;

    use crate::routes::testing::{send, test_app};

    #[tokio::test]
    async fn test_index_lists_finalize_route() {
        let (status, json) = send(test_app(&InMemoryStore::new()), "GET", "/api", None).await;

        assert_eq!(status, StatusCode::OK);
        let routes = json["routes"].as_array().unwrap();
        assert_eq!(routes.len(), 12);
        assert!(
            routes
                .iter()
                .any(|r| r["method"] == "POST" && r["path"] == "/api/stories/{id}/finalize")
        );
    }
}
