//! Request extractors that reject with JSON errors instead of plain text.

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use fabula_stories::domain::validation::{INVALID_STORY_ID, positive_story_id};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// JSON request body. An empty body reads as `{}` so that missing-field
/// checks report which fields are absent. The content type is not checked.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e.body_text())))?;

        let input: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &bytes
        };

        serde_json::from_slice(input)
            .map(Self)
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))
    }
}

/// Query string parameters.
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid query string: {}", e.body_text())))?;
        Ok(Self(value))
    }
}

/// The `{id}` segment of a story route, checked to be a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoryId(pub i64);

impl<S> FromRequestParts<S> for StoryId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::bad_request(INVALID_STORY_ID))?;
        let id = raw
            .trim()
            .parse::<i64>()
            .map_err(|_| ApiError::bad_request(INVALID_STORY_ID))?;
        Ok(Self(positive_story_id(id)?))
    }
}
