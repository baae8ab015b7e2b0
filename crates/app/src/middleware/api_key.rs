//! Bearer API key authentication for the `/api/*` endpoints.
//!
//! The key is accepted the same three ways the Shipeu platform sends it:
//! `Authorization: Bearer`, `X-API-Key`, or an `api_key` query parameter.

use axum::http::HeaderMap;
use shipeu_core::ApiKey;

use crate::db::SessionRepository;
use crate::error::AppError;
use crate::models::StoreSession;
use crate::state::AppState;

/// Pull the raw API key out of a request, if present.
///
/// Precedence: `api_key` query parameter, then `X-API-Key`, then
/// `Authorization: Bearer`.
#[must_use]
pub fn extract_api_key(headers: &HeaderMap, query_api_key: Option<&str>) -> Option<String> {
    if let Some(key) = query_api_key
        && !key.is_empty()
    {
        return Some(key.to_string());
    }

    if let Some(key) = headers.get("X-API-Key").and_then(|v| v.to_str().ok())
        && !key.is_empty()
    {
        return Some(key.to_string());
    }

    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// Resolve a request's API key to the store session holding it.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` when the key is missing, malformed,
/// unknown, or expired.
pub async fn authenticate_api_key(
    state: &AppState,
    headers: &HeaderMap,
    query_api_key: Option<&str>,
) -> Result<StoreSession, AppError> {
    let Some(raw) = extract_api_key(headers, query_api_key) else {
        return Err(AppError::Unauthorized("API key required".to_string()));
    };

    let key = ApiKey::parse(&raw)
        .map_err(|_| AppError::Unauthorized("Invalid or expired API key".to_string()))?;

    let repo = SessionRepository::new(state.pool());
    repo.get_by_api_key(&key)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired API key".to_string()))
}
