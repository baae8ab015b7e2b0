//! Shipeu settings surface.
//!
//! One HTML page plus JSON action endpoints: issue/regenerate the API key,
//! register a new store with Shipeu, sync an existing store, and configure
//! the fulfillment location.

use askama::Template;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use shipeu_core::{ApiKey, Email, ShopDomain, SyncStatus};
use tracing::instrument;

use crate::db::SessionRepository;
use crate::error::AppError;
use crate::models::StoreSession;
use crate::shipeu::{RegisterStoreRequest, ShipeuError};
use crate::state::AppState;

// =============================================================================
// Templates
// =============================================================================

/// Settings page template.
///
/// Empty strings stand in for absent values; the template treats them as
/// "not set".
#[derive(Template)]
#[template(path = "settings.html")]
pub struct SettingsTemplate {
    pub shop: String,
    pub configured: bool,
    pub status: String,
    pub api_key_masked: String,
    pub location_display: String,
    pub success_message: String,
    pub error_message: String,
}

/// Build the settings router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/app/settings", get(settings_page))
        .route("/app/settings/generate-key", post(generate_key))
        .route("/app/settings/register", post(register))
        .route("/app/settings/sync", post(sync_existing))
        .route("/app/settings/location", post(set_location))
}

// =============================================================================
// API Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SettingsQueryParams {
    pub shop: Option<String>,
    pub success: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateKeyRequest {
    pub shop: String,
}

/// Registration form for a store new to Shipeu.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub shop: String,
    pub store_name: String,
    pub email: String,
    pub phone1: String,
    pub phone2: Option<String>,
    pub address: String,
    pub contact: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub tax_id: String,
}

/// Sync form for a store that already has Shipeu credentials.
#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub shop: String,
    pub api_key: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    pub shop: String,
    pub location_id: i64,
}

/// JSON response for the settings actions.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl ApiResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            api_key: None,
        }
    }

    fn with_api_key(message: impl Into<String>, api_key: &ApiKey) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            api_key: Some(api_key.as_str().to_string()),
        }
    }

    fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
            api_key: None,
        }
    }
}

fn bad_request(error: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::error(error))).into_response()
}

// =============================================================================
// Helpers
// =============================================================================

/// Look up the session for a shop string, or fail the action.
async fn require_session(
    state: &AppState,
    shop: &str,
) -> Result<(ShopDomain, StoreSession), AppError> {
    let shop = ShopDomain::parse(shop)
        .map_err(|e| AppError::BadRequest(format!("Invalid shop parameter: {e}")))?;

    let repo = SessionRepository::new(state.pool());
    let session = repo
        .get_by_shop(&shop)
        .await?
        .ok_or_else(|| AppError::NotFound("App is not installed for this shop".to_string()))?;

    Ok((shop, session))
}

// =============================================================================
// Route Handlers
// =============================================================================

/// GET /app/settings - Settings page.
#[instrument(skip(state))]
async fn settings_page(
    State(state): State<AppState>,
    Query(params): Query<SettingsQueryParams>,
) -> Result<Response, AppError> {
    let shop_param = params
        .shop
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Missing shop parameter".to_string()))?;

    let (shop, session) = require_session(&state, shop_param).await?;

    let success_message = params.success.as_deref().map(|s| match s {
        "installed" => "App installed. Connect your store to Shipeu below.".to_string(),
        "key_generated" => "New API key generated.".to_string(),
        "registered" => "Store registered with Shipeu.".to_string(),
        "synced" => "Store synced with Shipeu.".to_string(),
        _ => format!("Success: {s}"),
    });

    let error_message = params.error.as_deref().map(|e| match e {
        "oauth_denied" => "Authorization was denied.".to_string(),
        "oauth_invalid_hmac" => "Invalid security signature. Please try again.".to_string(),
        "oauth_invalid_state" => "Invalid state parameter. Please try again.".to_string(),
        "oauth_failed" => "Installation failed. Please try again.".to_string(),
        "oauth_exchange_failed" => "Failed to exchange authorization code.".to_string(),
        "oauth_save_failed" => "Failed to save credentials.".to_string(),
        _ => format!("Error: {e}"),
    });

    let template = SettingsTemplate {
        shop: shop.to_string(),
        configured: session.shipeu_status.is_active() && session.api_key.is_some(),
        status: session.shipeu_status.to_string(),
        api_key_masked: session
            .api_key
            .as_ref()
            .map(ApiKey::masked)
            .unwrap_or_default(),
        location_display: session
            .shipeu_location_id
            .map(|id| id.to_string())
            .unwrap_or_default(),
        success_message: success_message.unwrap_or_default(),
        error_message: error_message.unwrap_or_default(),
    };

    Ok(Html(template.render().unwrap_or_else(|e| {
        tracing::error!("Template render error: {}", e);
        "Internal Server Error".to_string()
    }))
    .into_response())
}

/// POST /app/settings/generate-key - Issue or regenerate the API key.
///
/// Before Shipeu registration the key is minted locally; afterwards the
/// regeneration is delegated to Shipeu so both sides agree on the key.
#[instrument(skip(state, req))]
async fn generate_key(
    State(state): State<AppState>,
    Json(req): Json<GenerateKeyRequest>,
) -> Result<Response, AppError> {
    let (shop, session) = require_session(&state, &req.shop).await?;

    let new_key = match (&session.api_key, session.is_registered()) {
        (Some(old_key), true) => match state.shipeu().regenerate_api_key(old_key).await {
            Ok(key) => key,
            Err(ShipeuError::Api { status, message }) => {
                tracing::warn!(status, message = %message, "Shipeu rejected key regeneration");
                return Ok(bad_request(message));
            }
            Err(e) => return Err(e.into()),
        },
        _ => ApiKey::generate(),
    };

    let repo = SessionRepository::new(state.pool());
    repo.set_api_key(&shop, &new_key, None, SyncStatus::Active)
        .await?;

    tracing::info!(shop = %shop, "API key issued");
    Ok(Json(ApiResponse::with_api_key("API key generated", &new_key)).into_response())
}

/// POST /app/settings/register - Register a new store with Shipeu.
#[instrument(skip(state, req))]
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Response, AppError> {
    let (shop, _session) = require_session(&state, &req.shop).await?;

    // Required fields, as the platform enforces them
    for (value, name) in [
        (&req.store_name, "store_name"),
        (&req.email, "email"),
        (&req.phone1, "phone1"),
        (&req.address, "address"),
        (&req.tax_id, "tax_id"),
    ] {
        if value.trim().is_empty() {
            return Ok(bad_request(format!("The {name} field is required")));
        }
    }

    let Ok(email) = Email::parse(req.email.trim()) else {
        return Ok(bad_request("The email is not valid"));
    };

    let registration_request = RegisterStoreRequest {
        store_name: req.store_name.trim().to_string(),
        email: email.to_string(),
        primary_phone: req.phone1.trim().to_string(),
        secondary_phone: req.phone2.filter(|p| !p.trim().is_empty()),
        address: req.address.trim().to_string(),
        contact_name: req.contact.filter(|c| !c.trim().is_empty()),
        country: req.country.unwrap_or_else(|| "ES".to_string()),
        state: req.state.unwrap_or_default(),
        city: req.city.unwrap_or_default(),
        postal_code: req.postal_code.unwrap_or_default(),
        tax_id: req.tax_id.trim().to_string(),
    };

    let registration = match state.shipeu().register_store(&registration_request).await {
        Ok(registration) => registration,
        Err(ShipeuError::Api { status, message }) => {
            tracing::warn!(status, message = %message, "Shipeu rejected registration");
            return Ok(bad_request(message));
        }
        Err(e) => return Err(e.into()),
    };

    let repo = SessionRepository::new(state.pool());
    repo.set_registration(
        &shop,
        &registration.api_key,
        registration.store_id.as_deref(),
        &email,
        registration.status,
    )
    .await?;

    tracing::info!(shop = %shop, "Store registered with Shipeu");
    Ok(Json(ApiResponse::with_api_key(
        "Store registered with Shipeu",
        &registration.api_key,
    ))
    .into_response())
}

/// POST /app/settings/sync - Sync a store that already exists on Shipeu.
#[instrument(skip(state, req))]
async fn sync_existing(
    State(state): State<AppState>,
    Json(req): Json<SyncRequest>,
) -> Result<Response, AppError> {
    let (shop, _session) = require_session(&state, &req.shop).await?;

    if req.api_key.trim().is_empty() || req.email.trim().is_empty() {
        return Ok(bad_request("API key and email are required"));
    }

    let Ok(email) = Email::parse(req.email.trim()) else {
        return Ok(bad_request("The email is not valid"));
    };

    let Ok(api_key) = ApiKey::parse(req.api_key.trim()) else {
        return Ok(bad_request("The API key is not valid"));
    };

    let sync = match state.shipeu().sync_store(&api_key, email.as_str()).await {
        Ok(sync) => sync,
        Err(ShipeuError::Api { status, message }) => {
            tracing::warn!(status, message = %message, "Shipeu rejected sync");
            return Ok(bad_request(message));
        }
        Err(e) => return Err(e.into()),
    };

    let repo = SessionRepository::new(state.pool());
    repo.set_registration(&shop, &api_key, sync.store_id.as_deref(), &email, sync.status)
        .await?;

    tracing::info!(shop = %shop, "Store synced with Shipeu");
    Ok(Json(ApiResponse::with_api_key("Store synced with Shipeu", &api_key)).into_response())
}

/// POST /app/settings/location - Configure the fulfillment location.
#[instrument(skip(state, req))]
async fn set_location(
    State(state): State<AppState>,
    Json(req): Json<LocationRequest>,
) -> Result<Response, AppError> {
    let (shop, _session) = require_session(&state, &req.shop).await?;

    if req.location_id <= 0 {
        return Ok(bad_request("location_id must be a positive Shopify location id"));
    }

    let repo = SessionRepository::new(state.pool());
    repo.set_location(&shop, req.location_id).await?;

    tracing::info!(shop = %shop, location_id = req.location_id, "Fulfillment location configured");
    Ok(Json(ApiResponse::success("Fulfillment location saved")).into_response())
}
