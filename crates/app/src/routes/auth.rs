//! OAuth install flow.
//!
//! `GET /auth?shop=` starts the authorization-code grant; the callback
//! verifies the HMAC and state nonce, exchanges the code for an offline
//! token, upserts the session row, and registers webhook subscriptions.

use axum::{
    Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use shipeu_core::ShopDomain;
use tower_sessions::Session;
use tracing::instrument;

use crate::db::SessionRepository;
use crate::error::AppError;
use crate::shopify::oauth::{self, CallbackParams};
use crate::state::AppState;

const OAUTH_STATE_KEY: &str = "shopify_oauth_state";

/// Webhook topics registered after install, with their callback paths.
const WEBHOOK_TOPICS: &[(&str, &str)] = &[
    ("APP_UNINSTALLED", "/webhooks/app/uninstalled"),
    ("INVENTORY_LEVELS_UPDATE", "/webhooks/inventory"),
    ("INVENTORY_ITEMS_CREATE", "/webhooks/inventory"),
    ("INVENTORY_ITEMS_UPDATE", "/webhooks/inventory"),
    ("INVENTORY_ITEMS_DELETE", "/webhooks/inventory"),
];

/// Build the OAuth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth", get(begin))
        .route("/auth/callback", get(callback))
}

#[derive(Debug, Deserialize)]
pub struct BeginParams {
    pub shop: Option<String>,
}

/// GET /auth - Start the OAuth flow for a shop.
#[instrument(skip(state, session))]
async fn begin(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<BeginParams>,
) -> Result<Response, AppError> {
    let shop = params
        .shop
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Missing shop parameter".to_string()))?;

    let shop = ShopDomain::parse(shop)
        .map_err(|e| AppError::BadRequest(format!("Invalid shop parameter: {e}")))?;

    // Random state parameter for CSRF protection
    let oauth_state = uuid::Uuid::new_v4().to_string();

    session
        .insert(OAUTH_STATE_KEY, &oauth_state)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to store OAuth state: {e}")))?;

    let redirect_uri = format!("{}/auth/callback", state.config().base_url);
    let auth_url = oauth::authorization_url(
        &state.config().shopify,
        &shop,
        &redirect_uri,
        &oauth_state,
    );

    tracing::info!(shop = %shop, "Redirecting to Shopify OAuth");
    Ok(Redirect::to(&auth_url).into_response())
}

/// GET /auth/callback - Handle the OAuth callback.
#[instrument(skip(state, session, params))]
async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<CallbackParams>,
) -> Response {
    let settings_redirect = |shop: Option<&str>, outcome: &str| {
        let target = shop.map_or_else(
            || format!("/app/settings?{outcome}"),
            |s| format!("/app/settings?shop={s}&{outcome}"),
        );
        Redirect::to(&target).into_response()
    };

    // Errors reported by Shopify itself
    if let Some(error) = &params.error {
        let description = params.error_description.as_deref().unwrap_or_default();
        tracing::error!(error = %error, description = %description, "Shopify OAuth error");
        return settings_redirect(params.shop.as_deref(), "error=oauth_denied");
    }

    // Verify the HMAC signature before trusting anything else
    use secrecy::ExposeSecret;
    if !oauth::verify_callback_hmac(&params, state.config().shopify.api_secret.expose_secret()) {
        tracing::error!("Invalid HMAC signature in OAuth callback");
        return settings_redirect(params.shop.as_deref(), "error=oauth_invalid_hmac");
    }

    let Some(shop_param) = &params.shop else {
        tracing::error!("Missing shop in OAuth callback");
        return settings_redirect(None, "error=oauth_failed");
    };

    let Ok(shop) = ShopDomain::parse(shop_param) else {
        tracing::error!(shop = %shop_param, "Invalid shop domain in OAuth callback");
        return settings_redirect(None, "error=oauth_failed");
    };

    let Some(code) = &params.code else {
        tracing::error!("Missing authorization code in callback");
        return settings_redirect(Some(shop.as_str()), "error=oauth_failed");
    };

    let Some(callback_state) = &params.state else {
        tracing::error!("Missing state parameter in callback");
        return settings_redirect(Some(shop.as_str()), "error=oauth_failed");
    };

    // Verify the state nonce stored when the flow began
    let stored_state: Option<String> = session.get(OAUTH_STATE_KEY).await.ok().flatten();
    if stored_state.as_ref() != Some(callback_state) {
        tracing::error!("OAuth state mismatch - possible CSRF attack");
        return settings_redirect(Some(shop.as_str()), "error=oauth_invalid_state");
    }
    let _ = session.remove::<String>(OAUTH_STATE_KEY).await;

    // Exchange the code for an offline access token
    let token = match oauth::exchange_code(state.http(), &state.config().shopify, &shop, code).await
    {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "Failed to exchange OAuth code");
            return settings_redirect(Some(shop.as_str()), "error=oauth_exchange_failed");
        }
    };

    // Create or refresh the session row
    let repo = SessionRepository::new(state.pool());
    if let Err(e) = repo
        .upsert_install(&shop, &token.access_token, &token.scope)
        .await
    {
        tracing::error!(error = %e, "Failed to save session");
        return settings_redirect(Some(shop.as_str()), "error=oauth_save_failed");
    }

    // Register webhook subscriptions; failures are logged, not fatal
    // (Shopify rejects duplicates on reinstall with a user error).
    if let Ok(Some(store_session)) = repo.get_by_shop(&shop).await {
        let client = state.shopify_for(&store_session);
        for (topic, path) in WEBHOOK_TOPICS {
            let callback_url = format!("{}{path}", state.config().base_url);
            if let Err(e) = client.register_webhook(topic, &callback_url).await {
                tracing::warn!(topic = %topic, error = %e, "Webhook registration failed");
            }
        }
    }

    tracing::info!(shop = %shop, "App installed");
    settings_redirect(Some(shop.as_str()), "success=installed")
}
