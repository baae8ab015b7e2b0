//! Shopify webhook receivers.
//!
//! Signatures are verified against the raw body before anything else; a bad
//! signature is a 401. Every failure after verification answers 200 with
//! the error in the JSON body only, so Shopify does not retry; the sender
//! delivers at-least-once and this handler is an idempotent relay.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{Value, json};
use shipeu_core::ShopDomain;
use tracing::instrument;

use crate::db::SessionRepository;
use crate::models::StoreSession;
use crate::shipeu::{InventoryOperation, InventoryPush};
use crate::shopify::{InventoryItemDetail, verify_webhook_hmac};
use crate::state::AppState;

/// Build the webhooks router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhooks/app/uninstalled", post(app_uninstalled))
        .route("/webhooks/inventory", post(inventory))
}

// =============================================================================
// Payload types
// =============================================================================

/// `inventory_levels/update` payload.
#[derive(Debug, Deserialize)]
struct InventoryLevelPayload {
    inventory_item_id: i64,
    available: Option<i64>,
    location_id: i64,
}

/// `inventory_items/create|update|delete` payload.
#[derive(Debug, Deserialize)]
struct InventoryItemPayload {
    id: i64,
    #[serde(default)]
    sku: Option<String>,
}

// =============================================================================
// Verification
// =============================================================================

/// A webhook that passed signature verification.
struct VerifiedWebhook {
    shop: ShopDomain,
    topic: String,
    body: Bytes,
}

/// Verify the webhook signature and required headers.
///
/// An invalid or missing signature is an authentication failure and gets a
/// 401; a malformed shop header (signed by Shopify, so effectively
/// impossible) gets the 200-with-error-body treatment.
fn verify_webhook(
    state: &AppState,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<VerifiedWebhook, Response> {
    let signature = headers
        .get("X-Shopify-Hmac-Sha256")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let secret = state.config().shopify.api_secret.expose_secret();
    if !verify_webhook_hmac(secret, &body, signature) {
        tracing::warn!("Webhook rejected: invalid HMAC signature");
        return Err(StatusCode::UNAUTHORIZED.into_response());
    }

    let topic = headers
        .get("X-Shopify-Topic")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let shop_header = headers
        .get("X-Shopify-Shop-Domain")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let shop = match ShopDomain::parse(shop_header) {
        Ok(shop) => shop,
        Err(e) => {
            tracing::error!(shop = %shop_header, error = %e, "Webhook carried invalid shop domain");
            return Err(ok_body(json!({
                "status": "error",
                "error": "invalid shop domain",
                "timestamp": timestamp(),
            })));
        }
    };

    Ok(VerifiedWebhook { shop, topic, body })
}

fn timestamp() -> String {
    Utc::now().to_rfc3339()
}

fn ok_body(body: Value) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

// =============================================================================
// app/uninstalled
// =============================================================================

/// POST /webhooks/app/uninstalled - Remove the shop's sessions.
///
/// Always answers 200; deleting zero rows is a successful no-op.
#[instrument(skip(state, headers, body))]
async fn app_uninstalled(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let verified = match verify_webhook(&state, &headers, body) {
        Ok(v) => v,
        Err(response) => return response,
    };

    let repo = SessionRepository::new(state.pool());
    match repo.delete_by_shop(&verified.shop).await {
        Ok(count) => {
            tracing::info!(shop = %verified.shop, deleted = count, "App uninstalled");
        }
        Err(e) => {
            tracing::error!(shop = %verified.shop, error = %e, "Failed to delete sessions on uninstall");
        }
    }

    StatusCode::OK.into_response()
}

// =============================================================================
// Inventory topics
// =============================================================================

/// POST /webhooks/inventory - Relay inventory changes to Shipeu.
#[instrument(skip(state, headers, body))]
async fn inventory(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let verified = match verify_webhook(&state, &headers, body) {
        Ok(v) => v,
        Err(response) => return response,
    };

    tracing::info!(shop = %verified.shop, topic = %verified.topic, "Inventory webhook received");

    // Look up the shop's session; absence is an idempotent no-op, not an
    // error, so an uninstalled shop's straggler deliveries do not retry.
    let repo = SessionRepository::new(state.pool());
    let session = match repo.get_by_shop(&verified.shop).await {
        Ok(Some(session)) => session,
        Ok(None) => {
            tracing::warn!(shop = %verified.shop, "No session found for webhook");
            return ok_body(json!({
                "error": "No session found",
                "shop": verified.shop.as_str(),
                "message": "Please ensure the app is properly installed and configured",
                "timestamp": timestamp(),
            }));
        }
        Err(e) => {
            tracing::error!(shop = %verified.shop, error = %e, "Session lookup failed");
            return ok_body(json!({
                "status": "error",
                "error": e.to_string(),
                "timestamp": timestamp(),
            }));
        }
    };

    let body_json = match verified.topic.as_str() {
        "inventory_levels/update" => level_update(&state, &session, &verified.body).await,
        "inventory_items/create" => {
            item_change(&state, &session, &verified.body, InventoryOperation::CreateProduct).await
        }
        "inventory_items/update" => {
            item_change(&state, &session, &verified.body, InventoryOperation::UpdateProduct).await
        }
        "inventory_items/delete" => {
            item_change(&state, &session, &verified.body, InventoryOperation::DeleteProduct).await
        }
        other => {
            json!({
                "status": "received",
                "topic": other,
                "timestamp": timestamp(),
            })
        }
    };

    ok_body(body_json)
}

/// Handle `inventory_levels/update`: location match, enrich, relay.
async fn level_update(state: &AppState, session: &StoreSession, body: &[u8]) -> Value {
    let payload: InventoryLevelPayload = match serde_json::from_slice(body) {
        Ok(p) => p,
        Err(e) => {
            return json!({
                "status": "error",
                "reason": "invalid_payload",
                "error": e.to_string(),
                "timestamp": timestamp(),
            });
        }
    };

    // Only the configured fulfillment location is relayed.
    if session.shipeu_location_id != Some(payload.location_id) {
        tracing::info!(
            received = payload.location_id,
            configured = ?session.shipeu_location_id,
            "Inventory level ignored: location mismatch"
        );
        return json!({
            "status": "ignored",
            "reason": "location_mismatch",
            "received_location": payload.location_id,
            "configured_location": session.shipeu_location_id,
            "timestamp": timestamp(),
        });
    }

    let item_gid = format!("gid://shopify/InventoryItem/{}", payload.inventory_item_id);
    let detail = match state.shopify_for(session).get_inventory_item(&item_gid).await {
        Ok(detail) => detail,
        Err(e) => {
            tracing::error!(error = %e, "Inventory item lookup failed");
            return json!({
                "status": "error",
                "error": e.to_string(),
                "timestamp": timestamp(),
            });
        }
    };

    let Some(sku) = detail.as_ref().and_then(|d| d.sku.clone()) else {
        tracing::warn!(inventory_item_id = payload.inventory_item_id, "No SKU on inventory item");
        return json!({
            "status": "error",
            "reason": "no_sku_found",
            "inventory_item_id": payload.inventory_item_id,
            "timestamp": timestamp(),
        });
    };
    let detail = detail.unwrap_or_else(|| empty_detail(&item_gid));

    let push = InventoryPush {
        seller_id: seller_id(session),
        sku: sku.clone(),
        operation: InventoryOperation::UpdateQuantity,
        quantity: payload.available,
        product_title: detail.product_title().map(String::from),
        variant_title: detail.variant_title().map(String::from),
        price: detail.price().map(String::from),
        vendor: None,
        product_status: None,
        tracked: None,
    };

    let outcome = match relay(state, session, &push).await {
        Ok(outcome) => outcome,
        Err(body) => return body,
    };

    json!({
        "status": "success",
        "operation": "update_quantity",
        "data": {
            "sku": sku,
            "new_quantity": payload.available,
            "product_title": push.product_title,
            "variant_title": push.variant_title,
            "price": push.price,
            "inventory_item_id": payload.inventory_item_id,
            "location_id": payload.location_id,
        },
        "shipeu": outcome,
        "timestamp": timestamp(),
    })
}

/// Handle `inventory_items/create|update|delete`: enrich and relay.
async fn item_change(
    state: &AppState,
    session: &StoreSession,
    body: &[u8],
    operation: InventoryOperation,
) -> Value {
    let payload: InventoryItemPayload = match serde_json::from_slice(body) {
        Ok(p) => p,
        Err(e) => {
            return json!({
                "status": "error",
                "reason": "invalid_payload",
                "error": e.to_string(),
                "timestamp": timestamp(),
            });
        }
    };

    // Creation events announce the SKU in the payload itself; without one
    // there is nothing to key the Shipeu product on.
    if operation == InventoryOperation::CreateProduct && payload.sku.as_deref().unwrap_or("").is_empty() {
        tracing::warn!(inventory_item_id = payload.id, "New inventory item has no SKU");
        return json!({
            "status": "error",
            "reason": "no_sku_provided",
            "inventory_item_id": payload.id,
            "timestamp": timestamp(),
        });
    }

    let item_gid = format!("gid://shopify/InventoryItem/{}", payload.id);
    let detail = match state.shopify_for(session).get_inventory_item(&item_gid).await {
        Ok(detail) => detail,
        Err(e) => {
            tracing::error!(error = %e, "Inventory item lookup failed");
            return json!({
                "status": "error",
                "error": e.to_string(),
                "timestamp": timestamp(),
            });
        }
    };

    let sku = detail
        .as_ref()
        .and_then(|d| d.sku.clone())
        .or(payload.sku.clone());

    let Some(sku) = sku.filter(|s| !s.is_empty()) else {
        tracing::warn!(inventory_item_id = payload.id, "No SKU on inventory item");
        return json!({
            "status": "error",
            "reason": "no_sku_found",
            "inventory_item_id": payload.id,
            "timestamp": timestamp(),
        });
    };

    let detail = detail.unwrap_or_else(|| empty_detail(&item_gid));

    let push = InventoryPush {
        seller_id: seller_id(session),
        sku: sku.clone(),
        operation,
        quantity: None,
        product_title: detail.product_title().map(String::from),
        variant_title: detail.variant_title().map(String::from),
        price: detail.price().map(String::from),
        vendor: detail.vendor().map(String::from),
        product_status: detail.product_status().map(String::from),
        tracked: detail.tracked,
    };

    let outcome = match relay(state, session, &push).await {
        Ok(outcome) => outcome,
        Err(body) => return body,
    };

    let (operation_name, data) = match operation {
        InventoryOperation::CreateProduct => (
            "create_product",
            json!({
                "sku": sku,
                "inventory_item_id": payload.id,
                "product_title": push.product_title,
                "variant_title": push.variant_title,
                "price": push.price,
                "vendor": push.vendor,
                "product_status": push.product_status,
                "tracked": push.tracked,
            }),
        ),
        InventoryOperation::UpdateProduct | InventoryOperation::UpdateQuantity => (
            "update_product",
            json!({
                "sku": sku,
                "inventory_item_id": payload.id,
                "product_title": push.product_title,
                "variant_title": push.variant_title,
                "price": push.price,
                "vendor": push.vendor,
                "product_status": push.product_status,
                "tracked": push.tracked,
            }),
        ),
        InventoryOperation::DeleteProduct => (
            "delete_product",
            json!({
                "sku": sku,
                "inventory_item_id": payload.id,
                "product_title": push.product_title,
                "variant_title": push.variant_title,
            }),
        ),
    };

    json!({
        "status": "success",
        "operation": operation_name,
        "data": data,
        "shipeu": outcome,
        "timestamp": timestamp(),
    })
}

/// POST the normalized record to Shipeu, mapping failures to 200-bodies.
async fn relay(
    state: &AppState,
    session: &StoreSession,
    push: &InventoryPush,
) -> Result<Value, Value> {
    let Some(api_key) = &session.api_key else {
        tracing::warn!(shop = %session.shop, "Cannot relay: store has no API key");
        return Err(json!({
            "status": "error",
            "reason": "store_not_registered",
            "message": "Connect the store to Shipeu in the app settings",
            "timestamp": timestamp(),
        }));
    };

    state.shipeu().push_inventory(api_key, push).await.map_err(|e| {
        tracing::error!(error = %e, "Shipeu inventory push failed");
        json!({
            "status": "error",
            "error": e.to_string(),
            "timestamp": timestamp(),
        })
    })
}

/// The Shipeu-side identifier for this store.
fn seller_id(session: &StoreSession) -> String {
    session
        .shipeu_store_id
        .clone()
        .unwrap_or_else(|| session.shop.to_string())
}

/// Bare detail for items the lookup no longer returns (deleted items, or
/// a create event racing the query); the payload SKU carries the relay.
fn empty_detail(item_gid: &str) -> InventoryItemDetail {
    InventoryItemDetail {
        id: item_gid.to_string(),
        sku: None,
        tracked: None,
        variant: None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_level_payload_parses() {
        let payload: InventoryLevelPayload = serde_json::from_str(
            r#"{"inventory_item_id": 271878346596884000, "location_id": 74597728456, "available": 6, "updated_at": "2024-11-02T10:15:00Z"}"#,
        )
        .unwrap();

        assert_eq!(payload.inventory_item_id, 271_878_346_596_884_000);
        assert_eq!(payload.location_id, 74_597_728_456);
        assert_eq!(payload.available, Some(6));
    }

    #[test]
    fn test_inventory_level_payload_null_available() {
        // `available` is null for untracked items.
        let payload: InventoryLevelPayload = serde_json::from_str(
            r#"{"inventory_item_id": 1, "location_id": 2, "available": null}"#,
        )
        .unwrap();
        assert_eq!(payload.available, None);
    }

    #[test]
    fn test_inventory_item_payload_parses() {
        let payload: InventoryItemPayload = serde_json::from_str(
            r#"{"id": 271878346596884000, "sku": "TSHIRT-BLU-M", "created_at": "2024-11-02T10:15:00Z"}"#,
        )
        .unwrap();

        assert_eq!(payload.id, 271_878_346_596_884_000);
        assert_eq!(payload.sku.as_deref(), Some("TSHIRT-BLU-M"));
    }

    #[test]
    fn test_inventory_item_payload_without_sku() {
        let payload: InventoryItemPayload = serde_json::from_str(r#"{"id": 5}"#).unwrap();
        assert!(payload.sku.is_none());
    }

    #[test]
    fn test_inventory_level_payload_rejects_garbage() {
        assert!(serde_json::from_str::<InventoryLevelPayload>(r#"{"foo": 1}"#).is_err());
    }
}
