//! Shipment dispatch relay.
//!
//! Given an order id and tracking number, moves the order's fulfillment
//! orders to the configured location when assigned elsewhere, then creates
//! a fulfillment with the tracking info.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::authenticate_api_key;
use crate::shopify::DispatchOutcome;
use crate::state::AppState;

/// Build the shipments router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/shipments", post(dispatch))
}

#[derive(Debug, Deserialize)]
pub struct ShipmentsQuery {
    pub api_key: Option<String>,
}

/// Dispatch request: one order, one tracking number.
#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    /// Shopify order gid (e.g. `gid://shopify/Order/123`).
    pub order_id: String,
    pub tracking_number: String,
    pub tracking_url: Option<String>,
    /// Whether Shopify should email the buyer (default true).
    pub notify_customer: Option<bool>,
}

/// A fulfillment order that could not be dispatched.
#[derive(Debug, Serialize)]
struct DispatchFailure {
    fulfillment_order_id: String,
    error: String,
}

/// POST /api/shipments - Move and fulfill an order's fulfillment orders.
#[instrument(skip(state, headers, params, req))]
async fn dispatch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ShipmentsQuery>,
    Json(req): Json<DispatchRequest>,
) -> Result<Response, AppError> {
    let session = authenticate_api_key(&state, &headers, params.api_key.as_deref()).await?;

    if req.order_id.trim().is_empty() || req.tracking_number.trim().is_empty() {
        return Err(AppError::BadRequest(
            "order_id and tracking_number are required".to_string(),
        ));
    }

    let Some(location_gid) = session.location_gid() else {
        return Err(AppError::BadRequest(
            "No fulfillment location configured for this store".to_string(),
        ));
    };

    let client = state.shopify_for(&session);
    let fulfillment_orders = client.get_fulfillment_orders(&req.order_id).await?;

    if fulfillment_orders.is_empty() {
        return Err(AppError::NotFound(format!(
            "Order {} has no fulfillment orders",
            req.order_id
        )));
    }

    let notify = req.notify_customer.unwrap_or(true);
    let mut fulfilled: Vec<DispatchOutcome> = Vec::new();
    let mut failed: Vec<DispatchFailure> = Vec::new();

    for fo in fulfillment_orders {
        let needs_move = fo.assigned_location_id.as_deref() != Some(location_gid.as_str());

        let result = async {
            if needs_move {
                client.move_fulfillment_order(&fo.id, &location_gid).await?;
            }
            client
                .create_fulfillment(
                    &fo.id,
                    req.tracking_number.trim(),
                    req.tracking_url.as_deref(),
                    notify,
                )
                .await
        }
        .await;

        match result {
            Ok((fulfillment_id, status)) => fulfilled.push(DispatchOutcome {
                fulfillment_id,
                status,
                moved: needs_move,
            }),
            Err(e) => {
                tracing::error!(fulfillment_order_id = %fo.id, error = %e, "Dispatch failed");
                failed.push(DispatchFailure {
                    fulfillment_order_id: fo.id,
                    error: e.to_string(),
                });
            }
        }
    }

    let status = if fulfilled.is_empty() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    };

    tracing::info!(
        shop = %session.shop,
        order_id = %req.order_id,
        fulfilled = fulfilled.len(),
        failed = failed.len(),
        "Shipment dispatch finished"
    );

    Ok((
        status,
        Json(json!({
            "success": !fulfilled.is_empty(),
            "order_id": req.order_id,
            "tracking_number": req.tracking_number.trim(),
            "fulfilled": fulfilled,
            "failed": failed,
        })),
    )
        .into_response())
}
