//! Order export endpoint for the Shipeu platform.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::authenticate_api_key;
use crate::shopify::ExportOrder;
use crate::state::AppState;

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/orders", get(list_orders))
}

#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub api_key: Option<String>,
    pub financial_status: Option<String>,
    pub status: Option<String>,
}

/// GET /api/orders - Flat order export, authenticated by bearer API key.
///
/// Returns orders from the export window reshaped for Shipeu; an empty
/// window is a 404 so the platform can tell "nothing to import" apart from
/// an empty success.
#[instrument(skip(state, headers, params))]
async fn list_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<OrdersQuery>,
) -> Result<Response, AppError> {
    let session = authenticate_api_key(&state, &headers, params.api_key.as_deref()).await?;

    let financial_status = params.financial_status.as_deref().unwrap_or("any");
    let status = params.status.as_deref().unwrap_or("any");

    let client = state.shopify_for(&session);
    let orders = client.get_recent_orders(financial_status, status).await?;

    if orders.is_empty() {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "No orders found" })),
        )
            .into_response());
    }

    let exported: Vec<ExportOrder> = orders.into_iter().map(ExportOrder::from).collect();

    tracing::info!(shop = %session.shop, count = exported.len(), "Orders exported");
    Ok(Json(json!({ "success": true, "orders": exported })).into_response())
}
