//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness check
//! GET  /health/ready                - Readiness check (verifies database)
//!
//! # OAuth install flow
//! GET  /auth                        - Begin OAuth (redirect to Shopify)
//! GET  /auth/callback               - OAuth callback (token exchange)
//!
//! # Settings (merchant-facing)
//! GET  /app/settings                - Settings page
//! POST /app/settings/generate-key   - Issue/regenerate the API key
//! POST /app/settings/register       - Register a new store with Shipeu
//! POST /app/settings/sync           - Sync an existing Shipeu store
//! POST /app/settings/location       - Configure the fulfillment location
//!
//! # API (bearer API key)
//! GET  /api/orders                  - Flat order export for Shipeu
//! POST /api/shipments               - Dispatch a shipment (move + fulfill)
//!
//! # Webhooks (HMAC-signed by Shopify)
//! POST /webhooks/app/uninstalled    - Delete the shop's sessions
//! POST /webhooks/inventory          - Inventory relay to Shipeu
//! ```

pub mod auth;
pub mod orders;
pub mod settings;
pub mod shipments;
pub mod webhooks;

use axum::Router;

use crate::state::AppState;

/// Build the application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(settings::router())
        .merge(orders::router())
        .merge(shipments::router())
        .merge(webhooks::router())
}
