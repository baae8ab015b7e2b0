//! Shopify Admin API client and signature verification.
//!
//! # Architecture
//!
//! - One [`AdminClient`] per shop, bound to that shop's offline access
//!   token from the session table
//! - Raw GraphQL query strings with typed `Deserialize` responses
//! - Rate limiting surfaced as a typed error
//!
//! # Example
//!
//! ```rust,ignore
//! use shipeu_app::shopify::AdminClient;
//!
//! let client = AdminClient::new(&http, shop, access_token, "2024-10");
//!
//! // Fetch the inventory item a webhook refers to
//! let item = client.get_inventory_item("gid://shopify/InventoryItem/123").await?;
//! ```

mod client;
mod fulfillment;
mod inventory;
pub mod oauth;
mod orders;
mod verify;

pub use client::AdminClient;
pub use fulfillment::{DispatchOutcome, FulfillmentOrderSummary};
pub use inventory::InventoryItemDetail;
pub use orders::{ExportLineItem, ExportOrder, OrderNode, UnitPrice};
pub use verify::verify_webhook_hmac;

use thiserror::Error;

/// Errors that can occur when interacting with the Shopify Admin API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication/authorization failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// OAuth flow failure (token exchange, callback verification).
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// User error from a mutation (e.g., invalid input).
    #[error("User error: {0}")]
    UserError(String),
}

/// A GraphQL error returned by the Shopify Admin API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Fold a mutation's `userErrors` array into a `ShopifyError::UserError`.
///
/// Returns `Ok(())` when the array is empty.
pub(crate) fn check_user_errors(errors: &[UserError]) -> Result<(), ShopifyError> {
    if errors.is_empty() {
        return Ok(());
    }

    let messages: Vec<String> = errors
        .iter()
        .map(|e| {
            let field = e.field.as_ref().map_or_else(String::new, |f| f.join("."));
            format!("{}: {}", field, e.message)
        })
        .collect();
    Err(ShopifyError::UserError(messages.join("; ")))
}

/// A `userErrors` entry from a mutation payload.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct UserError {
    /// Input field path the error refers to.
    pub field: Option<Vec<String>>,
    /// Error message.
    pub message: String,
}
