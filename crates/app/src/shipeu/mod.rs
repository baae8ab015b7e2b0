//! Shipeu platform REST API client.
//!
//! Covers the store lifecycle endpoints (`stores/register`, `stores/sync`,
//! `stores/regenerate-key`) and the inventory push used by the webhook
//! relay. All calls carry the application key header; store-scoped calls
//! additionally carry the merchant's bearer API key.

mod client;
mod types;

pub use client::ShipeuClient;
pub use types::{
    InventoryOperation, InventoryPush, RegisterStoreRequest, StoreRegistration, StoreSync,
};

use thiserror::Error;

/// Errors that can occur when interacting with the Shipeu API.
#[derive(Debug, Error)]
pub enum ShipeuError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body.
        message: String,
    },

    /// Failed to build the client or parse a response.
    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ShipeuError::Api {
            status: 422,
            message: "tax_id is required".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 422 - tax_id is required");
    }
}
