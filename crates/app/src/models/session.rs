//! The per-shop session record.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use shipeu_core::{ApiKey, Email, ShopDomain, SyncStatus};

/// A store's session: the single persisted entity of the connector.
///
/// Created on install, updated by the settings actions, deleted by the
/// app-uninstall webhook. Implements `Debug` manually to redact the
/// Shopify access token.
#[derive(Clone)]
pub struct StoreSession {
    /// Shop domain (tenant key).
    pub shop: ShopDomain,
    /// Shopify offline OAuth access token.
    pub access_token: SecretString,
    /// Granted OAuth scopes (comma-separated, as returned by Shopify).
    pub scope: String,
    /// Issued opaque API key, if any.
    pub api_key: Option<ApiKey>,
    /// Optional API key expiry.
    pub api_key_expires: Option<DateTime<Utc>>,
    /// Shipeu sync status.
    pub shipeu_status: SyncStatus,
    /// Email registered with Shipeu.
    pub shipeu_email: Option<Email>,
    /// External Shipeu store identifier.
    pub shipeu_store_id: Option<String>,
    /// Configured fulfillment-location id (numeric Shopify location id).
    pub shipeu_location_id: Option<i64>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl StoreSession {
    /// The configured location as a GraphQL gid, when set.
    #[must_use]
    pub fn location_gid(&self) -> Option<String> {
        self.shipeu_location_id
            .map(|id| format!("gid://shopify/Location/{id}"))
    }

    /// Whether the store has completed Shipeu registration.
    #[must_use]
    pub const fn is_registered(&self) -> bool {
        self.shipeu_store_id.is_some()
    }
}

impl std::fmt::Debug for StoreSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreSession")
            .field("shop", &self.shop)
            .field("access_token", &"[REDACTED]")
            .field("scope", &self.scope)
            .field("api_key", &self.api_key)
            .field("api_key_expires", &self.api_key_expires)
            .field("shipeu_status", &self.shipeu_status)
            .field("shipeu_email", &self.shipeu_email)
            .field("shipeu_store_id", &self.shipeu_store_id)
            .field("shipeu_location_id", &self.shipeu_location_id)
            .finish_non_exhaustive()
    }
}
