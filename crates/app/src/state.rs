//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::models::StoreSession;
use crate::shipeu::{ShipeuClient, ShipeuError};
use crate::shopify::AdminClient;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; holds the configuration, the connection
/// pool, one shared HTTP client, and the Shipeu platform client.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: PgPool,
    http: reqwest::Client,
    shipeu: ShipeuClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the Shipeu HTTP client cannot be built.
    pub fn new(config: AppConfig, pool: PgPool) -> Result<Self, ShipeuError> {
        let shipeu = ShipeuClient::new(&config.shipeu)?;
        let http = reqwest::Client::new();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                http,
                shipeu,
            }),
        })
    }

    /// Get a reference to the application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the shared HTTP client.
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    /// Get a reference to the Shipeu platform client.
    #[must_use]
    pub fn shipeu(&self) -> &ShipeuClient {
        &self.inner.shipeu
    }

    /// Build a Shopify Admin client for a store's session.
    #[must_use]
    pub fn shopify_for(&self, session: &StoreSession) -> AdminClient {
        AdminClient::new(
            self.inner.http.clone(),
            session.shop.clone(),
            session.access_token.clone(),
            &self.inner.config.shopify.api_version,
        )
    }
}
