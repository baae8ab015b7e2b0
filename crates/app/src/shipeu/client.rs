//! HTTP client for the Shipeu platform API.

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use shipeu_core::{ApiKey, SyncStatus};
use tracing::instrument;

use super::ShipeuError;
use super::types::{
    ErrorBody, InventoryPush, RegenerateResponse, RegisterResponse, RegisterStoreRequest,
    StoreRegistration, StoreSync, SyncResponse,
};
use crate::config::ShipeuConfig;

/// Request timeout for Shipeu calls.
const TIMEOUT_SECS: u64 = 30;

/// Shipeu platform API client.
///
/// The base URL comes from configuration so staging and test servers can be
/// targeted; every request carries the `X-Shipeu-App-Key` header.
#[derive(Clone)]
pub struct ShipeuClient {
    client: reqwest::Client,
    base_url: String,
}

impl ShipeuClient {
    /// Create a new Shipeu API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build (e.g. the app key
    /// is not a valid header value).
    pub fn new(config: &ShipeuConfig) -> Result<Self, ShipeuError> {
        let mut headers = HeaderMap::new();

        headers.insert(
            "X-Shipeu-App-Key",
            HeaderValue::from_str(config.app_key.expose_secret())
                .map_err(|e| ShipeuError::Parse(format!("Invalid app key format: {e}")))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Read an error message out of a failed response.
    async fn api_error(response: reqwest::Response) -> ShipeuError {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or(text);
        ShipeuError::Api { status, message }
    }

    /// Register a new store with Shipeu.
    ///
    /// # Errors
    ///
    /// Returns `ShipeuError::Api` on a rejected registration, or
    /// `ShipeuError::Parse` if the issued key does not parse.
    #[instrument(skip(self, request), fields(store_name = %request.store_name))]
    pub async fn register_store(
        &self,
        request: &RegisterStoreRequest,
    ) -> Result<StoreRegistration, ShipeuError> {
        let response = self
            .client
            .post(self.url("stores/register"))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let body: RegisterResponse = response.json().await?;

        let api_key = ApiKey::parse(&body.api_key)
            .map_err(|e| ShipeuError::Parse(format!("issued api_key: {e}")))?;

        Ok(StoreRegistration {
            api_key,
            store_id: body.store_id,
            status: parse_status(body.status.as_deref()),
        })
    }

    /// Sync an existing store by API key and email.
    ///
    /// # Errors
    ///
    /// Returns `ShipeuError::Api` when the credentials are rejected.
    #[instrument(skip(self, api_key))]
    pub async fn sync_store(&self, api_key: &ApiKey, email: &str) -> Result<StoreSync, ShipeuError> {
        let response = self
            .client
            .post(self.url("stores/sync"))
            .bearer_auth(api_key.as_str())
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let body: SyncResponse = response.json().await?;

        Ok(StoreSync {
            store_id: body.store_id,
            status: parse_status(body.status.as_deref()),
        })
    }

    /// Regenerate a store's API key; the old key stops working.
    ///
    /// # Errors
    ///
    /// Returns `ShipeuError::Api` when the old key is rejected, or
    /// `ShipeuError::Parse` if the new key does not parse.
    #[instrument(skip(self, old_api_key))]
    pub async fn regenerate_api_key(&self, old_api_key: &ApiKey) -> Result<ApiKey, ShipeuError> {
        let response = self
            .client
            .post(self.url("stores/regenerate-key"))
            .bearer_auth(old_api_key.as_str())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let body: RegenerateResponse = response.json().await?;

        ApiKey::parse(&body.new_api_key)
            .map_err(|e| ShipeuError::Parse(format!("regenerated api_key: {e}")))
    }

    /// Push a normalized inventory record.
    ///
    /// Returns Shipeu's response body as-is; the webhook relay forwards it
    /// to the caller.
    ///
    /// # Errors
    ///
    /// Returns `ShipeuError::Api` on a rejected push.
    #[instrument(skip(self, api_key, push), fields(sku = %push.sku, operation = ?push.operation))]
    pub async fn push_inventory(
        &self,
        api_key: &ApiKey,
        push: &InventoryPush,
    ) -> Result<serde_json::Value, ShipeuError> {
        let response = self
            .client
            .post(self.url("inventory"))
            .bearer_auth(api_key.as_str())
            .json(push)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        Ok(response.json().await.unwrap_or(serde_json::Value::Null))
    }
}

/// Map the platform's status strings, defaulting to active as the original
/// integration did.
fn parse_status(status: Option<&str>) -> SyncStatus {
    status
        .and_then(|s| s.parse().ok())
        .unwrap_or(SyncStatus::Active)
}
