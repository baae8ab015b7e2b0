//! Request and response types for the Shipeu API.

use serde::{Deserialize, Serialize};
use shipeu_core::{ApiKey, SyncStatus};

/// Store registration request (`POST stores/register`).
#[derive(Debug, Clone, Serialize)]
pub struct RegisterStoreRequest {
    pub store_name: String,
    pub email: String,
    pub primary_phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_phone: Option<String>,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    pub country: String,
    pub state: String,
    pub city: String,
    pub postal_code: String,
    pub tax_id: String,
}

/// Outcome of a store registration.
#[derive(Debug, Clone)]
pub struct StoreRegistration {
    /// API key issued by Shipeu for this store.
    pub api_key: ApiKey,
    /// External store identifier, when the platform assigns one.
    pub store_id: Option<String>,
    /// Confirmed status (defaults to active).
    pub status: SyncStatus,
}

/// Outcome of syncing an existing store.
#[derive(Debug, Clone)]
pub struct StoreSync {
    /// External store identifier, when returned.
    pub store_id: Option<String>,
    /// Confirmed status (defaults to active).
    pub status: SyncStatus,
}

/// Inventory operation relayed from a webhook topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryOperation {
    /// `inventory_levels/update`
    UpdateQuantity,
    /// `inventory_items/create`
    CreateProduct,
    /// `inventory_items/update`
    UpdateProduct,
    /// `inventory_items/delete`
    DeleteProduct,
}

/// Normalized inventory record pushed to Shipeu (`POST inventory`).
#[derive(Debug, Clone, Serialize)]
pub struct InventoryPush {
    /// Shipeu-side store identifier (store id when assigned, shop domain
    /// otherwise).
    pub seller_id: String,
    pub sku: String,
    pub operation: InventoryOperation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracked: Option<bool>,
}

/// Wire response for registration.
#[derive(Debug, Deserialize)]
pub(super) struct RegisterResponse {
    pub api_key: String,
    pub store_id: Option<String>,
    pub status: Option<String>,
}

/// Wire response for sync.
#[derive(Debug, Deserialize)]
pub(super) struct SyncResponse {
    pub store_id: Option<String>,
    pub status: Option<String>,
}

/// Wire response for key regeneration.
#[derive(Debug, Deserialize)]
pub(super) struct RegenerateResponse {
    pub new_api_key: String,
}

/// Wire error body (`{"message": "..."}`).
#[derive(Debug, Deserialize)]
pub(super) struct ErrorBody {
    pub message: Option<String>,
}
