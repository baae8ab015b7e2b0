//! Integration tests for `ShipeuClient`.
//!
//! Uses `wiremock` to stand up a local HTTP server for each test so no
//! real network traffic is made. Tests cover the store lifecycle endpoints
//! and the inventory push, including the error mapping.

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shipeu_app::config::ShipeuConfig;
use shipeu_app::shipeu::{
    InventoryOperation, InventoryPush, RegisterStoreRequest, ShipeuClient, ShipeuError,
};
use shipeu_core::{ApiKey, SyncStatus};

const APP_KEY: &str = "test-app-key-1234567890";

/// Builds a `ShipeuClient` pointed at the mock server.
fn test_client(server: &MockServer) -> ShipeuClient {
    let config = ShipeuConfig {
        api_url: server.uri(),
        app_key: SecretString::from(APP_KEY),
    };
    ShipeuClient::new(&config).expect("failed to build test ShipeuClient")
}

fn register_request() -> RegisterStoreRequest {
    RegisterStoreRequest {
        store_name: "Demo Store".to_string(),
        email: "merchant@example.com".to_string(),
        primary_phone: "+34 600 000 000".to_string(),
        secondary_phone: None,
        address: "Calle Mayor 1".to_string(),
        contact_name: Some("Ana".to_string()),
        country: "ES".to_string(),
        state: "Madrid".to_string(),
        city: "Madrid".to_string(),
        postal_code: "28013".to_string(),
        tax_id: "B12345678".to_string(),
    }
}

// ---------------------------------------------------------------------------
// stores/register
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_store_returns_issued_key_and_store_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/stores/register"))
        .and(header("X-Shipeu-App-Key", APP_KEY))
        .and(body_partial_json(json!({
            "store_name": "Demo Store",
            "email": "merchant@example.com",
            "tax_id": "B12345678"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "api_key": "sk-1234567890abcdef",
            "store_id": "st_42",
            "status": "active"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let result = client.register_store(&register_request()).await;

    let registration = result.expect("expected Ok registration");
    assert_eq!(registration.api_key.as_str(), "sk-1234567890abcdef");
    assert_eq!(registration.store_id.as_deref(), Some("st_42"));
    assert_eq!(registration.status, SyncStatus::Active);
}

#[tokio::test]
async fn register_store_defaults_status_to_active_when_missing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/stores/register"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "api_key": "sk-1234567890abcdef"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let registration = client
        .register_store(&register_request())
        .await
        .expect("expected Ok registration");

    assert_eq!(registration.status, SyncStatus::Active);
    assert!(registration.store_id.is_none());
}

#[tokio::test]
async fn register_store_surfaces_api_error_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/stores/register"))
        .respond_with(ResponseTemplate::new(422).set_body_json(&json!({
            "message": "tax_id is required"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client
        .register_store(&register_request())
        .await
        .expect_err("expected Err on 422");

    match err {
        ShipeuError::Api { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "tax_id is required");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn register_store_rejects_implausible_issued_key() {
    let server = MockServer::start().await;

    // A key of 10 characters or fewer cannot be stored.
    Mock::given(method("POST"))
        .and(path("/stores/register"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "api_key": "short"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client
        .register_store(&register_request())
        .await
        .expect_err("expected Err on implausible key");

    assert!(matches!(err, ShipeuError::Parse(_)), "got: {err:?}");
}

// ---------------------------------------------------------------------------
// stores/sync
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sync_store_sends_bearer_key_and_email() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/stores/sync"))
        .and(header("Authorization", "Bearer existing-key-123"))
        .and(body_partial_json(json!({ "email": "merchant@example.com" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "store_id": "st_42",
            "status": "active"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let key = ApiKey::parse("existing-key-123").expect("valid key");
    let sync = client
        .sync_store(&key, "merchant@example.com")
        .await
        .expect("expected Ok sync");

    assert_eq!(sync.store_id.as_deref(), Some("st_42"));
    assert_eq!(sync.status, SyncStatus::Active);
}

#[tokio::test]
async fn sync_store_rejected_credentials_surface_as_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/stores/sync"))
        .respond_with(ResponseTemplate::new(401).set_body_json(&json!({
            "message": "API key not valid"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let key = ApiKey::parse("existing-key-123").expect("valid key");
    let err = client
        .sync_store(&key, "merchant@example.com")
        .await
        .expect_err("expected Err on 401");

    match err {
        ShipeuError::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "API key not valid");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// stores/regenerate-key
// ---------------------------------------------------------------------------

#[tokio::test]
async fn regenerate_api_key_returns_the_new_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/stores/regenerate-key"))
        .and(header("Authorization", "Bearer old-key-123456"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "new_api_key": "sk-new-key-7890abcdef"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let old = ApiKey::parse("old-key-123456").expect("valid key");
    let new = client
        .regenerate_api_key(&old)
        .await
        .expect("expected Ok new key");

    assert_eq!(new.as_str(), "sk-new-key-7890abcdef");
}

// ---------------------------------------------------------------------------
// inventory
// ---------------------------------------------------------------------------

#[tokio::test]
async fn push_inventory_forwards_the_normalized_record() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/inventory"))
        .and(header("Authorization", "Bearer merchant-key-123"))
        .and(body_partial_json(json!({
            "seller_id": "st_42",
            "sku": "TSHIRT-BLU-M",
            "operation": "update_quantity",
            "quantity": 6
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "accepted": true
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let key = ApiKey::parse("merchant-key-123").expect("valid key");
    let push = InventoryPush {
        seller_id: "st_42".to_string(),
        sku: "TSHIRT-BLU-M".to_string(),
        operation: InventoryOperation::UpdateQuantity,
        quantity: Some(6),
        product_title: Some("Blue T-Shirt".to_string()),
        variant_title: Some("M".to_string()),
        price: Some("19.95".to_string()),
        vendor: None,
        product_status: None,
        tracked: None,
    };

    let outcome = client
        .push_inventory(&key, &push)
        .await
        .expect("expected Ok outcome");

    assert_eq!(outcome["accepted"], true);
}

#[tokio::test]
async fn push_inventory_error_body_without_message_uses_raw_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/inventory"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let key = ApiKey::parse("merchant-key-123").expect("valid key");
    let push = InventoryPush {
        seller_id: "st_42".to_string(),
        sku: "TSHIRT-BLU-M".to_string(),
        operation: InventoryOperation::DeleteProduct,
        quantity: None,
        product_title: None,
        variant_title: None,
        price: None,
        vendor: None,
        product_status: None,
        tracked: None,
    };

    let err = client
        .push_inventory(&key, &push)
        .await
        .expect_err("expected Err on 500");

    match err {
        ShipeuError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "upstream exploded");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}
