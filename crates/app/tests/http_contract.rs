//! Request/response contract tests.
//!
//! The router is exercised with `tower::ServiceExt::oneshot` against a
//! lazily-connecting pool, so everything that gates a request before the
//! database (API key extraction, webhook signatures) is tested for real,
//! and the paths that do hit the database demonstrate the error contracts:
//! JSON bodies, and webhooks answering 200 even on internal failure.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use secrecy::SecretString;
use sha2::Sha256;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use shipeu_app::config::{AppConfig, ShipeuConfig, ShopifyAppConfig};
use shipeu_app::routes;
use shipeu_app::state::AppState;

const API_SECRET: &str = "shpss_contract_test_secret";

fn test_router() -> Router {
    let config = AppConfig {
        database_url: SecretString::from("postgres://unused@127.0.0.1:1/unused"),
        host: "127.0.0.1".parse().expect("valid ip"),
        port: 0,
        base_url: "https://connector.test".to_string(),
        shopify: ShopifyAppConfig {
            api_key: "client-id".to_string(),
            api_secret: SecretString::from(API_SECRET),
            scopes: vec!["read_orders".to_string()],
            api_version: "2024-10".to_string(),
        },
        shipeu: ShipeuConfig {
            api_url: "https://shipeu.test/v1".to_string(),
            app_key: SecretString::from("app-key-1234567890"),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 1.0,
    };

    // Never connects: port 1 is closed, and the tested paths either fail
    // before the pool or demonstrate the database-down contract. The short
    // acquire timeout keeps the database-down tests fast.
    let pool = PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy("postgres://unused@127.0.0.1:1/unused")
        .expect("lazy pool");

    let session_layer = shipeu_app::middleware::create_session_layer(&pool, &config);
    let state = AppState::new(config, pool).expect("app state");
    routes::routes().layer(session_layer).with_state(state)
}

/// Sign a webhook body the way Shopify does.
fn webhook_signature(body: &[u8]) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(API_SECRET.as_bytes()).expect("hmac accepts any key length");
    mac.update(body);
    BASE64.encode(mac.finalize().into_bytes())
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("readable body");
    serde_json::from_slice(&bytes).expect("JSON body")
}

// ---------------------------------------------------------------------------
// API key contract
// ---------------------------------------------------------------------------

#[tokio::test]
async fn orders_without_api_key_is_401() {
    let response = test_router()
        .oneshot(
            Request::builder()
                .uri("/api/orders")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert!(
        json["error"].as_str().unwrap_or_default().contains("API key"),
        "unexpected error body: {json}"
    );
}

#[tokio::test]
async fn orders_with_unknown_key_and_database_down_is_500_json() {
    // The key parses, so the request reaches the session lookup; with the
    // database unreachable the contract is a JSON 500, not a hung request.
    let response = test_router()
        .oneshot(
            Request::builder()
                .uri("/api/orders?api_key=not-a-known-key-123")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Internal server error");
}

#[tokio::test]
async fn shipments_without_api_key_is_401() {
    let response = test_router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/shipments")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    r#"{"order_id":"gid://shopify/Order/1","tracking_number":"TRACK1"}"#,
                ))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Webhook contract
// ---------------------------------------------------------------------------

#[tokio::test]
async fn webhook_with_invalid_signature_is_401() {
    let response = test_router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/inventory")
                .header("X-Shopify-Topic", "inventory_levels/update")
                .header("X-Shopify-Shop-Domain", "demo-store.myshopify.com")
                .header("X-Shopify-Hmac-Sha256", "bm90IGEgcmVhbCBzaWduYXR1cmU=")
                .body(Body::from(r#"{"inventory_item_id":1}"#))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn webhook_without_signature_is_401() {
    let response = test_router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/app/uninstalled")
                .header("X-Shopify-Topic", "app/uninstalled")
                .header("X-Shopify-Shop-Domain", "demo-store.myshopify.com")
                .body(Body::from("{}"))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signed_webhook_with_bogus_shop_header_is_200_with_error_body() {
    let body = br#"{"inventory_item_id":1,"available":2,"location_id":3}"#;

    let response = test_router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/inventory")
                .header("X-Shopify-Topic", "inventory_levels/update")
                .header("X-Shopify-Shop-Domain", "not-a-shop.example.com")
                .header("X-Shopify-Hmac-Sha256", webhook_signature(body))
                .body(Body::from(&body[..]))
                .expect("request"),
        )
        .await
        .expect("response");

    // Post-verification failures never bubble as non-200: the sender must
    // not retry.
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "error");
}

#[tokio::test]
async fn signed_inventory_webhook_with_database_down_is_still_200() {
    let body = br#"{"inventory_item_id":1,"available":2,"location_id":3}"#;

    let response = test_router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/inventory")
                .header("X-Shopify-Topic", "inventory_levels/update")
                .header("X-Shopify-Shop-Domain", "demo-store.myshopify.com")
                .header("X-Shopify-Hmac-Sha256", webhook_signature(body))
                .body(Body::from(&body[..]))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "error");
}

#[tokio::test]
async fn signed_uninstall_webhook_with_database_down_is_still_200() {
    let body = br#"{"id":1,"name":"demo-store"}"#;

    let response = test_router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/app/uninstalled")
                .header("X-Shopify-Topic", "app/uninstalled")
                .header("X-Shopify-Shop-Domain", "demo-store.myshopify.com")
                .header("X-Shopify-Hmac-Sha256", webhook_signature(body))
                .body(Body::from(&body[..]))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// OAuth entry point
// ---------------------------------------------------------------------------

#[tokio::test]
async fn auth_without_shop_is_400() {
    let response = test_router()
        .oneshot(
            Request::builder()
                .uri("/auth")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn auth_with_non_myshopify_domain_is_400() {
    let response = test_router()
        .oneshot(
            Request::builder()
                .uri("/auth?shop=evil.example.com")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
}
