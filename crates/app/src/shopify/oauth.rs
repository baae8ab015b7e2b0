//! Shopify OAuth flow helpers.
//!
//! The install flow is the standard authorization-code grant: redirect the
//! merchant to the shop's authorize URL, then verify the callback's HMAC and
//! state before exchanging the code for an offline access token.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use shipeu_core::ShopDomain;

use super::ShopifyError;
use crate::config::ShopifyAppConfig;

type HmacSha256 = Hmac<Sha256>;

/// Query parameters Shopify sends to the OAuth callback.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub shop: Option<String>,
    pub hmac: Option<String>,
    pub timestamp: Option<String>,
    pub host: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// An access token obtained from the code exchange.
#[derive(Debug, Deserialize)]
pub struct AccessToken {
    /// The offline access token.
    pub access_token: String,
    /// Granted scopes, comma-separated.
    pub scope: String,
}

/// Build the authorization URL for a shop.
#[must_use]
pub fn authorization_url(
    config: &ShopifyAppConfig,
    shop: &ShopDomain,
    redirect_uri: &str,
    state: &str,
) -> String {
    let scope = config.scopes.join(",");
    format!(
        "https://{}/admin/oauth/authorize?client_id={}&scope={}&redirect_uri={}&state={}",
        shop,
        urlencoding::encode(&config.api_key),
        urlencoding::encode(&scope),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(state)
    )
}

/// Exchange an authorization code for an offline access token.
///
/// # Errors
///
/// Returns `ShopifyError::OAuth` if the token exchange is rejected.
/// Returns `ShopifyError::Http` if the HTTP request fails.
pub async fn exchange_code(
    client: &reqwest::Client,
    config: &ShopifyAppConfig,
    shop: &ShopDomain,
    code: &str,
) -> Result<AccessToken, ShopifyError> {
    use secrecy::ExposeSecret;

    let url = format!("https://{shop}/admin/oauth/access_token");

    let params = [
        ("client_id", config.api_key.as_str()),
        ("client_secret", config.api_secret.expose_secret()),
        ("code", code),
    ];

    let response = client.post(&url).form(&params).send().await?;

    if !response.status().is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(ShopifyError::OAuth(format!("Token exchange failed: {text}")));
    }

    Ok(response.json().await?)
}

/// Verify the HMAC signature of an OAuth callback.
///
/// The message is the callback's parameters minus `hmac`, sorted by key and
/// joined `key=value&...`; the signature is hex-encoded HMAC-SHA256 under
/// the app secret.
#[must_use]
pub fn verify_callback_hmac(params: &CallbackParams, api_secret: &str) -> bool {
    let Some(provided_hmac) = &params.hmac else {
        return false;
    };

    // Build the message from sorted params (excluding hmac)
    let mut param_pairs: Vec<(&str, &str)> = Vec::new();

    if let Some(v) = &params.code {
        param_pairs.push(("code", v));
    }
    if let Some(v) = &params.host {
        param_pairs.push(("host", v));
    }
    if let Some(v) = &params.shop {
        param_pairs.push(("shop", v));
    }
    if let Some(v) = &params.state {
        param_pairs.push(("state", v));
    }
    if let Some(v) = &params.timestamp {
        param_pairs.push(("timestamp", v));
    }

    param_pairs.sort_by(|a, b| a.0.cmp(b.0));

    let message: String = param_pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let Ok(provided) = hex::decode(provided_hmac) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(api_secret.as_bytes()) else {
        return false;
    };
    mac.update(message.as_bytes());

    mac.verify_slice(&provided).is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    const SECRET: &str = "hush";

    fn test_config() -> ShopifyAppConfig {
        ShopifyAppConfig {
            api_key: "client-id".to_string(),
            api_secret: SecretString::from(SECRET),
            scopes: vec!["read_orders".to_string(), "write_fulfillments".to_string()],
            api_version: "2024-10".to_string(),
        }
    }

    fn signed_params(shop: &str, code: &str, state: &str, timestamp: &str) -> CallbackParams {
        let message = format!("code={code}&shop={shop}&state={state}&timestamp={timestamp}");
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(message.as_bytes());
        let hmac = hex::encode(mac.finalize().into_bytes());

        CallbackParams {
            code: Some(code.to_string()),
            state: Some(state.to_string()),
            shop: Some(shop.to_string()),
            hmac: Some(hmac),
            timestamp: Some(timestamp.to_string()),
            host: None,
            error: None,
            error_description: None,
        }
    }

    #[test]
    fn test_authorization_url_contains_all_parts() {
        let config = test_config();
        let shop = ShopDomain::parse("demo-store.myshopify.com").unwrap();
        let url = authorization_url(
            &config,
            &shop,
            "https://app.example.com/auth/callback",
            "nonce-1",
        );

        assert!(url.starts_with("https://demo-store.myshopify.com/admin/oauth/authorize?"));
        assert!(url.contains("client_id=client-id"));
        assert!(url.contains("scope=read_orders%2Cwrite_fulfillments"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fapp.example.com%2Fauth%2Fcallback"));
        assert!(url.contains("state=nonce-1"));
    }

    #[test]
    fn test_verify_callback_hmac_accepts_valid() {
        let params = signed_params("demo-store.myshopify.com", "abc123", "nonce-1", "1700000000");
        assert!(verify_callback_hmac(&params, SECRET));
    }

    #[test]
    fn test_verify_callback_hmac_rejects_tampered_shop() {
        let mut params =
            signed_params("demo-store.myshopify.com", "abc123", "nonce-1", "1700000000");
        params.shop = Some("evil.myshopify.com".to_string());
        assert!(!verify_callback_hmac(&params, SECRET));
    }

    #[test]
    fn test_verify_callback_hmac_rejects_wrong_secret() {
        let params = signed_params("demo-store.myshopify.com", "abc123", "nonce-1", "1700000000");
        assert!(!verify_callback_hmac(&params, "different"));
    }

    #[test]
    fn test_verify_callback_hmac_rejects_missing_hmac() {
        let mut params =
            signed_params("demo-store.myshopify.com", "abc123", "nonce-1", "1700000000");
        params.hmac = None;
        assert!(!verify_callback_hmac(&params, SECRET));
    }

    #[test]
    fn test_verify_callback_hmac_rejects_non_hex() {
        let mut params =
            signed_params("demo-store.myshopify.com", "abc123", "nonce-1", "1700000000");
        params.hmac = Some("zz-not-hex".to_string());
        assert!(!verify_callback_hmac(&params, SECRET));
    }
}
