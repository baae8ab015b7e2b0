//! Per-shop Shopify Admin API GraphQL client.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};
use shipeu_core::ShopDomain;
use tracing::instrument;

use super::{GraphQLError, ShopifyError, check_user_errors};

/// Shopify Admin API GraphQL client, bound to a single shop.
///
/// Constructed per request from the shop's session row; the underlying
/// `reqwest::Client` is shared application-wide, so construction is cheap.
#[derive(Clone)]
pub struct AdminClient {
    client: reqwest::Client,
    shop: ShopDomain,
    access_token: SecretString,
    api_version: String,
}

/// GraphQL response wrapper.
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLErrorResponse>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorResponse {
    message: String,
    #[serde(default)]
    path: Vec<serde_json::Value>,
}

impl AdminClient {
    /// Create a client for one shop.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        shop: ShopDomain,
        access_token: SecretString,
        api_version: &str,
    ) -> Self {
        Self {
            client,
            shop,
            access_token,
            api_version: api_version.to_string(),
        }
    }

    /// The shop this client is bound to.
    #[must_use]
    pub const fn shop(&self) -> &ShopDomain {
        &self.shop
    }

    fn endpoint(&self) -> String {
        format!(
            "https://{}/admin/api/{}/graphql.json",
            self.shop, self.api_version
        )
    }

    /// Execute a GraphQL query or mutation.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::RateLimited` when throttled,
    /// `ShopifyError::Unauthorized` on a rejected token,
    /// `ShopifyError::GraphQL` when the response carries errors, and
    /// `ShopifyError::Http` on network failures.
    #[instrument(skip(self, query, variables), fields(shop = %self.shop))]
    pub async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Option<serde_json::Value>,
    ) -> Result<T, ShopifyError> {
        let body = serde_json::json!({
            "query": query,
            "variables": variables.unwrap_or(serde_json::Value::Null)
        });

        let response = self
            .client
            .post(self.endpoint())
            .header("X-Shopify-Access-Token", self.access_token.expose_secret())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        // Check for rate limiting
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        // Check for unauthorized
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ShopifyError::Unauthorized(
                "Invalid or expired access token".to_string(),
            ));
        }

        let graphql_response: GraphQLResponse<T> = response.json().await?;

        // Check for GraphQL errors
        if let Some(errors) = graphql_response.errors
            && !errors.is_empty()
        {
            let converted: Vec<GraphQLError> = errors
                .into_iter()
                .map(|e| GraphQLError {
                    message: e.message,
                    path: e.path,
                })
                .collect();
            return Err(ShopifyError::GraphQL(converted));
        }

        graphql_response.data.ok_or_else(|| {
            ShopifyError::GraphQL(vec![GraphQLError {
                message: "No data in response".to_string(),
                path: vec![],
            }])
        })
    }

    // =========================================================================
    // Webhook subscriptions
    // =========================================================================

    /// Register a webhook subscription pointing at this app.
    ///
    /// # Arguments
    ///
    /// * `topic` - GraphQL topic enum value (e.g. `INVENTORY_LEVELS_UPDATE`)
    /// * `callback_url` - Absolute HTTPS URL Shopify should POST to
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    /// An already-registered topic surfaces as a user error ("address for
    /// this topic has already been taken") and is the caller's to tolerate.
    #[instrument(skip(self), fields(shop = %self.shop, topic = %topic))]
    pub async fn register_webhook(
        &self,
        topic: &str,
        callback_url: &str,
    ) -> Result<String, ShopifyError> {
        const MUTATION: &str = r"
            mutation RegisterWebhook($topic: WebhookSubscriptionTopic!, $webhookSubscription: WebhookSubscriptionInput!) {
                webhookSubscriptionCreate(topic: $topic, webhookSubscription: $webhookSubscription) {
                    webhookSubscription {
                        id
                    }
                    userErrors {
                        field
                        message
                    }
                }
            }
        ";

        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            webhook_subscription_create: Option<Payload>,
        }

        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Payload {
            webhook_subscription: Option<Subscription>,
            user_errors: Vec<super::UserError>,
        }

        #[derive(Debug, Deserialize)]
        struct Subscription {
            id: String,
        }

        let variables = serde_json::json!({
            "topic": topic,
            "webhookSubscription": {
                "callbackUrl": callback_url,
                "format": "JSON",
            }
        });

        let data: Data = self.execute(MUTATION, Some(variables)).await?;

        let payload = data.webhook_subscription_create.ok_or_else(|| {
            ShopifyError::GraphQL(vec![GraphQLError {
                message: "No webhookSubscriptionCreate payload".to_string(),
                path: vec![],
            }])
        })?;

        check_user_errors(&payload.user_errors)?;

        payload
            .webhook_subscription
            .map(|s| s.id)
            .ok_or_else(|| {
                ShopifyError::GraphQL(vec![GraphQLError {
                    message: "No subscription returned from create".to_string(),
                    path: vec![],
                }])
            })
    }
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient")
            .field("shop", &self.shop)
            .field("access_token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_shape() {
        let client = AdminClient::new(
            reqwest::Client::new(),
            ShopDomain::parse("demo-store.myshopify.com").unwrap(),
            SecretString::from("shpat_token"),
            "2024-10",
        );
        assert_eq!(
            client.endpoint(),
            "https://demo-store.myshopify.com/admin/api/2024-10/graphql.json"
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = AdminClient::new(
            reqwest::Client::new(),
            ShopDomain::parse("demo-store.myshopify.com").unwrap(),
            SecretString::from("shpat_token"),
            "2024-10",
        );
        let debug = format!("{client:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("shpat_token"));
    }
}
