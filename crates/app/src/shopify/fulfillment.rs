//! Fulfillment-order operations for the shipment dispatch relay.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{GraphQLError, ShopifyError, UserError, check_user_errors, client::AdminClient};

const FULFILLMENT_ORDERS_QUERY: &str = r"
    query GetOrderFulfillmentOrders($id: ID!) {
        order(id: $id) {
            id
            name
            fulfillmentOrders(first: 10) {
                edges {
                    node {
                        id
                        status
                        assignedLocation {
                            name
                            location {
                                id
                            }
                        }
                    }
                }
            }
        }
    }
";

const MOVE_MUTATION: &str = r"
    mutation MoveFulfillmentOrder($id: ID!, $newLocationId: ID!) {
        fulfillmentOrderMove(fulfillmentOrderId: $id, newLocationId: $newLocationId) {
            movedFulfillmentOrder {
                id
            }
            userErrors {
                field
                message
            }
        }
    }
";

const FULFILLMENT_CREATE_MUTATION: &str = r"
    mutation CreateFulfillment($fulfillment: FulfillmentV2Input!) {
        fulfillmentCreateV2(fulfillment: $fulfillment) {
            fulfillment {
                id
                status
            }
            userErrors {
                field
                message
            }
        }
    }
";

/// A fulfillment order attached to an order, with its assigned location.
#[derive(Debug, Clone)]
pub struct FulfillmentOrderSummary {
    /// Fulfillment order gid.
    pub id: String,
    /// Fulfillment order status (e.g. `OPEN`).
    pub status: String,
    /// Assigned location gid, when resolvable.
    pub assigned_location_id: Option<String>,
    /// Assigned location display name.
    pub assigned_location_name: Option<String>,
}

/// The result of creating one fulfillment.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    /// Created fulfillment gid.
    pub fulfillment_id: String,
    /// Fulfillment status (e.g. `SUCCESS`).
    pub status: String,
    /// Whether the fulfillment order had to be moved first.
    pub moved: bool,
}

impl AdminClient {
    /// Get the fulfillment orders attached to an order.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::NotFound` if the order does not exist, or any
    /// API error.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_fulfillment_orders(
        &self,
        order_id: &str,
    ) -> Result<Vec<FulfillmentOrderSummary>, ShopifyError> {
        #[derive(Debug, Deserialize)]
        struct Data {
            order: Option<OrderNode>,
        }

        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct OrderNode {
            fulfillment_orders: Connection,
        }

        #[derive(Debug, Deserialize)]
        struct Connection {
            edges: Vec<Edge>,
        }

        #[derive(Debug, Deserialize)]
        struct Edge {
            node: FulfillmentOrderNode,
        }

        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct FulfillmentOrderNode {
            id: String,
            status: String,
            assigned_location: Option<AssignedLocation>,
        }

        #[derive(Debug, Deserialize)]
        struct AssignedLocation {
            name: Option<String>,
            location: Option<Location>,
        }

        #[derive(Debug, Deserialize)]
        struct Location {
            id: String,
        }

        let variables = serde_json::json!({ "id": order_id });
        let data: Data = self
            .execute(FULFILLMENT_ORDERS_QUERY, Some(variables))
            .await?;

        let order = data
            .order
            .ok_or_else(|| ShopifyError::NotFound(format!("order {order_id}")))?;

        Ok(order
            .fulfillment_orders
            .edges
            .into_iter()
            .map(|e| FulfillmentOrderSummary {
                id: e.node.id,
                status: e.node.status,
                assigned_location_id: e
                    .node
                    .assigned_location
                    .as_ref()
                    .and_then(|l| l.location.as_ref())
                    .map(|l| l.id.clone()),
                assigned_location_name: e.node.assigned_location.and_then(|l| l.name),
            })
            .collect())
    }

    /// Move a fulfillment order to another location.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self), fields(fulfillment_order_id = %fulfillment_order_id))]
    pub async fn move_fulfillment_order(
        &self,
        fulfillment_order_id: &str,
        new_location_id: &str,
    ) -> Result<(), ShopifyError> {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            fulfillment_order_move: Option<Payload>,
        }

        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Payload {
            user_errors: Vec<UserError>,
        }

        let variables = serde_json::json!({
            "id": fulfillment_order_id,
            "newLocationId": new_location_id,
        });

        let data: Data = self.execute(MOVE_MUTATION, Some(variables)).await?;

        let payload = data.fulfillment_order_move.ok_or_else(|| {
            ShopifyError::GraphQL(vec![GraphQLError {
                message: "No fulfillmentOrderMove payload".to_string(),
                path: vec![],
            }])
        })?;

        check_user_errors(&payload.user_errors)
    }

    /// Create a fulfillment for a fulfillment order, with tracking info.
    ///
    /// # Arguments
    ///
    /// * `fulfillment_order_id` - Fulfillment order gid to fulfill
    /// * `tracking_number` - Carrier tracking number
    /// * `tracking_url` - Optional tracking URL
    /// * `notify_customer` - Whether Shopify should email the buyer
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self), fields(fulfillment_order_id = %fulfillment_order_id))]
    pub async fn create_fulfillment(
        &self,
        fulfillment_order_id: &str,
        tracking_number: &str,
        tracking_url: Option<&str>,
        notify_customer: bool,
    ) -> Result<(String, String), ShopifyError> {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            fulfillment_create_v2: Option<Payload>,
        }

        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Payload {
            fulfillment: Option<Fulfillment>,
            user_errors: Vec<UserError>,
        }

        #[derive(Debug, Deserialize)]
        struct Fulfillment {
            id: String,
            status: String,
        }

        let mut tracking_info = serde_json::json!({ "number": tracking_number });
        if let Some(url) = tracking_url {
            tracking_info["url"] = serde_json::Value::String(url.to_string());
        }

        let variables = serde_json::json!({
            "fulfillment": {
                "lineItemsByFulfillmentOrder": [
                    { "fulfillmentOrderId": fulfillment_order_id }
                ],
                "trackingInfo": tracking_info,
                "notifyCustomer": notify_customer,
            }
        });

        let data: Data = self
            .execute(FULFILLMENT_CREATE_MUTATION, Some(variables))
            .await?;

        let payload = data.fulfillment_create_v2.ok_or_else(|| {
            ShopifyError::GraphQL(vec![GraphQLError {
                message: "No fulfillmentCreateV2 payload".to_string(),
                path: vec![],
            }])
        })?;

        check_user_errors(&payload.user_errors)?;

        payload
            .fulfillment
            .map(|f| (f.id, f.status))
            .ok_or_else(|| {
                ShopifyError::GraphQL(vec![GraphQLError {
                    message: "No fulfillment returned from create".to_string(),
                    path: vec![],
                }])
            })
    }
}
