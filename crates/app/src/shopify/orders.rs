//! Order export: fixed orders query plus the flat reshaping Shipeu ingests.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{ShopifyError, client::AdminClient};

/// How far back the export window reaches.
const EXPORT_WINDOW_DAYS: i64 = 15;

/// Orders fetched per export call.
const EXPORT_ORDER_LIMIT: i64 = 100;

/// Line items fetched per order.
const EXPORT_LINE_ITEM_LIMIT: i64 = 50;

const ORDERS_QUERY: &str = r"
    query GetExportOrders($first: Int!, $lineItems: Int!, $query: String) {
        orders(first: $first, query: $query) {
            edges {
                node {
                    id
                    name
                    processedAt
                    totalPrice
                    email
                    currencyCode
                    paymentGatewayNames
                    subtotalLineItemsQuantity
                    lineItems(first: $lineItems) {
                        edges {
                            node {
                                id
                                quantity
                                name
                                originalUnitPrice
                                discountedUnitPrice
                                variant {
                                    id
                                    sku
                                    price
                                    product {
                                        id
                                        title
                                        handle
                                    }
                                }
                            }
                        }
                    }
                    billingAddress {
                        phone
                    }
                    shippingAddress {
                        firstName
                        lastName
                        address1
                        address2
                        zip
                        city
                        province
                        company
                        country
                        phone
                    }
                    refunds {
                        totalRefundedSet {
                            shopMoney {
                                amount
                            }
                        }
                    }
                }
            }
        }
    }
";

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Deserialize)]
struct OrdersData {
    orders: Connection<OrderNode>,
}

#[derive(Debug, Deserialize)]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
pub struct Edge<T> {
    pub node: T,
}

/// One order as returned by the export query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderNode {
    pub id: String,
    pub name: String,
    pub processed_at: Option<String>,
    pub total_price: String,
    pub email: Option<String>,
    pub currency_code: String,
    #[serde(default)]
    pub payment_gateway_names: Vec<String>,
    #[serde(default)]
    pub subtotal_line_items_quantity: i64,
    pub line_items: Connection<LineItemNode>,
    pub billing_address: Option<BillingAddress>,
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub refunds: Vec<RefundNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemNode {
    pub id: String,
    pub quantity: i64,
    pub name: String,
    pub original_unit_price: String,
    pub discounted_unit_price: String,
    pub variant: Option<VariantNode>,
}

#[derive(Debug, Deserialize)]
pub struct VariantNode {
    pub id: String,
    pub sku: Option<String>,
    pub price: String,
    pub product: ProductNode,
}

#[derive(Debug, Deserialize)]
pub struct ProductNode {
    pub id: String,
    pub title: String,
    pub handle: String,
}

#[derive(Debug, Deserialize)]
pub struct BillingAddress {
    pub phone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub zip: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub company: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundNode {
    pub total_refunded_set: MoneyBag,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyBag {
    pub shop_money: MoneyV2,
}

#[derive(Debug, Deserialize)]
pub struct MoneyV2 {
    pub amount: String,
}

// =============================================================================
// Export format
// =============================================================================

/// The flat order record the Shipeu platform ingests.
#[derive(Debug, Clone, Serialize)]
pub struct ExportOrder {
    /// Human order number (e.g. `#1001`).
    pub order_id: String,
    /// Shopify order gid.
    #[serde(rename = "idWS")]
    pub remote_id: String,
    pub date: String,
    /// Order total net of refunds.
    pub order_total: f64,
    pub order_currency: String,
    pub billing_email: String,
    pub billing_phone: String,
    pub shipping_first_name: String,
    pub shipping_last_name: String,
    pub shipping_address_1: String,
    pub shipping_address_2: String,
    pub shipping_postcode: String,
    pub shipping_city: String,
    pub shipping_state: String,
    pub shipping_company: String,
    pub shipping_country: String,
    pub payment_method: String,
    pub date_created: String,
    pub line_items: Vec<ExportLineItem>,
}

/// One exported line item.
#[derive(Debug, Clone, Serialize)]
pub struct ExportLineItem {
    pub id: String,
    pub quantity: i64,
    pub name: String,
    pub price: UnitPrice,
    pub variant: Option<ExportVariant>,
}

/// Original vs discounted unit price.
#[derive(Debug, Clone, Serialize)]
pub struct UnitPrice {
    pub original: String,
    pub discounted: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportVariant {
    pub id: String,
    pub sku: Option<String>,
    pub price: String,
    pub product: ExportProduct,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportProduct {
    pub id: String,
    pub title: String,
    pub handle: String,
}

impl From<OrderNode> for ExportOrder {
    fn from(node: OrderNode) -> Self {
        let total_refunded: f64 = node
            .refunds
            .iter()
            .filter_map(|r| r.total_refunded_set.shop_money.amount.parse::<f64>().ok())
            .sum();
        let total: f64 = node.total_price.parse().unwrap_or(0.0);

        let billing_phone = node
            .billing_address
            .as_ref()
            .and_then(|a| a.phone.clone())
            .or_else(|| {
                node.shipping_address
                    .as_ref()
                    .and_then(|a| a.phone.clone())
            })
            .unwrap_or_default();

        let shipping = node.shipping_address.unwrap_or_default();

        let line_items = node
            .line_items
            .edges
            .into_iter()
            .map(|e| {
                let item = e.node;
                ExportLineItem {
                    id: item.id,
                    quantity: item.quantity,
                    name: item.name,
                    price: UnitPrice {
                        original: item.original_unit_price,
                        discounted: item.discounted_unit_price,
                    },
                    variant: item.variant.map(|v| ExportVariant {
                        id: v.id,
                        sku: v.sku,
                        price: v.price,
                        product: ExportProduct {
                            id: v.product.id,
                            title: v.product.title,
                            handle: v.product.handle,
                        },
                    }),
                }
            })
            .collect();

        let date = node.processed_at.unwrap_or_default();

        Self {
            order_id: node.name,
            remote_id: node.id,
            date: date.clone(),
            order_total: total - total_refunded,
            order_currency: node.currency_code,
            billing_email: node.email.unwrap_or_default(),
            billing_phone,
            shipping_first_name: shipping.first_name.unwrap_or_default(),
            shipping_last_name: shipping.last_name.unwrap_or_default(),
            shipping_address_1: shipping.address1.unwrap_or_default(),
            shipping_address_2: shipping.address2.unwrap_or_default(),
            shipping_postcode: shipping.zip.unwrap_or_default(),
            shipping_city: shipping.city.unwrap_or_default(),
            shipping_state: shipping.province.unwrap_or_default(),
            shipping_company: shipping.company.unwrap_or_default(),
            shipping_country: shipping.country.unwrap_or_default(),
            payment_method: node
                .payment_gateway_names
                .first()
                .cloned()
                .unwrap_or_default(),
            date_created: date,
            line_items,
        }
    }
}

/// Keep status filters to plain `a-z_` tokens; they are spliced into the
/// Shopify search query string.
fn sanitize_status_filter(value: &str) -> &str {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        value
    } else {
        "any"
    }
}

impl AdminClient {
    /// Fetch orders from the export window, filtered by financial and
    /// fulfillment status (`"any"` disables a filter).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns an error
    /// response.
    #[instrument(skip(self))]
    pub async fn get_recent_orders(
        &self,
        financial_status: &str,
        status: &str,
    ) -> Result<Vec<OrderNode>, ShopifyError> {
        let created_at_min = (Utc::now() - Duration::days(EXPORT_WINDOW_DAYS))
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string();

        let search = format!(
            "created_at:>={created_at_min} status:{} financial_status:{}",
            sanitize_status_filter(status),
            sanitize_status_filter(financial_status),
        );

        let variables = serde_json::json!({
            "first": EXPORT_ORDER_LIMIT,
            "lineItems": EXPORT_LINE_ITEM_LIMIT,
            "query": search,
        });

        let data: OrdersData = self.execute(ORDERS_QUERY, Some(variables)).await?;

        Ok(data.orders.edges.into_iter().map(|e| e.node).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn order_fixture() -> OrderNode {
        serde_json::from_value(serde_json::json!({
            "id": "gid://shopify/Order/1234",
            "name": "#1001",
            "processedAt": "2024-11-02T10:15:00Z",
            "totalPrice": "59.90",
            "email": "buyer@example.com",
            "currencyCode": "EUR",
            "paymentGatewayNames": ["bogus", "manual"],
            "subtotalLineItemsQuantity": 3,
            "lineItems": {
                "edges": [{
                    "node": {
                        "id": "gid://shopify/LineItem/1",
                        "quantity": 2,
                        "name": "Blue T-Shirt - M",
                        "originalUnitPrice": "19.95",
                        "discountedUnitPrice": "17.95",
                        "variant": {
                            "id": "gid://shopify/ProductVariant/11",
                            "sku": "TSHIRT-BLU-M",
                            "price": "19.95",
                            "product": {
                                "id": "gid://shopify/Product/7",
                                "title": "Blue T-Shirt",
                                "handle": "blue-t-shirt"
                            }
                        }
                    }
                }]
            },
            "billingAddress": null,
            "shippingAddress": {
                "firstName": "Ana",
                "lastName": "García",
                "address1": "Calle Mayor 1",
                "address2": null,
                "zip": "28013",
                "city": "Madrid",
                "province": "Madrid",
                "company": null,
                "country": "Spain",
                "phone": "+34 600 000 000"
            },
            "refunds": [
                { "totalRefundedSet": { "shopMoney": { "amount": "9.90" } } }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_export_order_subtracts_refunds() {
        let export = ExportOrder::from(order_fixture());
        assert!((export.order_total - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_export_order_flat_fields() {
        let export = ExportOrder::from(order_fixture());

        assert_eq!(export.order_id, "#1001");
        assert_eq!(export.remote_id, "gid://shopify/Order/1234");
        assert_eq!(export.order_currency, "EUR");
        assert_eq!(export.billing_email, "buyer@example.com");
        assert_eq!(export.payment_method, "bogus");
        assert_eq!(export.date, "2024-11-02T10:15:00Z");
        assert_eq!(export.date_created, export.date);
        assert_eq!(export.shipping_first_name, "Ana");
        assert_eq!(export.shipping_postcode, "28013");
        assert_eq!(export.shipping_state, "Madrid");
        // Missing values flatten to empty strings, not nulls.
        assert_eq!(export.shipping_address_2, "");
        assert_eq!(export.shipping_company, "");
    }

    #[test]
    fn test_export_order_billing_phone_falls_back_to_shipping() {
        let export = ExportOrder::from(order_fixture());
        assert_eq!(export.billing_phone, "+34 600 000 000");
    }

    #[test]
    fn test_export_order_line_items() {
        let export = ExportOrder::from(order_fixture());
        assert_eq!(export.line_items.len(), 1);

        let item = &export.line_items[0];
        assert_eq!(item.quantity, 2);
        assert_eq!(item.price.original, "19.95");
        assert_eq!(item.price.discounted, "17.95");

        let variant = item.variant.as_ref().unwrap();
        assert_eq!(variant.sku.as_deref(), Some("TSHIRT-BLU-M"));
        assert_eq!(variant.product.handle, "blue-t-shirt");
    }

    #[test]
    fn test_export_order_serializes_remote_id_as_id_ws() {
        let export = ExportOrder::from(order_fixture());
        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["idWS"], "gid://shopify/Order/1234");
        assert!(json.get("remote_id").is_none());
    }

    #[test]
    fn test_export_order_without_addresses() {
        let mut node = order_fixture();
        node.shipping_address = None;
        node.billing_address = None;

        let export = ExportOrder::from(node);
        assert_eq!(export.billing_phone, "");
        assert_eq!(export.shipping_first_name, "");
        assert_eq!(export.shipping_country, "");
    }

    #[test]
    fn test_sanitize_status_filter() {
        assert_eq!(sanitize_status_filter("paid"), "paid");
        assert_eq!(sanitize_status_filter("partially_paid"), "partially_paid");
        assert_eq!(sanitize_status_filter("any"), "any");
        // Anything that could break out of the search string falls back.
        assert_eq!(sanitize_status_filter("paid OR id:1"), "any");
        assert_eq!(sanitize_status_filter(""), "any");
        assert_eq!(sanitize_status_filter("PAID"), "any");
    }
}
