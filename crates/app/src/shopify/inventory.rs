//! Inventory item lookups used by the webhook relay.

use serde::Deserialize;
use tracing::instrument;

use super::{ShopifyError, client::AdminClient};

const INVENTORY_ITEM_QUERY: &str = r"
    query GetInventoryItem($id: ID!) {
        inventoryItem(id: $id) {
            id
            sku
            tracked
            variant {
                id
                title
                price
                inventoryQuantity
                product {
                    id
                    title
                    status
                    vendor
                }
            }
        }
    }
";

/// Inventory item detail fetched to enrich webhook payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryItemDetail {
    pub id: String,
    pub sku: Option<String>,
    pub tracked: Option<bool>,
    pub variant: Option<VariantDetail>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantDetail {
    pub id: String,
    pub title: Option<String>,
    pub price: Option<String>,
    pub inventory_quantity: Option<i64>,
    pub product: Option<ProductDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductDetail {
    pub id: String,
    pub title: Option<String>,
    pub status: Option<String>,
    pub vendor: Option<String>,
}

impl InventoryItemDetail {
    /// Product title, when the variant/product chain is present.
    #[must_use]
    pub fn product_title(&self) -> Option<&str> {
        self.variant
            .as_ref()?
            .product
            .as_ref()?
            .title
            .as_deref()
    }

    /// Variant title, when present.
    #[must_use]
    pub fn variant_title(&self) -> Option<&str> {
        self.variant.as_ref()?.title.as_deref()
    }

    /// Variant price, when present.
    #[must_use]
    pub fn price(&self) -> Option<&str> {
        self.variant.as_ref()?.price.as_deref()
    }

    /// Product vendor, when present.
    #[must_use]
    pub fn vendor(&self) -> Option<&str> {
        self.variant
            .as_ref()?
            .product
            .as_ref()?
            .vendor
            .as_deref()
    }

    /// Product status, when present.
    #[must_use]
    pub fn product_status(&self) -> Option<&str> {
        self.variant
            .as_ref()?
            .product
            .as_ref()?
            .status
            .as_deref()
    }
}

impl AdminClient {
    /// Get an inventory item with its variant/product detail.
    ///
    /// # Arguments
    ///
    /// * `id` - Inventory item gid (e.g. `gid://shopify/InventoryItem/123`)
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns an error
    /// response. A missing item is `Ok(None)`.
    #[instrument(skip(self), fields(inventory_item_id = %id))]
    pub async fn get_inventory_item(
        &self,
        id: &str,
    ) -> Result<Option<InventoryItemDetail>, ShopifyError> {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            inventory_item: Option<InventoryItemDetail>,
        }

        let variables = serde_json::json!({ "id": id });
        let data: Data = self.execute(INVENTORY_ITEM_QUERY, Some(variables)).await?;

        Ok(data.inventory_item)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn detail_fixture() -> InventoryItemDetail {
        serde_json::from_value(serde_json::json!({
            "id": "gid://shopify/InventoryItem/555",
            "sku": "TSHIRT-BLU-M",
            "tracked": true,
            "variant": {
                "id": "gid://shopify/ProductVariant/11",
                "title": "M",
                "price": "19.95",
                "inventoryQuantity": 8,
                "product": {
                    "id": "gid://shopify/Product/7",
                    "title": "Blue T-Shirt",
                    "status": "ACTIVE",
                    "vendor": "Shipeu Threads"
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_accessors_walk_the_chain() {
        let detail = detail_fixture();
        assert_eq!(detail.sku.as_deref(), Some("TSHIRT-BLU-M"));
        assert_eq!(detail.product_title(), Some("Blue T-Shirt"));
        assert_eq!(detail.variant_title(), Some("M"));
        assert_eq!(detail.price(), Some("19.95"));
        assert_eq!(detail.vendor(), Some("Shipeu Threads"));
        assert_eq!(detail.product_status(), Some("ACTIVE"));
    }

    #[test]
    fn test_accessors_tolerate_missing_variant() {
        let detail: InventoryItemDetail = serde_json::from_value(serde_json::json!({
            "id": "gid://shopify/InventoryItem/555",
            "sku": null,
            "tracked": null,
            "variant": null
        }))
        .unwrap();

        assert!(detail.sku.is_none());
        assert!(detail.product_title().is_none());
        assert!(detail.price().is_none());
        assert!(detail.vendor().is_none());
    }
}
