use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Seller reference on a cart line.
///
/// The cart service is not consistent about this field: older payloads carry
/// a bare id, newer ones a nested seller object. Both resolve to an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SellerRef {
    Id(String),
    Object {
        id: String,
        #[serde(default)]
        name: Option<String>,
    },
}

impl SellerRef {
    pub fn id(&self) -> &str {
        match self {
            SellerRef::Id(id) => id,
            SellerRef::Object { id, .. } => id,
        }
    }
}

/// One line of the cart, read-only for checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default, alias = "sellerId")]
    pub seller: Option<SellerRef>,
    pub quantity: u32,
    #[serde(default)]
    pub variant_id: Option<String>,
    pub unit_price: Decimal,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub sub_category_id: Option<String>,
}

/// A cart line whose product and seller both resolved; the unit of
/// shipping-fee computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippableItem {
    pub product_id: String,
    pub seller_id: String,
    pub quantity: u32,
}

/// The checkout-facing view of the buyer's cart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    #[serde(default)]
    pub lines: Vec<CartLine>,
    #[serde(default)]
    pub subtotal: Decimal,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines with a resolvable product and seller identity.
    ///
    /// Lines failing extraction are dropped, not fatal: they simply do not
    /// contribute to shipping weight.
    pub fn shippable_items(&self) -> Vec<ShippableItem> {
        self.lines
            .iter()
            .filter_map(|line| {
                let product_id = line.product_id.as_ref()?.clone();
                let seller_id = line.seller.as_ref()?.id().to_string();
                Some(ShippableItem {
                    product_id,
                    seller_id,
                    quantity: line.quantity,
                })
            })
            .collect()
    }

    /// Product ids for coupon eligibility checks (adjacent duplicates
    /// collapse; the coupon service deduplicates fully).
    pub fn product_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .lines
            .iter()
            .filter_map(|line| line.product_id.clone())
            .collect();
        ids.dedup();
        ids
    }

    /// Parent and sub category of every line, in line order. The coupon
    /// service deduplicates on its side.
    pub fn category_ids(&self) -> Vec<String> {
        self.lines
            .iter()
            .flat_map(|line| {
                line.category_id
                    .iter()
                    .chain(line.sub_category_id.iter())
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Distinct seller ids for coupon eligibility checks.
    pub fn seller_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .lines
            .iter()
            .filter_map(|line| line.seller.as_ref().map(|s| s.id().to_string()))
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}
