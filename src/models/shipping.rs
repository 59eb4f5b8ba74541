use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::address::City;
use super::cart::ShippableItem;

/// How the order reaches the buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    /// Buyer collects at a fixed location; fee is always zero.
    PickupCenter,
    /// Rider-based delivery; fee comes from a quote.
    Dispatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliverySpeed {
    Standard,
    SameDay,
}

impl Default for DeliverySpeed {
    fn default() -> Self {
        DeliverySpeed::Standard
    }
}

/// A collection point, scoped to a city.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupCenter {
    pub id: String,
    pub name: String,
    pub city: String,
    #[serde(default)]
    pub address: Option<String>,
}

/// A shipping fee quote from the shipping service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingQuote {
    pub total_shipping_fee: Decimal,
    #[serde(default)]
    pub delivery_estimate: Option<String>,
}

/// The configuration a quote was computed against.
///
/// A quote is only applied if the key it was requested under still equals
/// the key of the current configuration; results for stale keys are dropped
/// on arrival (last-write-wins by configuration, not by completion order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteKey {
    pub city: City,
    pub speed: DeliverySpeed,
    pub items: Vec<ShippableItem>,
}

impl QuoteKey {
    pub fn new(city: City, speed: DeliverySpeed, mut items: Vec<ShippableItem>) -> Self {
        // Key equality must not depend on cart-line ordering.
        items.sort_by(|a, b| {
            (&a.product_id, &a.seller_id, a.quantity).cmp(&(
                &b.product_id,
                &b.seller_id,
                b.quantity,
            ))
        });
        Self { city, speed, items }
    }
}
