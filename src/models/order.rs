use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::address::AddressDraft;
use super::payment::PaymentMethod;
use super::shipping::{DeliveryMethod, DeliverySpeed};

/// One order line in the submitted draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDraft {
    pub product_id: String,
    pub seller_id: String,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    pub unit_price: Decimal,
}

/// The materialized order submitted to the order service.
///
/// Built only after every validation passed; treated as immutable once
/// submitted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_fields: Option<AddressDraft>,
    pub payment_method: PaymentMethod,
    pub order_items: Vec<OrderItemDraft>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    pub delivery_method: DeliveryMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_center_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_speed: Option<DeliverySpeed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_fee: Option<Decimal>,
}

/// What we managed to learn about the order the service created.
///
/// The create response's shape is not guaranteed; see
/// [`CreatedOrder::extract`] for the paths tried.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedOrder {
    pub id: String,
    pub order_number: Option<String>,
    pub total_amount: Option<Decimal>,
    pub user_id: Option<String>,
    pub email: Option<String>,
}

impl CreatedOrder {
    /// Tries a fixed, ordered list of nesting paths and takes the first
    /// object carrying an id-like field. Returns None (fail closed) when no
    /// candidate matches, rather than proceeding with an undefined order.
    pub fn extract(response: &Value) -> Option<Self> {
        const PATHS: [&[&str]; 4] = [&["order"], &["data", "order"], &["data"], &[]];

        for path in PATHS {
            let mut node = response;
            let mut ok = true;
            for segment in path {
                match node.get(segment) {
                    Some(next) => node = next,
                    None => {
                        ok = false;
                        break;
                    }
                }
            }
            if !ok {
                continue;
            }
            if let Some(order) = Self::from_object(node) {
                return Some(order);
            }
        }
        None
    }

    fn from_object(node: &Value) -> Option<Self> {
        let obj = node.as_object()?;
        let id = ["id", "orderId", "_id"]
            .iter()
            .find_map(|key| id_like(obj.get(*key)?))?;

        let user_id = obj.get("user").and_then(|user| match user {
            Value::Object(user) => user.get("id").and_then(id_like),
            other => id_like(other),
        });

        Some(Self {
            id,
            order_number: obj
                .get("orderNumber")
                .or_else(|| obj.get("order_number"))
                .and_then(id_like),
            total_amount: obj
                .get("totalAmount")
                .or_else(|| obj.get("total_amount"))
                .and_then(decimal_like),
            user_id,
            email: obj
                .get("email")
                .or_else(|| obj.get("userEmail"))
                .and_then(|v| v.as_str().map(String::from)),
        })
    }
}

fn id_like(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn decimal_like(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
}

/// Payload for the payment-redirect destination.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRedirect {
    pub authorization_url: String,
    pub order_id: String,
    pub amount: Decimal,
    pub email: String,
}

/// Payload for the order-confirmation destination.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    pub order_id: String,
    pub order_number: Option<String>,
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub shipping_cost: Decimal,
    pub sub_total: Decimal,
    pub discount: Decimal,
    pub order_date: DateTime<Utc>,
    pub delivery_method: DeliveryMethod,
}
