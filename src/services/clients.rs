//! Contracts for the services the checkout flow collaborates with.
//!
//! Transport, retries, and auth belong to the implementations; the
//! orchestration core only defines what happens on eventual success or
//! failure. Where a response shape is not guaranteed (order creation,
//! payment initialization) the contract hands back raw JSON and the caller
//! extracts defensively.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::errors::CheckoutError;
use crate::models::coupon::{CouponRequest, CouponVerdict};
use crate::models::{
    Address, Cart, City, DeliveryMethod, DeliverySpeed, OrderDraft, PaymentInit, PickupCenter,
    ShippableItem, ShippingQuote,
};

/// Parameters of a shipping fee quote.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub buyer_city: City,
    pub items: Vec<ShippableItem>,
    pub method: DeliveryMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_center_id: Option<String>,
    pub delivery_speed: DeliverySpeed,
}

#[async_trait]
pub trait AddressClient: Send + Sync {
    async fn fetch_addresses(&self, customer_id: &str) -> Result<Vec<Address>, CheckoutError>;
}

#[async_trait]
pub trait CartClient: Send + Sync {
    async fn fetch_cart(&self, customer_id: &str) -> Result<Cart, CheckoutError>;
    async fn clear_cart(&self, customer_id: &str) -> Result<(), CheckoutError>;
}

#[async_trait]
pub trait ShippingClient: Send + Sync {
    async fn pickup_centers(&self, city: City) -> Result<Vec<PickupCenter>, CheckoutError>;
    async fn quote(&self, request: &QuoteRequest) -> Result<ShippingQuote, CheckoutError>;
}

#[async_trait]
pub trait CouponClient: Send + Sync {
    async fn apply(&self, request: &CouponRequest) -> Result<CouponVerdict, CheckoutError>;
}

#[async_trait]
pub trait OrderClient: Send + Sync {
    /// Creates the order. The response shape is owned by the order service
    /// and has drifted before; callers must extract, not deserialize.
    async fn create(&self, draft: &OrderDraft) -> Result<Value, CheckoutError>;
}

#[async_trait]
pub trait PaymentClient: Send + Sync {
    /// Initializes a provider-hosted payment session.
    async fn initialize(&self, init: &PaymentInit) -> Result<Value, CheckoutError>;
}

#[async_trait]
pub trait WalletClient: Send + Sync {
    async fn balance(&self, customer_id: &str) -> Result<Decimal, CheckoutError>;
}
