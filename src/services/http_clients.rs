//! reqwest-backed implementations of the collaborator contracts.
//!
//! One shared connection pool, one base URL per collaborator. Auth headers
//! are injected upstream by the API gateway; these clients only speak the
//! documented request/response shapes.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::instrument;

use crate::config::AppConfig;
use crate::errors::CheckoutError;
use crate::models::coupon::{CouponRequest, CouponVerdict};
use crate::models::{
    Address, Cart, City, OrderDraft, PaymentInit, PickupCenter, ShippingQuote,
};

use super::clients::{
    AddressClient, CartClient, CouponClient, OrderClient, PaymentClient, QuoteRequest,
    ShippingClient, WalletClient,
};

/// All seven collaborators behind one HTTP client.
#[derive(Clone)]
pub struct HttpCollaborators {
    http: reqwest::Client,
    address_url: String,
    cart_url: String,
    shipping_url: String,
    coupon_url: String,
    order_url: String,
    payment_url: String,
    wallet_url: String,
}

impl HttpCollaborators {
    pub fn from_config(cfg: &AppConfig) -> Result<Self, CheckoutError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .build()
            .map_err(|e| CheckoutError::ExternalService(format!("http client: {}", e)))?;

        Ok(Self {
            http,
            address_url: cfg.address_service_url.clone(),
            cart_url: cfg.cart_service_url.clone(),
            shipping_url: cfg.shipping_service_url.clone(),
            coupon_url: cfg.coupon_service_url.clone(),
            order_url: cfg.order_service_url.clone(),
            payment_url: cfg.payment_service_url.clone(),
            wallet_url: cfg.wallet_service_url.clone(),
        })
    }

    async fn get_json(&self, url: String) -> Result<Value, CheckoutError> {
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| CheckoutError::ExternalService(format!("GET {}: {}", url, e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(CheckoutError::ExternalService(format!(
                "GET {} returned {}",
                url, status
            )));
        }
        response
            .json()
            .await
            .map_err(|e| CheckoutError::ExternalService(format!("GET {}: {}", url, e)))
    }

    async fn post_json<B: serde::Serialize + ?Sized>(
        &self,
        url: String,
        body: &B,
    ) -> Result<Value, CheckoutError> {
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| CheckoutError::ExternalService(format!("POST {}: {}", url, e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(CheckoutError::ExternalService(format!(
                "POST {} returned {}",
                url, status
            )));
        }
        response
            .json()
            .await
            .map_err(|e| CheckoutError::ExternalService(format!("POST {}: {}", url, e)))
    }
}

/// Unwraps the `{"data": ...}` envelope some collaborators use.
fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut obj) if obj.contains_key("data") => {
            obj.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value, what: &str) -> Result<T, CheckoutError> {
    serde_json::from_value(unwrap_data(value))
        .map_err(|e| CheckoutError::ExternalService(format!("{} response: {}", what, e)))
}

#[async_trait]
impl AddressClient for HttpCollaborators {
    #[instrument(skip(self))]
    async fn fetch_addresses(&self, customer_id: &str) -> Result<Vec<Address>, CheckoutError> {
        let url = format!("{}/users/{}/addresses", self.address_url, customer_id);
        decode(self.get_json(url).await?, "addresses")
    }
}

#[async_trait]
impl CartClient for HttpCollaborators {
    #[instrument(skip(self))]
    async fn fetch_cart(&self, customer_id: &str) -> Result<Cart, CheckoutError> {
        let url = format!("{}/carts/{}", self.cart_url, customer_id);
        decode(self.get_json(url).await?, "cart")
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self, customer_id: &str) -> Result<(), CheckoutError> {
        let url = format!("{}/carts/{}/items", self.cart_url, customer_id);
        let response = self
            .http
            .delete(&url)
            .send()
            .await
            .map_err(|e| CheckoutError::ExternalService(format!("DELETE {}: {}", url, e)))?;
        if !response.status().is_success() {
            return Err(CheckoutError::ExternalService(format!(
                "DELETE {} returned {}",
                url,
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ShippingClient for HttpCollaborators {
    #[instrument(skip(self))]
    async fn pickup_centers(&self, city: City) -> Result<Vec<PickupCenter>, CheckoutError> {
        let url = format!("{}/pickup-centers?city={}", self.shipping_url, city.as_str());
        decode(self.get_json(url).await?, "pickup centers")
    }

    #[instrument(skip(self, request))]
    async fn quote(&self, request: &QuoteRequest) -> Result<ShippingQuote, CheckoutError> {
        let url = format!("{}/quotes", self.shipping_url);
        decode(self.post_json(url, request).await?, "shipping quote")
    }
}

#[async_trait]
impl CouponClient for HttpCollaborators {
    #[instrument(skip(self, request), fields(code = %request.coupon_code))]
    async fn apply(&self, request: &CouponRequest) -> Result<CouponVerdict, CheckoutError> {
        let url = format!("{}/coupons/apply", self.coupon_url);
        decode(self.post_json(url, request).await?, "coupon")
    }
}

#[async_trait]
impl OrderClient for HttpCollaborators {
    #[instrument(skip(self, draft))]
    async fn create(&self, draft: &OrderDraft) -> Result<Value, CheckoutError> {
        let url = format!("{}/orders", self.order_url);
        self.post_json(url, draft).await
    }
}

#[async_trait]
impl PaymentClient for HttpCollaborators {
    #[instrument(skip(self, init), fields(order_id = %init.order_id))]
    async fn initialize(&self, init: &PaymentInit) -> Result<Value, CheckoutError> {
        let url = format!("{}/payments/initialize", self.payment_url);
        self.post_json(url, init).await
    }
}

#[async_trait]
impl WalletClient for HttpCollaborators {
    #[instrument(skip(self))]
    async fn balance(&self, customer_id: &str) -> Result<Decimal, CheckoutError> {
        let url = format!("{}/wallets/{}/balance", self.wallet_url, customer_id);
        let value = unwrap_data(self.get_json(url).await?);
        match &value {
            Value::Object(obj) => obj
                .get("balance")
                .and_then(|raw| match raw {
                    Value::String(s) => s.parse().ok(),
                    Value::Number(n) => n.to_string().parse().ok(),
                    _ => None,
                })
                .ok_or_else(|| {
                    CheckoutError::ExternalService("wallet response missing balance".into())
                }),
            Value::String(s) => s
                .parse()
                .map_err(|_| CheckoutError::ExternalService("wallet balance not numeric".into())),
            Value::Number(n) => n
                .to_string()
                .parse()
                .map_err(|_| CheckoutError::ExternalService("wallet balance not numeric".into())),
            _ => Err(CheckoutError::ExternalService(
                "wallet response missing balance".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwrap_data_peels_single_envelope() {
        let wrapped = json!({"data": [1, 2, 3]});
        assert_eq!(unwrap_data(wrapped), json!([1, 2, 3]));

        let bare = json!([4, 5]);
        assert_eq!(unwrap_data(bare), json!([4, 5]));
    }

    #[test]
    fn decode_reads_addresses_from_envelope() {
        let value = json!({"data": [{
            "id": "addr_1",
            "fullName": "Ama Mensah",
            "streetAddress": "12 Oxford St",
            "area": "Osu",
            "city": "Accra",
            "region": "Greater Accra",
            "contactPhone": "0241234567"
        }]});
        let addresses: Vec<Address> = decode(value, "addresses").unwrap();
        assert_eq!(addresses.len(), 1);
        assert_eq!(addresses[0].id, "addr_1");
    }
}
