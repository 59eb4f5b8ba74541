//! Shared test harness: the full HTTP app wired to in-memory collaborators.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{body::Body, http::Method, response::Response, Router};
use http::Request;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;

use checkout_api::config::AppConfig;
use checkout_api::errors::CheckoutError;
use checkout_api::events::EventSender;
use checkout_api::models::coupon::{CouponRequest, CouponVerdict};
use checkout_api::models::{
    Address, Cart, CartLine, City, OrderDraft, PaymentInit, PickupCenter, SellerRef,
    ShippingQuote,
};
use checkout_api::services::clients::{
    AddressClient, CartClient, CouponClient, OrderClient, PaymentClient, QuoteRequest,
    ShippingClient, WalletClient,
};
use checkout_api::services::{CheckoutService, Collaborators};
use checkout_api::AppState;

pub struct FakeBackend {
    pub addresses: Mutex<Vec<Address>>,
    pub cart: Mutex<Cart>,
    pub balance: Mutex<Decimal>,
    pub quote: Mutex<Result<ShippingQuote, String>>,
    pub centers: Mutex<Vec<PickupCenter>>,
    pub coupon_response: Mutex<Value>,
    pub order_response: Mutex<Value>,
    pub payment_response: Mutex<Value>,
    pub cart_cleared: AtomicBool,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            addresses: Mutex::new(vec![Address {
                id: "addr_1".into(),
                full_name: "Ama Mensah".into(),
                street_address: "12 Oxford St".into(),
                area: "Osu".into(),
                landmark: None,
                city: "Accra".into(),
                region: "Greater Accra".into(),
                contact_phone: "0241234567".into(),
                digital_address: None,
                is_default: true,
            }]),
            cart: Mutex::new(Cart {
                lines: vec![CartLine {
                    product_id: Some("p1".into()),
                    seller: Some(SellerRef::Id("s1".into())),
                    quantity: 2,
                    variant_id: None,
                    unit_price: dec!(100.00),
                    category_id: Some("cat_1".into()),
                    sub_category_id: None,
                }],
                subtotal: dec!(200.00),
            }),
            balance: Mutex::new(dec!(500.00)),
            quote: Mutex::new(Ok(ShippingQuote {
                total_shipping_fee: dec!(15.00),
                delivery_estimate: Some("2-3 days".into()),
            })),
            centers: Mutex::new(vec![PickupCenter {
                id: "pc_1".into(),
                name: "Osu Hub".into(),
                city: "ACCRA".into(),
                address: Some("12 Oxford St".into()),
            }]),
            coupon_response: Mutex::new(json!({
                "valid": true,
                "discountAmount": "20",
                "discountType": "percentage",
                "discountValue": "10",
                "couponId": "c_1",
                "batchId": "b_1"
            })),
            order_response: Mutex::new(json!({
                "order": {
                    "id": "ord_1",
                    "orderNumber": "A-100",
                    "totalAmount": "195.00",
                    "user": {"id": "u_1"},
                    "email": "ama@example.com"
                }
            })),
            payment_response: Mutex::new(json!({
                "data": {"authorization_url": "https://checkout.paystack.com/abc"}
            })),
            cart_cleared: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl AddressClient for FakeBackend {
    async fn fetch_addresses(&self, _customer_id: &str) -> Result<Vec<Address>, CheckoutError> {
        Ok(self.addresses.lock().unwrap().clone())
    }
}

#[async_trait]
impl CartClient for FakeBackend {
    async fn fetch_cart(&self, _customer_id: &str) -> Result<Cart, CheckoutError> {
        Ok(self.cart.lock().unwrap().clone())
    }

    async fn clear_cart(&self, _customer_id: &str) -> Result<(), CheckoutError> {
        self.cart_cleared
            .store(true, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ShippingClient for FakeBackend {
    async fn pickup_centers(&self, _city: City) -> Result<Vec<PickupCenter>, CheckoutError> {
        Ok(self.centers.lock().unwrap().clone())
    }

    async fn quote(&self, _request: &QuoteRequest) -> Result<ShippingQuote, CheckoutError> {
        self.quote
            .lock()
            .unwrap()
            .clone()
            .map_err(CheckoutError::ExternalService)
    }
}

#[async_trait]
impl CouponClient for FakeBackend {
    async fn apply(&self, _request: &CouponRequest) -> Result<CouponVerdict, CheckoutError> {
        let value = self.coupon_response.lock().unwrap().clone();
        serde_json::from_value(value).map_err(|e| CheckoutError::ExternalService(e.to_string()))
    }
}

#[async_trait]
impl OrderClient for FakeBackend {
    async fn create(&self, _draft: &OrderDraft) -> Result<Value, CheckoutError> {
        Ok(self.order_response.lock().unwrap().clone())
    }
}

#[async_trait]
impl PaymentClient for FakeBackend {
    async fn initialize(&self, _init: &PaymentInit) -> Result<Value, CheckoutError> {
        Ok(self.payment_response.lock().unwrap().clone())
    }
}

#[async_trait]
impl WalletClient for FakeBackend {
    async fn balance(&self, _customer_id: &str) -> Result<Decimal, CheckoutError> {
        Ok(*self.balance.lock().unwrap())
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".into(),
        port: 0,
        environment: "development".into(),
        log_level: "debug".into(),
        log_json: false,
        address_service_url: "http://addresses.test".into(),
        cart_service_url: "http://carts.test".into(),
        shipping_service_url: "http://shipping.test".into(),
        coupon_service_url: "http://coupons.test".into(),
        order_service_url: "http://orders.test".into(),
        payment_service_url: "http://payments.test".into(),
        wallet_service_url: "http://wallets.test".into(),
        payment_provider_domain: "paystack.com".into(),
        http_timeout_secs: 2,
        event_channel_capacity: 64,
        cors_allowed_origins: None,
        cors_allow_any_origin: false,
    }
}

pub struct TestApp {
    pub router: Router,
    pub backend: Arc<FakeBackend>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_backend(Arc::new(FakeBackend::new()))
    }

    pub fn with_backend(backend: Arc<FakeBackend>) -> Self {
        let (tx, mut rx) = mpsc::channel(64);
        tokio::spawn(async move { while rx.recv().await.is_some() {} });
        let event_sender = EventSender::new(tx);

        let collaborators = Collaborators {
            address: backend.clone(),
            cart: backend.clone(),
            shipping: backend.clone(),
            coupon: backend.clone(),
            order: backend.clone(),
            payment: backend.clone(),
            wallet: backend.clone(),
        };
        let checkout = Arc::new(CheckoutService::new(
            collaborators,
            event_sender.clone(),
            "paystack.com",
        ));
        let state = Arc::new(AppState {
            config: test_config(),
            event_sender,
            checkout,
        });

        let router = Router::new()
            .nest("/api/v1", checkout_api::api_v1_routes())
            .with_state(state);

        Self { router, backend }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };
        self.router.clone().oneshot(request).await.expect("response")
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
