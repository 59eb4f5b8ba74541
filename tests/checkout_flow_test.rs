//! Integration tests for the checkout flow over the HTTP surface.
//!
//! Tests cover:
//! - Session start with auto-selected default address and initial quote
//! - Address, delivery, coupon, and payment-method operations
//! - Submission to confirmation and to payment redirect
//! - Error surfacing: field maps, blocked states, untrusted redirects

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use serde_json::json;

async fn start_session(app: &TestApp) -> String {
    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(json!({"customer_id": "u_1", "email": "ama@example.com"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    body["sessionId"].as_str().expect("session id").to_string()
}

#[tokio::test]
async fn start_checkout_returns_quoted_session() {
    let app = TestApp::new();
    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(json!({"customer_id": "u_1", "email": "ama@example.com"})),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["state"], "idle");
    assert_eq!(body["addressMode"]["mode"], "existing");
    assert_eq!(body["addressMode"]["addressId"], "addr_1");
    assert_eq!(body["delivery"]["method"], "dispatch");
    assert_eq!(body["delivery"]["shippingFee"], "15.00");
    assert_eq!(body["pricing"]["total"], "215.00");
    // Ghana levies are display-only and never folded into the total.
    assert_eq!(body["taxes"]["nhil"], "5.00");
}

#[tokio::test]
async fn start_with_empty_cart_is_rejected() {
    let app = TestApp::new();
    app.backend.cart.lock().unwrap().lines.clear();

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(json!({"customer_id": "u_1", "email": "ama@example.com"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["severity"], "validation");
}

#[tokio::test]
async fn invalid_new_address_reports_field_errors() {
    let app = TestApp::new();
    let session_id = start_session(&app).await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/checkout/{}/address", session_id),
            Some(json!({
                "mode": "new",
                "draft": {
                    "fullName": "",
                    "streetAddress": "4 Harbour Rd",
                    "area": "Community 1",
                    "city": "Kumasi",
                    "region": "Greater Accra",
                    "contactPhone": "030 123 4567"
                }
            })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["fields"]["fullName"].is_string());
    assert!(body["fields"]["city"].is_string());
    assert!(body["fields"]["contactPhone"].is_string());
}

#[tokio::test]
async fn valid_new_address_is_normalized() {
    let app = TestApp::new();
    let session_id = start_session(&app).await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/checkout/{}/address", session_id),
            Some(json!({
                "mode": "new",
                "draft": {
                    "fullName": "Kofi Boateng",
                    "streetAddress": "4 Harbour Rd",
                    "area": "Community 1",
                    "city": "tema",
                    "region": "Greater Accra",
                    "contactPhone": "020 123 4567",
                    "digitalAddress": "ga1234567"
                }
            })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["addressMode"]["draft"]["contactPhone"], "0201234567");
    assert_eq!(body["addressMode"]["draft"]["digitalAddress"], "GA-123-4567");
}

#[tokio::test]
async fn pickup_centers_are_city_scoped() {
    let app = TestApp::new();
    let session_id = start_session(&app).await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/checkout/{}/pickup-centers", session_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body[0]["id"], "pc_1");
}

#[tokio::test]
async fn pickup_without_center_blocks_submission() {
    let app = TestApp::new();
    let session_id = start_session(&app).await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/checkout/{}/delivery", session_id),
            Some(json!({"method": "pickup_center"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["delivery"]["shippingFee"], "0");

    app.request(
        Method::PUT,
        &format!("/api/v1/checkout/{}/payment-method", session_id),
        Some(json!({"method": "bank"})),
    )
    .await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/checkout/{}/submit", session_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Choosing a center unblocks it at a zero fee.
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/checkout/{}/delivery", session_id),
            Some(json!({"method": "pickup_center", "pickupCenterId": "pc_1"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/checkout/{}/submit", session_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["outcome"], "confirmed");
    assert_eq!(body["confirmation"]["shippingCost"], "0");
}

#[tokio::test]
async fn coupon_apply_and_remove_flow() {
    let app = TestApp::new();
    let session_id = start_session(&app).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/checkout/{}/coupon", session_id),
            Some(json!({"code": "save10"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["pricing"]["discount"], "20");
    assert_eq!(body["pricing"]["total"], "195.00");

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/checkout/{}/coupon", session_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["pricing"]["discount"], "0");
    assert_eq!(body["pricing"]["total"], "215.00");
}

#[tokio::test]
async fn rejected_coupon_surfaces_server_message() {
    let app = TestApp::new();
    *app.backend.coupon_response.lock().unwrap() =
        json!({"valid": false, "message": "Coupon expired"});
    let session_id = start_session(&app).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/checkout/{}/coupon", session_id),
            Some(json!({"code": "OLD"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Coupon expired"));
}

#[tokio::test]
async fn backend_totals_override_local_total() {
    let app = TestApp::new();
    *app.backend.coupon_response.lock().unwrap() = json!({
        "valid": true,
        "discountAmount": "20",
        "discountType": "fixed",
        "discountValue": "20",
        "totals": {"subtotal": "200.00", "discount": "25.00", "totalAmount": "190.00"}
    });
    let session_id = start_session(&app).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/checkout/{}/coupon", session_id),
            Some(json!({"code": "SAVE20"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    // Authoritative backend total, backend-reported discount for display.
    assert_eq!(body["pricing"]["total"], "190.00");
    assert_eq!(body["pricing"]["discount"], "25.00");
}

#[tokio::test]
async fn insufficient_wallet_balance_is_rejected_at_selection() {
    let app = TestApp::new();
    *app.backend.balance.lock().unwrap() = rust_decimal_macros::dec!(50.00);
    let session_id = start_session(&app).await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/checkout/{}/payment-method", session_id),
            Some(json!({"method": "credit_balance"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn mobile_money_submission_redirects_to_provider() {
    let app = TestApp::new();
    let session_id = start_session(&app).await;

    app.request(
        Method::PUT,
        &format!("/api/v1/checkout/{}/payment-method", session_id),
        Some(json!({"method": "mobile_money"})),
    )
    .await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/checkout/{}/submit", session_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["outcome"], "redirecting_to_payment");
    assert_eq!(
        body["redirect"]["authorizationUrl"],
        "https://checkout.paystack.com/abc"
    );
    assert_eq!(body["redirect"]["orderId"], "ord_1");
    assert_eq!(body["redirect"]["email"], "ama@example.com");
}

#[tokio::test]
async fn lookalike_redirect_host_is_refused() {
    let app = TestApp::new();
    *app.backend.payment_response.lock().unwrap() = json!({
        "data": {"authorization_url": "https://paystack.com.evil.net/abc"}
    });
    let session_id = start_session(&app).await;

    app.request(
        Method::PUT,
        &format!("/api/v1/checkout/{}/payment-method", session_id),
        Some(json!({"method": "mobile_money"})),
    )
    .await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/checkout/{}/submit", session_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = response_json(response).await;
    assert_eq!(body["severity"], "security_fatal");
}

#[tokio::test]
async fn bank_submission_confirms_and_clears_cart() {
    let app = TestApp::new();
    let session_id = start_session(&app).await;

    app.request(
        Method::PUT,
        &format!("/api/v1/checkout/{}/payment-method", session_id),
        Some(json!({"method": "bank"})),
    )
    .await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/checkout/{}/submit", session_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["outcome"], "confirmed");
    assert_eq!(body["confirmation"]["orderId"], "ord_1");
    assert_eq!(body["confirmation"]["orderNumber"], "A-100");
    assert_eq!(body["confirmation"]["totalAmount"], "195.00");
    assert_eq!(body["confirmation"]["paymentMethod"], "bank");
    assert!(app
        .backend
        .cart_cleared
        .load(std::sync::atomic::Ordering::SeqCst));
}

#[tokio::test]
async fn closed_session_returns_not_found() {
    let app = TestApp::new();
    let session_id = start_session(&app).await;

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/checkout/{}", session_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/checkout/{}", session_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
