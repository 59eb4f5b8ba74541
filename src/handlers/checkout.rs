use crate::handlers::common::{
    created_response, no_content_response, success_response, validate_input,
};
use crate::{
    errors::ApiError,
    models::{AddressMode, DeliveryMethod, DeliverySpeed, PaymentMethod},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for checkout endpoints
pub fn checkout_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(start_checkout))
        .route("/:session_id", get(get_session).delete(close_session))
        .route("/:session_id/address", put(set_address))
        .route("/:session_id/pickup-centers", get(pickup_centers))
        .route("/:session_id/delivery", put(set_delivery))
        .route(
            "/:session_id/coupon",
            post(apply_coupon).delete(remove_coupon),
        )
        .route("/:session_id/payment-method", put(set_payment_method))
        .route("/:session_id/submit", post(submit_order))
}

/// Start a checkout session from the buyer's cart
async fn start_checkout(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<StartCheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let view = state
        .checkout
        .start_checkout(payload.customer_id, payload.email)
        .await?;

    Ok(created_response(view))
}

/// Get the current session view
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.checkout.view(session_id).await?;
    Ok(success_response(view))
}

/// Select an existing address or submit new-address fields
async fn set_address(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<AddressMode>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.checkout.set_address(session_id, payload).await?;
    Ok(success_response(view))
}

/// Pickup centers scoped to the session's buyer city
async fn pickup_centers(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let centers = state.checkout.pickup_centers(session_id).await?;
    Ok(success_response(centers))
}

/// Change delivery method, speed, or pickup center
async fn set_delivery(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<DeliveryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state
        .checkout
        .set_delivery(
            session_id,
            payload.method,
            payload.pickup_center_id,
            payload.delivery_speed,
        )
        .await?;
    Ok(success_response(view))
}

/// Apply a coupon code
async fn apply_coupon(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<CouponRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let view = state.checkout.apply_coupon(session_id, &payload.code).await?;
    Ok(success_response(view))
}

/// Remove the applied coupon
async fn remove_coupon(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.checkout.remove_coupon(session_id).await?;
    Ok(success_response(view))
}

/// Select the payment method
async fn set_payment_method(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<PaymentMethodRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state
        .checkout
        .set_payment_method(session_id, payload.method)
        .await?;
    Ok(success_response(view))
}

/// Submit the order
async fn submit_order(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.checkout.submit_order(session_id).await?;
    Ok(success_response(outcome))
}

/// Tear the session down (buyer navigated away)
async fn close_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.checkout.close_session(session_id).await?;
    Ok(no_content_response())
}

// Request DTOs

#[derive(Debug, Deserialize, Validate)]
pub struct StartCheckoutRequest {
    #[validate(length(min = 1))]
    pub customer_id: String,
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRequest {
    pub method: DeliveryMethod,
    #[serde(default)]
    pub pickup_center_id: Option<String>,
    #[serde(default)]
    pub delivery_speed: Option<DeliverySpeed>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CouponRequestBody {
    #[validate(length(min = 1))]
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct PaymentMethodRequest {
    pub method: PaymentMethod,
}
