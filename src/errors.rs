use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field-level validation error kinds.
///
/// The checkout UI highlights individual fields, so validation never
/// collapses to a single string: each failing field maps to one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    Required,
    Invalid,
    InvalidPhone,
    UnsupportedCity,
    InvalidDigitalAddress,
}

impl FieldErrorKind {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Required => "This field is required",
            Self::Invalid => "Value is not valid",
            Self::InvalidPhone => "Enter a valid 10-digit Ghanaian phone number",
            Self::UnsupportedCity => "Delivery is only available in Accra and Tema",
            Self::InvalidDigitalAddress => "Digital address must look like GA-123-4567",
        }
    }
}

/// A map from field name to error kind, ordered for stable rendering.
pub type FieldErrors = BTreeMap<String, FieldErrorKind>;

/// How an error should be surfaced to the buyer.
///
/// Mirrors the four-way split the checkout flow cares about: inline field
/// errors, dismissible banners, and two flavours of blocking alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    /// User-correctable; rendered inline, blocks submission only.
    Validation,
    /// Degrades to a safe default; rendered as a dismissible banner.
    Transient,
    /// Authorization/security failure; abort the flow, never retry.
    SecurityFatal,
    /// Data-integrity failure; abort with a message that does not claim
    /// the order failed when it may have been created server-side.
    IntegrityFatal,
}

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("No delivery address selected")]
    NoAddressSelected,

    #[error("City is not serviceable: {0}")]
    UnsupportedCity(String),

    #[error("Choose a pickup center to continue")]
    PickupCenterRequired,

    #[error("Shipping fee could not be determined for dispatch delivery")]
    ShippingUnresolved,

    #[error("Coupon code is empty or malformed")]
    InvalidCouponFormat,

    #[error("Coupon rejected: {0}")]
    CouponRejected(String),

    #[error("A coupon application is already in progress")]
    CouponPending,

    #[error("Wallet balance is insufficient for this order")]
    InsufficientBalance,

    #[error("Missing field for payment initialization: {0}")]
    MissingPaymentField(&'static str),

    #[error("Refusing to open untrusted payment redirect: {0}")]
    UntrustedRedirect(String),

    #[error("Created order does not belong to the current user")]
    OrderUserMismatch,

    #[error("Could not identify the created order in the service response")]
    OrderExtractionFailed,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Checkout session not found: {0}")]
    SessionNotFound(String),

    #[error("Order submission already in progress")]
    SubmissionInFlight,

    #[error("Checkout session has been closed")]
    SessionClosed,

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl CheckoutError {
    /// Single field validation failure.
    pub fn field(name: impl Into<String>, kind: FieldErrorKind) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(name.into(), kind);
        CheckoutError::Validation(errors)
    }

    /// Classifies the error per the checkout surfacing policy.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Validation(_)
            | Self::NoAddressSelected
            | Self::UnsupportedCity(_)
            | Self::PickupCenterRequired
            | Self::ShippingUnresolved
            | Self::InvalidCouponFormat
            | Self::CouponRejected(_)
            | Self::InsufficientBalance
            | Self::EmptyCart => ErrorSeverity::Validation,
            Self::CouponPending
            | Self::SubmissionInFlight
            | Self::SessionClosed
            | Self::SessionNotFound(_)
            | Self::ExternalService(_) => ErrorSeverity::Transient,
            Self::UntrustedRedirect(_) | Self::OrderUserMismatch => ErrorSeverity::SecurityFatal,
            Self::MissingPaymentField(_) | Self::OrderExtractionFailed | Self::Other(_) => {
                ErrorSeverity::IntegrityFatal
            }
        }
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::NoAddressSelected
            | Self::UnsupportedCity(_)
            | Self::PickupCenterRequired
            | Self::ShippingUnresolved
            | Self::InvalidCouponFormat
            | Self::EmptyCart => StatusCode::BAD_REQUEST,
            Self::CouponRejected(_) | Self::InsufficientBalance => StatusCode::UNPROCESSABLE_ENTITY,
            Self::CouponPending | Self::SubmissionInFlight => StatusCode::CONFLICT,
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::SessionClosed => StatusCode::GONE,
            Self::UntrustedRedirect(_) | Self::OrderUserMismatch => StatusCode::FORBIDDEN,
            Self::MissingPaymentField(_) | Self::OrderExtractionFailed => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::ExternalService(_) => StatusCode::BAD_GATEWAY,
            Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking details.
    pub fn response_message(&self) -> String {
        match self {
            Self::Other(_) => "Internal server error".to_string(),
            Self::ExternalService(_) => "An upstream service is unavailable".to_string(),
            // The order may already exist server-side; never claim it failed.
            Self::MissingPaymentField(_) => {
                "Your order was received but payment could not be started. Check your orders before retrying.".to_string()
            }
            Self::OrderExtractionFailed => {
                "Your order was received but could not be confirmed. Check your orders before retrying.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Wire shape for checkout error responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g. "Bad Request", "Forbidden")
    pub error: String,
    /// Human-readable description
    pub message: String,
    /// How the client should surface it
    pub severity: ErrorSeverity,
    /// Per-field validation errors, when applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, String>>,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

impl IntoResponse for CheckoutError {
    fn into_response(self) -> Response {
        err_response(&self)
    }
}

/// API Error type for handler-level failures.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Checkout(err) => return err_response(err),
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
            severity: ErrorSeverity::Validation,
            fields: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        (status, Json(err)).into_response()
    }
}

fn err_response(err: &CheckoutError) -> Response {
    let status = err.status_code();
    let fields = match err {
        CheckoutError::Validation(errors) => Some(
            errors
                .iter()
                .map(|(field, kind)| (field.clone(), kind.message().to_string()))
                .collect(),
        ),
        _ => None,
    };
    let body = ErrorResponse {
        error: status.canonical_reason().unwrap_or("Error").to_string(),
        message: err.response_message(),
        severity: err.severity(),
        fields,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    (status, Json(body)).into_response()
}
