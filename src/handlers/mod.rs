pub mod checkout;
pub mod common;

use crate::AppState;
use axum::Router;
use std::sync::Arc;

/// Full v1 API surface.
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new().nest("/checkout", checkout::checkout_routes())
}
