//! Checkout API Library
//!
//! This crate provides the checkout orchestration core for the storefront:
//! address resolution, delivery planning, coupon application, pricing, and
//! the order submission state machine, exposed over HTTP.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod models;
pub mod services;

use std::sync::Arc;

pub use handlers::api_v1_routes;
use services::CheckoutService;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub checkout: Arc<CheckoutService>,
}
