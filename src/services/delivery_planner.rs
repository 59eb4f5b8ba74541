//! Delivery method state machine and shipping-fee bookkeeping.
//!
//! Two method states, each independently parameterized. Quote recomputation
//! is keyed by the configuration that produced it: a result arriving for a
//! key that no longer matches the current configuration is discarded, so a
//! change mid-flight wins regardless of completion order.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::errors::CheckoutError;
use crate::models::{
    City, DeliveryMethod, DeliverySpeed, QuoteKey, ShippableItem, ShippingQuote,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPlan {
    pub method: DeliveryMethod,
    pub pickup_center_id: Option<String>,
    pub delivery_speed: DeliverySpeed,
    pub quote: Option<ShippingQuote>,
    pub shipping_fee: Decimal,
    /// Transient quote-fetch warning; never blocks pickup orders.
    pub quote_warning: Option<String>,
}

impl Default for DeliveryPlan {
    fn default() -> Self {
        Self {
            method: DeliveryMethod::Dispatch,
            pickup_center_id: None,
            delivery_speed: DeliverySpeed::Standard,
            quote: None,
            shipping_fee: Decimal::ZERO,
            quote_warning: None,
        }
    }
}

impl DeliveryPlan {
    /// Switches delivery method.
    ///
    /// Entering `pickup_center` clears any previously chosen center (it must
    /// be re-chosen from the city-scoped list); entering `dispatch` resets
    /// the speed to standard. Both directions drop the quote and fee.
    pub fn set_method(&mut self, method: DeliveryMethod) {
        if self.method == method {
            return;
        }
        self.method = method;
        match method {
            DeliveryMethod::PickupCenter => {
                self.pickup_center_id = None;
            }
            DeliveryMethod::Dispatch => {
                self.delivery_speed = DeliverySpeed::Standard;
            }
        }
        self.clear_quote();
    }

    pub fn choose_center(&mut self, center_id: String) {
        self.pickup_center_id = Some(center_id);
        // Pickup is collected, not shipped.
        self.quote = None;
        self.shipping_fee = Decimal::ZERO;
        self.quote_warning = None;
    }

    pub fn set_speed(&mut self, speed: DeliverySpeed) {
        if self.delivery_speed == speed {
            return;
        }
        self.delivery_speed = speed;
        self.clear_quote();
    }

    pub fn clear_quote(&mut self) {
        self.quote = None;
        self.shipping_fee = Decimal::ZERO;
        self.quote_warning = None;
    }

    /// The key a recomputation should run under, or None when recomputation
    /// must not fire (not dispatch, unserviceable city, nothing shippable).
    pub fn quote_key(&self, city: Option<City>, items: &[ShippableItem]) -> Option<QuoteKey> {
        if self.method != DeliveryMethod::Dispatch {
            return None;
        }
        let city = city?;
        if items.is_empty() {
            return None;
        }
        Some(QuoteKey::new(city, self.delivery_speed, items.to_vec()))
    }

    /// Applies a quote result, but only if `key` still describes the current
    /// configuration. Returns whether the result was applied.
    pub fn apply_quote(
        &mut self,
        key: &QuoteKey,
        current: Option<QuoteKey>,
        result: Result<ShippingQuote, CheckoutError>,
    ) -> bool {
        match current {
            Some(ref now) if now == key => {}
            _ => return false,
        }
        match result {
            Ok(quote) => {
                self.shipping_fee = quote.total_shipping_fee;
                self.quote = Some(quote);
                self.quote_warning = None;
            }
            Err(err) => {
                // Degrade to zero fee; surfaced as a dismissible warning.
                self.quote = None;
                self.shipping_fee = Decimal::ZERO;
                self.quote_warning =
                    Some(format!("Shipping fee could not be calculated: {}", err));
            }
        }
        true
    }

    /// Gate for order submission.
    pub fn ready_for_submit(&self) -> Result<(), CheckoutError> {
        match self.method {
            DeliveryMethod::PickupCenter => {
                if self.pickup_center_id.is_none() {
                    return Err(CheckoutError::PickupCenterRequired);
                }
            }
            DeliveryMethod::Dispatch => {
                if self.quote.is_none() {
                    return Err(CheckoutError::ShippingUnresolved);
                }
            }
        }
        Ok(())
    }
}
