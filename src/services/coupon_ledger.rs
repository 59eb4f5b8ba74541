//! Coupon application bookkeeping for a checkout session.
//!
//! At most one coupon is active at a time, applies are not re-entrant, and
//! removal resets discount and backend totals in one step so the two can
//! never disagree about whether a coupon is applied.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::errors::CheckoutError;
use crate::models::coupon::{CouponRequest, CouponVerdict};
use crate::models::{BackendTotals, Cart, CouponApplication, DiscountType};

const MAX_CODE_LEN: usize = 50;

/// Trim, uppercase, strip non-alphanumerics, cap at 50 characters.
/// None when nothing usable remains.
pub fn normalize_code(raw: &str) -> Option<String> {
    let code: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .take(MAX_CODE_LEN)
        .collect();
    if code.is_empty() {
        None
    } else {
        Some(code)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponLedger {
    pub active: Option<CouponApplication>,
    pub message: Option<String>,
    #[serde(skip)]
    pending: bool,
}

impl CouponLedger {
    /// Builds the eligibility payload for a normalized code.
    pub fn eligibility_request(code: String, cart: &Cart) -> CouponRequest {
        CouponRequest {
            coupon_code: code,
            order_amount: cart.subtotal,
            product_ids: cart.product_ids(),
            category_ids: cart.category_ids(),
            seller_ids: cart.seller_ids(),
        }
    }

    /// Marks an apply in flight. A second apply while one is pending is
    /// rejected, never interleaved. An already-active coupon is removed
    /// first, as if the buyer had cleared it.
    pub fn begin_apply(&mut self) -> Result<(), CheckoutError> {
        if self.pending {
            return Err(CheckoutError::CouponPending);
        }
        self.remove();
        self.pending = true;
        Ok(())
    }

    /// Called when an apply result arrives for a session that was torn down
    /// or superseded; releases the in-flight slot without touching state.
    pub fn abandon_apply(&mut self) {
        self.pending = false;
    }

    /// Settles the in-flight apply with the service verdict.
    ///
    /// Returns the user-facing message on success; rejection and request
    /// failure both land in `Err(CouponRejected)` with state fully reset.
    pub fn settle(
        &mut self,
        code: String,
        outcome: Result<CouponVerdict, CheckoutError>,
    ) -> Result<String, CheckoutError> {
        self.pending = false;
        let verdict = match outcome {
            Ok(verdict) => verdict,
            Err(err) => {
                self.remove();
                let message = format!("Could not apply coupon: {}", err.response_message());
                self.message = Some(message.clone());
                return Err(CheckoutError::CouponRejected(message));
            }
        };

        if !verdict.valid {
            self.remove();
            let message = verdict
                .message
                .unwrap_or_else(|| "This coupon cannot be applied to your order".to_string());
            self.message = Some(message.clone());
            return Err(CheckoutError::CouponRejected(message));
        }

        let discount_amount = verdict.discount_amount.unwrap_or(Decimal::ZERO);
        let discount_type = verdict.discount_type.unwrap_or(DiscountType::Fixed);
        let discount_value = verdict.discount_value.unwrap_or(discount_amount);

        let message = match discount_type {
            DiscountType::Percentage => format!(
                "Coupon {} applied: {}% off (GHS {:.2})",
                code, discount_value, discount_amount
            ),
            DiscountType::Fixed => {
                format!("Coupon {} applied: GHS {:.2} off", code, discount_amount)
            }
        };

        self.active = Some(CouponApplication {
            code,
            discount_amount,
            discount_type,
            discount_value,
            coupon_id: verdict.coupon_id,
            batch_id: verdict.batch_id,
            backend_totals: verdict.totals,
        });
        self.message = Some(message.clone());
        Ok(message)
    }

    /// Clears discount, message, and backend totals atomically.
    pub fn remove(&mut self) {
        self.active = None;
        self.message = None;
    }

    pub fn discount(&self) -> Decimal {
        self.active
            .as_ref()
            .map(|a| a.discount_amount)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn backend_totals(&self) -> Option<&BackendTotals> {
        self.active.as_ref().and_then(|a| a.backend_totals.as_ref())
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn valid_verdict() -> CouponVerdict {
        serde_json::from_value(serde_json::json!({
            "valid": true,
            "discountAmount": "20",
            "discountType": "percentage",
            "discountValue": "10",
            "couponId": "c_1",
            "batchId": "b_1"
        }))
        .unwrap()
    }

    #[test]
    fn code_normalization() {
        assert_eq!(normalize_code("  save10 "), Some("SAVE10".into()));
        assert_eq!(normalize_code("sa-ve 10!"), Some("SAVE10".into()));
        assert_eq!(normalize_code("--- !!"), None);
        assert_eq!(normalize_code(""), None);

        let long = "A".repeat(80);
        assert_eq!(normalize_code(&long).unwrap().len(), 50);
    }

    #[test]
    fn apply_stores_discount_and_identity() {
        let mut ledger = CouponLedger::default();
        ledger.begin_apply().unwrap();
        let message = ledger.settle("SAVE10".into(), Ok(valid_verdict())).unwrap();
        assert!(message.contains("10%"));
        assert!(message.contains("20.00"));
        assert_eq!(ledger.discount(), dec!(20));
        assert_eq!(ledger.active.as_ref().unwrap().coupon_id.as_deref(), Some("c_1"));
    }

    #[test]
    fn fixed_coupons_report_only_the_amount() {
        let verdict: CouponVerdict = serde_json::from_value(serde_json::json!({
            "valid": true,
            "discountAmount": "5.00",
            "discountType": "fixed",
            "discountValue": "5.00"
        }))
        .unwrap();
        let mut ledger = CouponLedger::default();
        ledger.begin_apply().unwrap();
        let message = ledger.settle("FIVER".into(), Ok(verdict)).unwrap();
        assert!(message.contains("GHS 5.00"));
        assert!(!message.contains('%'));
    }

    #[test]
    fn invalid_verdict_resets_state_and_surfaces_message() {
        let mut ledger = CouponLedger::default();
        ledger.begin_apply().unwrap();
        let verdict: CouponVerdict = serde_json::from_value(serde_json::json!({
            "valid": false,
            "message": "Coupon expired"
        }))
        .unwrap();
        let err = ledger.settle("OLD".into(), Ok(verdict)).unwrap_err();
        assert_matches!(err, CheckoutError::CouponRejected(msg) if msg == "Coupon expired");
        assert_eq!(ledger.discount(), Decimal::ZERO);
        assert!(ledger.active.is_none());
        assert!(!ledger.is_pending());
    }

    #[test]
    fn request_failure_resets_state_with_fallback_message() {
        let mut ledger = CouponLedger::default();
        ledger.begin_apply().unwrap();
        let err = ledger
            .settle(
                "SAVE10".into(),
                Err(CheckoutError::ExternalService("503".into())),
            )
            .unwrap_err();
        assert_matches!(err, CheckoutError::CouponRejected(_));
        assert_eq!(ledger.discount(), Decimal::ZERO);
    }

    #[test]
    fn apply_is_not_reentrant() {
        let mut ledger = CouponLedger::default();
        ledger.begin_apply().unwrap();
        assert_matches!(ledger.begin_apply(), Err(CheckoutError::CouponPending));
        ledger.abandon_apply();
        assert!(ledger.begin_apply().is_ok());
    }

    #[test]
    fn apply_over_active_coupon_removes_it_first() {
        let mut ledger = CouponLedger::default();
        ledger.begin_apply().unwrap();
        ledger.settle("SAVE10".into(), Ok(valid_verdict())).unwrap();
        assert!(ledger.active.is_some());

        ledger.begin_apply().unwrap();
        // Between begin and settle, nothing is applied.
        assert!(ledger.active.is_none());
        assert_eq!(ledger.discount(), Decimal::ZERO);
    }

    #[test]
    fn apply_then_remove_is_idempotent() {
        let mut ledger = CouponLedger::default();
        ledger.begin_apply().unwrap();
        ledger.settle("SAVE10".into(), Ok(valid_verdict())).unwrap();
        ledger.remove();
        assert_eq!(ledger.discount(), Decimal::ZERO);
        assert!(ledger.backend_totals().is_none());
        assert!(ledger.message.is_none());
        assert!(ledger.active.is_none());
    }

    #[test]
    fn discount_defaults_to_zero_when_absent() {
        let verdict: CouponVerdict =
            serde_json::from_value(serde_json::json!({"valid": true})).unwrap();
        let mut ledger = CouponLedger::default();
        ledger.begin_apply().unwrap();
        ledger.settle("FREEBIE".into(), Ok(verdict)).unwrap();
        assert_eq!(ledger.discount(), Decimal::ZERO);
    }
}
