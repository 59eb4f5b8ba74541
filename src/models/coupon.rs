use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

/// Totals recomputed by the coupon service. When present, `total_amount`
/// overrides any locally computed total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendTotals {
    #[serde(default)]
    pub subtotal: Option<Decimal>,
    #[serde(default)]
    pub discount: Option<Decimal>,
    pub total_amount: Decimal,
}

/// A successfully applied coupon. At most one exists per checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponApplication {
    pub code: String,
    pub discount_amount: Decimal,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    #[serde(default)]
    pub coupon_id: Option<String>,
    #[serde(default)]
    pub batch_id: Option<String>,
    #[serde(default)]
    pub backend_totals: Option<BackendTotals>,
}

/// Coupon service verdict for an apply request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponVerdict {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub discount_amount: Option<Decimal>,
    #[serde(default)]
    pub discount_type: Option<DiscountType>,
    #[serde(default)]
    pub discount_value: Option<Decimal>,
    #[serde(default)]
    pub coupon_id: Option<String>,
    #[serde(default)]
    pub batch_id: Option<String>,
    #[serde(default)]
    pub totals: Option<BackendTotals>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Eligibility payload submitted to the coupon service.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponRequest {
    pub coupon_code: String,
    pub order_amount: Decimal,
    pub product_ids: Vec<String>,
    pub category_ids: Vec<String>,
    pub seller_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn verdict_defaults_tolerate_sparse_responses() {
        let verdict: CouponVerdict = serde_json::from_str(r#"{"valid": false}"#).unwrap();
        assert!(!verdict.valid);
        assert!(verdict.discount_amount.is_none());
        assert!(verdict.totals.is_none());
    }

    #[test]
    fn backend_totals_round_trip() {
        let totals: BackendTotals = serde_json::from_str(
            r#"{"subtotal": "200.00", "discount": "20.00", "totalAmount": "195.00"}"#,
        )
        .unwrap();
        assert_eq!(totals.total_amount, dec!(195.00));
        assert_eq!(totals.discount, Some(dec!(20.00)));
    }
}
