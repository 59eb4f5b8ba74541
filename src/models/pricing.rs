use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;

use super::coupon::BackendTotals;

/// Rounds to 2 decimal places, half-up.
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// One consistent picture of what the buyer owes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingSnapshot {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
}

impl PricingSnapshot {
    /// Combines the independently tracked amounts into a single total due.
    ///
    /// Precedence: when the coupon service returned recomputed totals, its
    /// `total_amount` is authoritative and used verbatim; its subtotal and
    /// discount are preferred for display when present. Otherwise
    /// `total = round2(max(0, subtotal - discount) + shipping_fee)`.
    pub fn compute(
        subtotal: Decimal,
        discount: Decimal,
        shipping_fee: Decimal,
        backend_totals: Option<&BackendTotals>,
    ) -> Self {
        if let Some(totals) = backend_totals {
            return Self {
                subtotal: totals.subtotal.unwrap_or(subtotal),
                discount: totals.discount.unwrap_or(discount),
                shipping_fee,
                total: totals.total_amount,
            };
        }

        let discounted = (subtotal - discount).max(Decimal::ZERO);
        Self {
            subtotal,
            discount,
            shipping_fee,
            total: round2(discounted + shipping_fee),
        }
    }
}

/// Ghana levy breakdown for receipt display.
///
/// Display-only: none of these feed back into [`PricingSnapshot::total`].
/// VAT applies on the subtotal inclusive of NHIL and GETFund.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxBreakdown {
    pub nhil: Decimal,
    pub getfund: Decimal,
    pub covid_levy: Decimal,
    pub vat: Decimal,
}

impl TaxBreakdown {
    const NHIL_RATE: Decimal = dec!(0.025);
    const GETFUND_RATE: Decimal = dec!(0.025);
    const COVID_RATE: Decimal = dec!(0.01);
    const VAT_RATE: Decimal = dec!(0.15);

    pub fn of(subtotal: Decimal) -> Self {
        let nhil = round2(subtotal * Self::NHIL_RATE);
        let getfund = round2(subtotal * Self::GETFUND_RATE);
        let covid_levy = round2(subtotal * Self::COVID_RATE);
        let vat = round2((subtotal + nhil + getfund) * Self::VAT_RATE);
        Self {
            nhil,
            getfund,
            covid_levy,
            vat,
        }
    }
}
