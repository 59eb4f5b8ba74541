use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the buyer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    PaymentOnDelivery,
    MobileMoney,
    Bank,
    CreditBalance,
}

impl PaymentMethod {
    /// Methods that hand off to the provider-hosted payment page.
    pub fn requires_redirect(&self) -> bool {
        matches!(self, PaymentMethod::MobileMoney)
    }
}

/// The three mandatory inputs of a provider payment session. Constructed
/// only once all of them resolved; missing any is a pre-network failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInit {
    pub order_id: String,
    pub amount: Decimal,
    pub email: String,
}
