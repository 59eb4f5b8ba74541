//! Payment method rules and the provider redirect hand-off.
//!
//! The redirect URL a provider response carries is followed only when it is
//! provably hosted on the configured provider domain. Anything else,
//! look-alike hosts included, is an open-redirect attempt as far as this
//! module is concerned.

use rust_decimal::Decimal;
use serde_json::Value;
use url::Url;

use crate::errors::CheckoutError;
use crate::models::{CreatedOrder, PaymentInit, PaymentMethod};

/// Nesting paths tried for the redirect URL, most common first. Provider
/// response shapes have drifted across API versions.
const REDIRECT_PATHS: [&[&str]; 7] = [
    &["data", "authorization_url"],
    &["data", "authorizationUrl"],
    &["authorization_url"],
    &["authorizationUrl"],
    &["data", "data", "authorization_url"],
    &["data", "checkout_url"],
    &["checkout_url"],
];

#[derive(Debug, Clone)]
pub struct PaymentGate {
    provider_domain: String,
}

impl PaymentGate {
    pub fn new(provider_domain: impl Into<String>) -> Self {
        Self {
            provider_domain: provider_domain.into().to_ascii_lowercase(),
        }
    }

    /// `credit_balance` is payable only while the wallet covers the total.
    /// Re-checked on every total recomputation; a selection that was valid
    /// can become invalid and must then block submission.
    pub fn check_balance(
        &self,
        method: PaymentMethod,
        total: Decimal,
        wallet_balance: Option<Decimal>,
    ) -> Result<(), CheckoutError> {
        if method != PaymentMethod::CreditBalance {
            return Ok(());
        }
        match wallet_balance {
            Some(balance) if balance >= total => Ok(()),
            _ => Err(CheckoutError::InsufficientBalance),
        }
    }

    /// Guards against a stale-session race attributing the order to the
    /// wrong account. A missing user reference on the order is accepted;
    /// a present-but-different one is fatal.
    pub fn verify_order_user(
        &self,
        order: &CreatedOrder,
        customer_id: &str,
    ) -> Result<(), CheckoutError> {
        match order.user_id.as_deref() {
            Some(user_id) if user_id != customer_id => Err(CheckoutError::OrderUserMismatch),
            _ => Ok(()),
        }
    }

    /// Assembles the mandatory provider-session inputs. Failing to resolve
    /// any of them is a pre-network error; nothing is submitted.
    pub fn payment_init(
        &self,
        order: &CreatedOrder,
        fallback_amount: Decimal,
        fallback_email: &str,
    ) -> Result<PaymentInit, CheckoutError> {
        if order.id.is_empty() {
            return Err(CheckoutError::MissingPaymentField("orderId"));
        }
        let amount = match order.total_amount {
            Some(amount) if amount > Decimal::ZERO => amount,
            _ if fallback_amount > Decimal::ZERO => fallback_amount,
            _ => return Err(CheckoutError::MissingPaymentField("amount")),
        };
        let email = order
            .email
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or(fallback_email);
        if email.is_empty() {
            return Err(CheckoutError::MissingPaymentField("email"));
        }
        Ok(PaymentInit {
            order_id: order.id.clone(),
            amount,
            email: email.to_string(),
        })
    }

    /// Pulls the redirect URL out of a provider response, trying each known
    /// nesting in order.
    pub fn extract_redirect_url(response: &Value) -> Option<String> {
        for path in REDIRECT_PATHS {
            let mut node = response;
            let mut ok = true;
            for segment in path {
                match node.get(segment) {
                    Some(next) => node = next,
                    None => {
                        ok = false;
                        break;
                    }
                }
            }
            if !ok {
                continue;
            }
            if let Some(raw) = node.as_str().filter(|s| !s.is_empty()) {
                return Some(raw.to_string());
            }
        }
        None
    }

    /// Accepts a redirect target only when it parses as an https URL whose
    /// host is exactly the provider domain or one label beneath it.
    /// `paystack.com.evil.net` fails the suffix check; `evilpaystack.com`
    /// fails the label check.
    pub fn validate_redirect(&self, raw: &str) -> Result<Url, CheckoutError> {
        let url = Url::parse(raw)
            .map_err(|_| CheckoutError::UntrustedRedirect(raw.to_string()))?;
        if url.scheme() != "https" {
            return Err(CheckoutError::UntrustedRedirect(raw.to_string()));
        }
        let host = match url.host_str() {
            Some(host) => host.to_ascii_lowercase(),
            None => return Err(CheckoutError::UntrustedRedirect(raw.to_string())),
        };
        if host == self.provider_domain {
            return Ok(url);
        }
        if let Some(label) = host.strip_suffix(&format!(".{}", self.provider_domain)) {
            if !label.is_empty() && !label.contains('.') {
                return Ok(url);
            }
        }
        Err(CheckoutError::UntrustedRedirect(raw.to_string()))
    }

    /// Extract-then-validate in one step for the submit path.
    pub fn redirect_from_response(&self, response: &Value) -> Result<String, CheckoutError> {
        let raw = Self::extract_redirect_url(response)
            .ok_or(CheckoutError::MissingPaymentField("redirectUrl"))?;
        self.validate_redirect(&raw)?;
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn gate() -> PaymentGate {
        PaymentGate::new("paystack.com")
    }

    fn order() -> CreatedOrder {
        CreatedOrder {
            id: "ord_1".into(),
            order_number: Some("A-100".into()),
            total_amount: Some(dec!(195.00)),
            user_id: Some("u_1".into()),
            email: Some("ama@example.com".into()),
        }
    }

    #[test]
    fn balance_rule_only_binds_credit_balance() {
        let g = gate();
        assert!(g
            .check_balance(PaymentMethod::MobileMoney, dec!(100), Some(dec!(0)))
            .is_ok());
        assert!(g
            .check_balance(PaymentMethod::CreditBalance, dec!(100), Some(dec!(100)))
            .is_ok());
        assert_matches!(
            g.check_balance(PaymentMethod::CreditBalance, dec!(100), Some(dec!(50))),
            Err(CheckoutError::InsufficientBalance)
        );
        assert_matches!(
            g.check_balance(PaymentMethod::CreditBalance, dec!(100), None),
            Err(CheckoutError::InsufficientBalance)
        );
    }

    #[test]
    fn user_mismatch_is_fatal() {
        let g = gate();
        assert!(g.verify_order_user(&order(), "u_1").is_ok());
        assert_matches!(
            g.verify_order_user(&order(), "u_2"),
            Err(CheckoutError::OrderUserMismatch)
        );

        let mut anonymous = order();
        anonymous.user_id = None;
        assert!(g.verify_order_user(&anonymous, "u_2").is_ok());
    }

    #[test]
    fn payment_init_requires_all_three_fields() {
        let g = gate();
        let init = g.payment_init(&order(), dec!(0), "fallback@example.com").unwrap();
        assert_eq!(init.order_id, "ord_1");
        assert_eq!(init.amount, dec!(195.00));
        assert_eq!(init.email, "ama@example.com");

        let mut no_amount = order();
        no_amount.total_amount = None;
        let init = g.payment_init(&no_amount, dec!(88.00), "x@y.com").unwrap();
        assert_eq!(init.amount, dec!(88.00));
        assert_matches!(
            g.payment_init(&no_amount, dec!(0), "x@y.com"),
            Err(CheckoutError::MissingPaymentField("amount"))
        );

        let mut no_email = order();
        no_email.email = None;
        assert_matches!(
            g.payment_init(&no_email, dec!(1), ""),
            Err(CheckoutError::MissingPaymentField("email"))
        );
    }

    #[test]
    fn redirect_extraction_tries_known_shapes() {
        let shapes = [
            json!({"data": {"authorization_url": "https://checkout.paystack.com/a"}}),
            json!({"authorizationUrl": "https://checkout.paystack.com/b"}),
            json!({"data": {"data": {"authorization_url": "https://checkout.paystack.com/c"}}}),
            json!({"checkout_url": "https://checkout.paystack.com/d"}),
        ];
        for shape in &shapes {
            assert!(PaymentGate::extract_redirect_url(shape).is_some(), "{}", shape);
        }
        assert!(PaymentGate::extract_redirect_url(&json!({"status": true})).is_none());
        assert!(PaymentGate::extract_redirect_url(&json!({"authorization_url": ""})).is_none());
    }

    #[test]
    fn redirect_validation_accepts_provider_and_direct_subdomain() {
        let g = gate();
        assert!(g.validate_redirect("https://paystack.com/pay/x").is_ok());
        assert!(g.validate_redirect("https://checkout.paystack.com/abc").is_ok());
    }

    #[test]
    fn redirect_validation_rejects_lookalikes() {
        let g = gate();
        assert_matches!(
            g.validate_redirect("https://paystack.com.evil.net/abc"),
            Err(CheckoutError::UntrustedRedirect(_))
        );
        assert_matches!(
            g.validate_redirect("https://notpaystack.com"),
            Err(CheckoutError::UntrustedRedirect(_))
        );
        assert_matches!(
            g.validate_redirect("https://a.b.paystack.com/x"),
            Err(CheckoutError::UntrustedRedirect(_))
        );
        assert_matches!(
            g.validate_redirect("http://checkout.paystack.com/abc"),
            Err(CheckoutError::UntrustedRedirect(_))
        );
        assert_matches!(
            g.validate_redirect("not a url"),
            Err(CheckoutError::UntrustedRedirect(_))
        );
    }
}
