//! The checkout session aggregate and the order submission state machine.
//!
//! Every independently fetched piece of state (addresses, cart, shipping
//! quote, coupon, wallet balance) lives in its own slot on the session; this
//! service reconciles them into one "can this order be placed, and for how
//! much" decision and drives submission to a payment redirect or a
//! confirmation.
//!
//! Transitions never run concurrently for a session: operations lock the
//! session, and the network phases of quote/coupon/submit release the lock
//! and re-validate on re-entry (closed flag, configuration key, pending
//! flag) before applying the result.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::{CheckoutError, FieldErrorKind};
use crate::events::{Event, EventSender};
use crate::models::{
    Address, AddressMode, Cart, City, CreatedOrder, DeliveryMethod, DeliverySpeed,
    OrderConfirmation, OrderDraft, OrderItemDraft, PaymentMethod, PaymentRedirect, PickupCenter,
    PricingSnapshot, ResolvedAddress, TaxBreakdown,
};

use super::address_selector;
use super::clients::{
    AddressClient, CartClient, CouponClient, OrderClient, PaymentClient, QuoteRequest,
    ShippingClient, WalletClient,
};
use super::coupon_ledger::{normalize_code, CouponLedger};
use super::delivery_planner::DeliveryPlan;
use super::payment_gate::PaymentGate;

/// The collaborator services the checkout flow orchestrates.
#[derive(Clone)]
pub struct Collaborators {
    pub address: Arc<dyn AddressClient>,
    pub cart: Arc<dyn CartClient>,
    pub shipping: Arc<dyn ShippingClient>,
    pub coupon: Arc<dyn CouponClient>,
    pub order: Arc<dyn OrderClient>,
    pub payment: Arc<dyn PaymentClient>,
    pub wallet: Arc<dyn WalletClient>,
}

/// Submission state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutState {
    Idle,
    /// Validation failed; the buyer can correct inputs and retry.
    Blocked,
    Validating,
    Submitting,
    RedirectingToPayment,
    Confirmed,
}

/// One buyer's checkout attempt.
#[derive(Debug)]
pub struct CheckoutSession {
    pub id: Uuid,
    pub customer_id: String,
    pub customer_email: String,
    pub state: CheckoutState,
    pub blocked_reason: Option<String>,
    pub addresses: Vec<Address>,
    pub address_mode: AddressMode,
    pub cart: Cart,
    pub delivery: DeliveryPlan,
    pub coupon: CouponLedger,
    pub wallet_balance: Option<Decimal>,
    pub payment_method: Option<PaymentMethod>,
    pub started_at: DateTime<Utc>,
    /// Set on teardown; any in-flight result arriving afterwards is dropped.
    pub closed: bool,
}

impl CheckoutSession {
    pub fn resolved_address(&self) -> Result<ResolvedAddress, CheckoutError> {
        address_selector::resolve(&self.address_mode, &self.addresses)
    }

    /// Buyer city when the current address resolves to a serviceable one.
    pub fn buyer_city(&self) -> Option<City> {
        self.resolved_address().ok().and_then(|a| a.city())
    }

    /// Always recomputed; a snapshot is never cached across a coupon
    /// removal or shipping-fee change.
    pub fn pricing(&self) -> PricingSnapshot {
        PricingSnapshot::compute(
            self.cart.subtotal,
            self.coupon.discount(),
            self.delivery.shipping_fee,
            self.coupon.backend_totals(),
        )
    }

    fn quote_key(&self) -> Option<crate::models::QuoteKey> {
        self.delivery
            .quote_key(self.buyer_city(), &self.cart.shippable_items())
    }
}

/// Read model returned to the client after every operation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutView {
    pub session_id: Uuid,
    pub state: CheckoutState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
    pub customer_id: String,
    pub customer_email: String,
    pub addresses: Vec<Address>,
    pub address_mode: AddressMode,
    pub cart: Cart,
    pub delivery: DeliveryPlan,
    pub coupon: CouponLedger,
    pub pricing: PricingSnapshot,
    pub taxes: TaxBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_balance: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    /// Whether `credit_balance` is currently selectable.
    pub credit_balance_available: bool,
}

impl CheckoutView {
    fn of(session: &CheckoutSession) -> Self {
        let pricing = session.pricing();
        let credit_balance_available = session
            .wallet_balance
            .map(|balance| balance >= pricing.total)
            .unwrap_or(false);
        Self {
            session_id: session.id,
            state: session.state,
            blocked_reason: session.blocked_reason.clone(),
            customer_id: session.customer_id.clone(),
            customer_email: session.customer_email.clone(),
            addresses: session.addresses.clone(),
            address_mode: session.address_mode.clone(),
            cart: session.cart.clone(),
            delivery: session.delivery.clone(),
            coupon: session.coupon.clone(),
            taxes: TaxBreakdown::of(pricing.subtotal),
            pricing,
            wallet_balance: session.wallet_balance,
            payment_method: session.payment_method,
            credit_balance_available,
        }
    }
}

/// Terminal (and near-terminal) submission outcomes.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    RedirectingToPayment { redirect: PaymentRedirect },
    Confirmed { confirmation: OrderConfirmation },
    /// The order exists but the payment session could not be started.
    /// Never worded as a failed order.
    #[serde(rename_all = "camelCase")]
    PaymentPending { order_id: String, message: String },
}

/// Inputs captured at validation time and carried through submission.
struct StagedSubmit {
    payment_method: PaymentMethod,
    pricing: PricingSnapshot,
    delivery_method: DeliveryMethod,
    shipping_fee: Decimal,
    email: String,
    customer_id: String,
}

pub struct CheckoutService {
    collaborators: Collaborators,
    event_sender: EventSender,
    gate: PaymentGate,
    sessions: DashMap<Uuid, Arc<Mutex<CheckoutSession>>>,
}

impl CheckoutService {
    pub fn new(
        collaborators: Collaborators,
        event_sender: EventSender,
        provider_domain: impl Into<String>,
    ) -> Self {
        Self {
            collaborators,
            event_sender,
            gate: PaymentGate::new(provider_domain),
            sessions: DashMap::new(),
        }
    }

    fn session(&self, session_id: Uuid) -> Result<Arc<Mutex<CheckoutSession>>, CheckoutError> {
        self.sessions
            .get(&session_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CheckoutError::SessionNotFound(session_id.to_string()))
    }

    /// Starts a checkout session for an authenticated buyer.
    ///
    /// Addresses, cart, and wallet balance are fetched concurrently. The
    /// cart is load-bearing and propagates failure; the other two degrade
    /// (empty address book forces new-address mode, an unknown balance just
    /// disables wallet payment).
    #[instrument(skip(self))]
    pub async fn start_checkout(
        &self,
        customer_id: String,
        customer_email: String,
    ) -> Result<CheckoutView, CheckoutError> {
        let (addresses, cart, balance) = futures::join!(
            self.collaborators.address.fetch_addresses(&customer_id),
            self.collaborators.cart.fetch_cart(&customer_id),
            self.collaborators.wallet.balance(&customer_id),
        );

        let cart = cart?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let addresses = addresses.unwrap_or_else(|err| {
            warn!("address list unavailable, starting in new-address mode: {}", err);
            Vec::new()
        });
        let wallet_balance = balance
            .map_err(|err| warn!("wallet balance unavailable: {}", err))
            .ok();

        let session_id = Uuid::new_v4();
        let address_mode = address_selector::auto_select(&addresses);
        let session = CheckoutSession {
            id: session_id,
            customer_id: customer_id.clone(),
            customer_email,
            state: CheckoutState::Idle,
            blocked_reason: None,
            addresses,
            address_mode,
            cart,
            delivery: DeliveryPlan::default(),
            coupon: CouponLedger::default(),
            wallet_balance,
            payment_method: None,
            started_at: Utc::now(),
            closed: false,
        };

        let arc = Arc::new(Mutex::new(session));
        self.sessions.insert(session_id, arc.clone());

        self.event_sender
            .send_or_log(Event::CheckoutStarted {
                session_id,
                customer_id,
            })
            .await;

        // Initial quote, when the auto-selected address already gives a city.
        self.recompute_shipping(&arc).await;

        let session = arc.lock().await;
        info!("Started checkout session {}", session_id);
        Ok(CheckoutView::of(&session))
    }

    #[instrument(skip(self))]
    pub async fn view(&self, session_id: Uuid) -> Result<CheckoutView, CheckoutError> {
        let arc = self.session(session_id)?;
        let session = arc.lock().await;
        Ok(CheckoutView::of(&session))
    }

    /// Selects an existing address or records new-address fields.
    #[instrument(skip(self, mode))]
    pub async fn set_address(
        &self,
        session_id: Uuid,
        mode: AddressMode,
    ) -> Result<CheckoutView, CheckoutError> {
        let arc = self.session(session_id)?;
        {
            let mut session = arc.lock().await;
            if session.closed {
                return Err(CheckoutError::SessionClosed);
            }
            match &mode {
                AddressMode::Existing { address_id } => {
                    let id = address_id
                        .as_deref()
                        .ok_or(CheckoutError::NoAddressSelected)?;
                    if !session.addresses.iter().any(|a| a.id == id) {
                        return Err(CheckoutError::NoAddressSelected);
                    }
                    session.address_mode = mode.clone();
                }
                AddressMode::New { draft } => {
                    let normalized = address_selector::validate_draft(draft)
                        .map_err(CheckoutError::Validation)?;
                    session.address_mode = AddressMode::New { draft: normalized };
                }
            }
            session.blocked_reason = None;
            if session.state == CheckoutState::Blocked {
                session.state = CheckoutState::Idle;
            }
        }

        self.event_sender
            .send_or_log(Event::AddressChanged { session_id })
            .await;

        // The quote is stale against the (possibly) new city.
        self.recompute_shipping(&arc).await;

        let session = arc.lock().await;
        Ok(CheckoutView::of(&session))
    }

    /// Pickup centers for the session's buyer city.
    #[instrument(skip(self))]
    pub async fn pickup_centers(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<PickupCenter>, CheckoutError> {
        let arc = self.session(session_id)?;
        let city = {
            let session = arc.lock().await;
            let resolved = session.resolved_address()?;
            resolved.city().ok_or_else(|| {
                CheckoutError::UnsupportedCity(match &resolved {
                    ResolvedAddress::Existing(a) => a.city.clone(),
                    ResolvedAddress::New(d) => d.city.clone(),
                })
            })?
        };
        self.collaborators.shipping.pickup_centers(city).await
    }

    /// Delivery method, speed, and pickup-center transitions.
    #[instrument(skip(self))]
    pub async fn set_delivery(
        &self,
        session_id: Uuid,
        method: DeliveryMethod,
        pickup_center_id: Option<String>,
        delivery_speed: Option<DeliverySpeed>,
    ) -> Result<CheckoutView, CheckoutError> {
        let arc = self.session(session_id)?;

        // Choosing a center means validating it against the city-scoped
        // list, which is a fetch; resolve the city first.
        let validated_center = if let Some(center_id) = pickup_center_id {
            let city = {
                let session = arc.lock().await;
                if session.closed {
                    return Err(CheckoutError::SessionClosed);
                }
                session.buyer_city().ok_or_else(|| {
                    CheckoutError::UnsupportedCity("unknown buyer city".to_string())
                })?
            };
            let centers = self.collaborators.shipping.pickup_centers(city).await?;
            if !centers.iter().any(|c| c.id == center_id) {
                return Err(CheckoutError::field(
                    "pickupCenterId",
                    FieldErrorKind::Invalid,
                ));
            }
            Some(center_id)
        } else {
            None
        };

        {
            let mut session = arc.lock().await;
            if session.closed {
                return Err(CheckoutError::SessionClosed);
            }
            session.delivery.set_method(method);
            if let Some(speed) = delivery_speed {
                if method == DeliveryMethod::Dispatch {
                    session.delivery.set_speed(speed);
                }
            }
            if let Some(center_id) = validated_center {
                if method == DeliveryMethod::PickupCenter {
                    session.delivery.choose_center(center_id);
                }
            }
        }

        self.event_sender
            .send_or_log(Event::DeliveryChanged {
                session_id,
                method: format!("{:?}", method),
            })
            .await;

        self.recompute_shipping(&arc).await;

        let session = arc.lock().await;
        Ok(CheckoutView::of(&session))
    }

    /// Applies a coupon code against the current subtotal and item set.
    #[instrument(skip(self))]
    pub async fn apply_coupon(
        &self,
        session_id: Uuid,
        raw_code: &str,
    ) -> Result<CheckoutView, CheckoutError> {
        // Malformed codes never reach the network.
        let code = normalize_code(raw_code).ok_or(CheckoutError::InvalidCouponFormat)?;

        let arc = self.session(session_id)?;
        let request = {
            let mut session = arc.lock().await;
            if session.closed {
                return Err(CheckoutError::SessionClosed);
            }
            session.coupon.begin_apply()?;
            CouponLedger::eligibility_request(code.clone(), &session.cart)
        };

        let outcome = self.collaborators.coupon.apply(&request).await;

        let result = {
            let mut session = arc.lock().await;
            if session.closed {
                // Result arrived after teardown; never apply it.
                session.coupon.abandon_apply();
                return Err(CheckoutError::SessionClosed);
            }
            session.coupon.settle(code.clone(), outcome)
        };

        match result {
            Ok(_) => {
                let session = arc.lock().await;
                self.event_sender
                    .send_or_log(Event::CouponApplied {
                        session_id,
                        code,
                        discount: session.coupon.discount(),
                    })
                    .await;
                Ok(CheckoutView::of(&session))
            }
            Err(err) => Err(err),
        }
    }

    /// Removes the applied coupon; discount and backend totals reset
    /// together.
    #[instrument(skip(self))]
    pub async fn remove_coupon(&self, session_id: Uuid) -> Result<CheckoutView, CheckoutError> {
        let arc = self.session(session_id)?;
        {
            let mut session = arc.lock().await;
            if session.closed {
                return Err(CheckoutError::SessionClosed);
            }
            if session.coupon.is_pending() {
                return Err(CheckoutError::CouponPending);
            }
            session.coupon.remove();
        }
        self.event_sender
            .send_or_log(Event::CouponRemoved { session_id })
            .await;
        let session = arc.lock().await;
        Ok(CheckoutView::of(&session))
    }

    /// Selects how the buyer pays. Wallet payment is refused outright when
    /// the balance does not cover the current total.
    #[instrument(skip(self))]
    pub async fn set_payment_method(
        &self,
        session_id: Uuid,
        method: PaymentMethod,
    ) -> Result<CheckoutView, CheckoutError> {
        let arc = self.session(session_id)?;
        let mut session = arc.lock().await;
        if session.closed {
            return Err(CheckoutError::SessionClosed);
        }
        let total = session.pricing().total;
        self.gate
            .check_balance(method, total, session.wallet_balance)?;
        session.payment_method = Some(method);
        Ok(CheckoutView::of(&session))
    }

    /// Tears the session down. In-flight results keyed to it are dropped
    /// when they arrive; nothing computed after this point is applied.
    #[instrument(skip(self))]
    pub async fn close_session(&self, session_id: Uuid) -> Result<(), CheckoutError> {
        let (_, arc) = self
            .sessions
            .remove(&session_id)
            .ok_or_else(|| CheckoutError::SessionNotFound(session_id.to_string()))?;
        {
            let mut session = arc.lock().await;
            session.closed = true;
        }
        self.event_sender
            .send_or_log(Event::CheckoutAbandoned { session_id })
            .await;
        Ok(())
    }

    /// Runs the submission state machine:
    /// Idle → Validating → Submitting → RedirectingToPayment | Confirmed,
    /// with Blocked on validation failure.
    #[instrument(skip(self))]
    pub async fn submit_order(
        &self,
        session_id: Uuid,
    ) -> Result<SubmitOutcome, CheckoutError> {
        let arc = self.session(session_id)?;

        // Validating: everything checked before any network call.
        let (draft, staged) = {
            let mut session = arc.lock().await;
            if session.closed {
                return Err(CheckoutError::SessionClosed);
            }
            if session.state == CheckoutState::Submitting {
                return Err(CheckoutError::SubmissionInFlight);
            }
            session.state = CheckoutState::Validating;
            match self.validate_for_submit(&session) {
                Ok(prepared) => {
                    session.state = CheckoutState::Submitting;
                    session.blocked_reason = None;
                    prepared
                }
                Err(err) => {
                    session.state = CheckoutState::Blocked;
                    session.blocked_reason = Some(err.response_message());
                    return Err(err);
                }
            }
        };

        // Submitting: the order write happens without the session lock so
        // teardown stays observable.
        let response = self.collaborators.order.create(&draft).await;

        let mut session = arc.lock().await;
        let response = match response {
            Ok(response) => response,
            Err(err) => {
                session.state = CheckoutState::Blocked;
                session.blocked_reason = Some(err.response_message());
                return Err(err);
            }
        };

        if session.closed {
            // The order may exist server-side; the session is gone, so the
            // result is dropped rather than applied.
            warn!("order created after session teardown; dropping result");
            return Err(CheckoutError::SessionClosed);
        }

        let order = match CreatedOrder::extract(&response) {
            Some(order) => order,
            None => {
                session.state = CheckoutState::Blocked;
                session.blocked_reason =
                    Some(CheckoutError::OrderExtractionFailed.response_message());
                return Err(CheckoutError::OrderExtractionFailed);
            }
        };

        // The order owns the line items now, whatever the payment branch
        // does next.
        if let Err(err) = self
            .collaborators
            .cart
            .clear_cart(&staged.customer_id)
            .await
        {
            warn!("cart clear failed after order creation: {}", err);
        }
        session.cart = Cart::default();

        self.event_sender
            .send_or_log(Event::OrderSubmitted {
                session_id,
                order_id: order.id.clone(),
            })
            .await;

        if staged.payment_method.requires_redirect() {
            self.finish_with_redirect(&mut session, session_id, order, &staged)
                .await
        } else {
            let confirmation = OrderConfirmation {
                order_id: order.id.clone(),
                order_number: order.order_number.clone(),
                total_amount: order.total_amount.unwrap_or(staged.pricing.total),
                payment_method: staged.payment_method,
                shipping_cost: staged.shipping_fee,
                sub_total: staged.pricing.subtotal,
                discount: staged.pricing.discount,
                order_date: Utc::now(),
                delivery_method: staged.delivery_method,
            };
            session.state = CheckoutState::Confirmed;
            self.event_sender
                .send_or_log(Event::OrderConfirmed {
                    session_id,
                    order_id: order.id,
                })
                .await;
            Ok(SubmitOutcome::Confirmed { confirmation })
        }
    }

    /// The redirect-payment tail of submission. The order already exists;
    /// failures here must read as "payment pending", except the two guards
    /// that abort outright.
    async fn finish_with_redirect(
        &self,
        session: &mut CheckoutSession,
        session_id: Uuid,
        order: CreatedOrder,
        staged: &StagedSubmit,
    ) -> Result<SubmitOutcome, CheckoutError> {
        if let Err(err) = self.gate.verify_order_user(&order, &staged.customer_id) {
            session.state = CheckoutState::Blocked;
            session.blocked_reason = Some(err.response_message());
            return Err(err);
        }

        let init = match self
            .gate
            .payment_init(&order, staged.pricing.total, &staged.email)
        {
            Ok(init) => init,
            Err(err) => {
                session.state = CheckoutState::Blocked;
                session.blocked_reason = Some(err.response_message());
                return Err(err);
            }
        };

        match self.collaborators.payment.initialize(&init).await {
            Ok(response) => match self.gate.redirect_from_response(&response) {
                Ok(authorization_url) => {
                    session.state = CheckoutState::RedirectingToPayment;
                    self.event_sender
                        .send_or_log(Event::PaymentRedirectIssued {
                            session_id,
                            order_id: order.id.clone(),
                        })
                        .await;
                    Ok(SubmitOutcome::RedirectingToPayment {
                        redirect: PaymentRedirect {
                            authorization_url,
                            order_id: order.id,
                            amount: init.amount,
                            email: init.email,
                        },
                    })
                }
                Err(err) => {
                    session.state = CheckoutState::Blocked;
                    session.blocked_reason = Some(err.response_message());
                    Err(err)
                }
            },
            Err(err) => {
                session.state = CheckoutState::Blocked;
                let message = format!(
                    "Your order has been placed. Payment could not be started ({}); you can pay from your orders.",
                    err.response_message()
                );
                session.blocked_reason = Some(message.clone());
                Ok(SubmitOutcome::PaymentPending {
                    order_id: order.id,
                    message,
                })
            }
        }
    }

    /// All submission preconditions, checked without touching the network.
    fn validate_for_submit(
        &self,
        session: &CheckoutSession,
    ) -> Result<(OrderDraft, StagedSubmit), CheckoutError> {
        if session.cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let resolved = session.resolved_address()?;
        session.delivery.ready_for_submit()?;

        let payment_method = session
            .payment_method
            .ok_or_else(|| CheckoutError::field("paymentMethod", FieldErrorKind::Required))?;

        let pricing = session.pricing();
        self.gate
            .check_balance(payment_method, pricing.total, session.wallet_balance)?;

        let order_items: Vec<OrderItemDraft> = session
            .cart
            .lines
            .iter()
            .filter_map(|line| {
                Some(OrderItemDraft {
                    product_id: line.product_id.clone()?,
                    seller_id: line.seller.as_ref()?.id().to_string(),
                    quantity: line.quantity,
                    variant_id: line.variant_id.clone(),
                    unit_price: line.unit_price,
                })
            })
            .collect();
        if order_items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let (address_id, address_fields) = match &resolved {
            ResolvedAddress::Existing(address) => (Some(address.id.clone()), None),
            ResolvedAddress::New(draft) => (None, Some(draft.clone())),
        };

        let active_coupon = session.coupon.active.as_ref();
        let is_dispatch = session.delivery.method == DeliveryMethod::Dispatch;
        let draft = OrderDraft {
            address_id,
            address_fields,
            payment_method,
            order_items,
            coupon_code: active_coupon.map(|c| c.code.clone()),
            coupon_id: active_coupon.and_then(|c| c.coupon_id.clone()),
            batch_id: active_coupon.and_then(|c| c.batch_id.clone()),
            delivery_method: session.delivery.method,
            pickup_center_id: session.delivery.pickup_center_id.clone(),
            delivery_speed: is_dispatch.then_some(session.delivery.delivery_speed),
            shipping_fee: is_dispatch.then_some(session.delivery.shipping_fee),
        };

        let staged = StagedSubmit {
            payment_method,
            delivery_method: session.delivery.method,
            shipping_fee: session.delivery.shipping_fee,
            email: session.customer_email.clone(),
            customer_id: session.customer_id.clone(),
            pricing,
        };

        Ok((draft, staged))
    }

    /// Recomputes the shipping quote for the session's current
    /// configuration. Results are applied only when the configuration key
    /// they were requested under still matches; stale arrivals are dropped.
    pub async fn recompute_shipping(&self, arc: &Arc<Mutex<CheckoutSession>>) {
        let (session_id, key) = {
            let mut session = arc.lock().await;
            if session.closed {
                return;
            }
            match session.quote_key() {
                Some(key) => (session.id, key),
                None => {
                    if session.delivery.method == DeliveryMethod::Dispatch {
                        // Inputs incomplete (unserviceable city or nothing
                        // shippable): fee falls back to zero.
                        session.delivery.clear_quote();
                    }
                    return;
                }
            }
        };

        let request = QuoteRequest {
            buyer_city: key.city,
            items: key.items.clone(),
            method: DeliveryMethod::Dispatch,
            pickup_center_id: None,
            delivery_speed: key.speed,
        };
        let result = self.collaborators.shipping.quote(&request).await;

        let mut session = arc.lock().await;
        if session.closed {
            return;
        }
        let failed = result.is_err();
        let current = session.quote_key();
        if session.delivery.apply_quote(&key, current, result) {
            let event = if failed {
                Event::ShippingQuoteFailed { session_id }
            } else {
                Event::ShippingQuoted {
                    session_id,
                    fee: session.delivery.shipping_fee,
                }
            };
            drop(session);
            self.event_sender.send_or_log(event).await;
        } else {
            info!("discarding stale shipping quote for session {}", session_id);
        }
    }
}
