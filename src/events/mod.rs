use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Events emitted by the checkout flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    CheckoutStarted {
        session_id: Uuid,
        customer_id: String,
    },
    AddressChanged {
        session_id: Uuid,
    },
    DeliveryChanged {
        session_id: Uuid,
        method: String,
    },
    ShippingQuoted {
        session_id: Uuid,
        fee: Decimal,
    },
    ShippingQuoteFailed {
        session_id: Uuid,
    },
    CouponApplied {
        session_id: Uuid,
        code: String,
        discount: Decimal,
    },
    CouponRemoved {
        session_id: Uuid,
    },
    OrderSubmitted {
        session_id: Uuid,
        order_id: String,
    },
    PaymentRedirectIssued {
        session_id: Uuid,
        order_id: String,
    },
    OrderConfirmed {
        session_id: Uuid,
        order_id: String,
    },
    CheckoutAbandoned {
        session_id: Uuid,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the consumer is gone.
    /// Event delivery is never allowed to fail a checkout operation.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping checkout event: {}", e);
        }
    }
}

/// Consumes checkout events. Downstream fan-out (notifications, analytics)
/// hangs off this loop.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderSubmitted {
                session_id,
                order_id,
            } => {
                info!(%session_id, %order_id, "order submitted");
            }
            Event::OrderConfirmed {
                session_id,
                order_id,
            } => {
                info!(%session_id, %order_id, "order confirmed");
            }
            Event::PaymentRedirectIssued {
                session_id,
                order_id,
            } => {
                info!(%session_id, %order_id, "payment redirect issued");
            }
            other => {
                info!("checkout event: {:?}", other);
            }
        }
    }

    info!("Event processing loop stopped");
}
