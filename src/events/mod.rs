use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the checkout and order services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated(Uuid),
    /// Lazy sweeper promoted these orders to delivered during a listing
    OrdersDelivered {
        order_ids: Vec<Uuid>,
    },
    CheckoutSessionCreated {
        session_id: String,
    },
    /// A verified completion webhook materialized (or re-observed) an order
    PaymentSessionReconciled {
        session_id: String,
        order_id: Uuid,
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

    /// Sends an event asynchronously. Event delivery is best-effort; callers
    /// log and continue on failure.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Background task draining the event channel. Events are currently only
/// logged; a broker integration would hang off this loop.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderCreated(order_id) => {
                info!(order_id = %order_id, "event: order created");
            }
            Event::OrdersDelivered { order_ids } => {
                info!(count = order_ids.len(), "event: orders delivered");
            }
            Event::CheckoutSessionCreated { session_id } => {
                info!(session_id = %session_id, "event: checkout session created");
            }
            Event::PaymentSessionReconciled {
                session_id,
                order_id,
            } => {
                info!(session_id = %session_id, order_id = %order_id, "event: payment session reconciled");
            }
        }
    }
    warn!("event channel closed; processor exiting");
}
