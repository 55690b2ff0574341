//! Lightweight in-process event bus.
//!
//! Services publish domain events over a bounded mpsc channel; a spawned
//! processor logs them. Publishing is best-effort: a full or closed
//! channel is logged and never fails the originating request.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the service layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    OrderUpdated(Uuid),
    OrderDeleted(Uuid),
    InventoryAdjusted {
        item_id: Uuid,
        old_quantity: i32,
        new_quantity: i32,
        reason: String,
    },
    ExpenseRecorded(Uuid),
    UserCreated(Uuid),
    OrganizationCreated(Uuid),
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
}

/// Drains the event channel for the lifetime of the process.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderCreated(id) => info!(order_id = %id, "event: order created"),
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => info!(
                order_id = %order_id,
                from = %old_status,
                to = %new_status,
                "event: order status changed"
            ),
            Event::OrderUpdated(id) => info!(order_id = %id, "event: order updated"),
            Event::OrderDeleted(id) => info!(order_id = %id, "event: order deleted"),
            Event::InventoryAdjusted {
                item_id,
                old_quantity,
                new_quantity,
                reason,
            } => info!(
                item_id = %item_id,
                old = old_quantity,
                new = new_quantity,
                reason = %reason,
                "event: inventory adjusted"
            ),
            Event::ExpenseRecorded(id) => info!(expense_id = %id, "event: expense recorded"),
            Event::UserCreated(id) => info!(user_id = %id, "event: user created"),
            Event::OrganizationCreated(id) => {
                info!(organization_id = %id, "event: organization created")
            }
        }
    }
    warn!("event channel closed; processor exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_event() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        let id = Uuid::new_v4();
        sender.send(Event::OrderCreated(id)).await.unwrap();

        match rx.recv().await {
            Some(Event::OrderCreated(got)) => assert_eq!(got, id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_fails_gracefully_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        let err = sender.send(Event::OrderDeleted(Uuid::new_v4())).await;
        assert!(err.is_err());
    }
}
