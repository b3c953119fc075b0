//! Domain events.
//!
//! Events produced by the order workflow are enqueued into the transactional
//! outbox (same transaction as the write that produced them) and drained
//! after commit by the outbox worker, which dispatches them to an in-process
//! channel. The channel consumer materializes notifications; its failures
//! are logged and swallowed so they can never affect the producing
//! transaction.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::entities::order::OrderStatus;
use crate::services::notifications::NotificationDispatcher;

pub mod outbox;

/// The events the workflow can emit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// A new order was created for a vendor (one per vendor sub-order).
    OrderPlaced {
        order_id: Uuid,
        order_number: String,
        client_id: Uuid,
        vendor_id: Uuid,
        total_amount: Decimal,
    },
    /// An order moved to a new status.
    OrderStatusChanged {
        order_id: Uuid,
        order_number: String,
        client_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
    /// A stock decrement crossed a product's alert or critical threshold.
    LowStockAlert {
        product_id: Uuid,
        product_name: String,
        vendor_id: Uuid,
        stock_on_hand: i32,
        critical: bool,
    },
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::OrderPlaced { .. } => "OrderPlaced",
            Event::OrderStatusChanged { .. } => "OrderStatusChanged",
            Event::LowStockAlert { .. } => "LowStockAlert",
        }
    }

    /// (aggregate type, aggregate id) for the outbox row.
    pub fn aggregate(&self) -> (&'static str, Option<Uuid>) {
        match self {
            Event::OrderPlaced { order_id, .. } => ("order", Some(*order_id)),
            Event::OrderStatusChanged { order_id, .. } => ("order", Some(*order_id)),
            Event::LowStockAlert { product_id, .. } => ("product", Some(*product_id)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Consumes drained events and materializes notifications. Runs until the
/// channel closes. Dispatch failures are logged, never propagated.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>, dispatcher: NotificationDispatcher) {
    while let Some(event) = receiver.recv().await {
        if let Err(e) = dispatcher.dispatch(&event).await {
            warn!(event_type = event.event_type(), error = %e, "notification dispatch failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_names() {
        let event = Event::LowStockAlert {
            product_id: Uuid::new_v4(),
            product_name: "Arabica beans".into(),
            vendor_id: Uuid::new_v4(),
            stock_on_hand: 2,
            critical: true,
        };
        assert_eq!(event.event_type(), "LowStockAlert");
        assert_eq!(event.aggregate().0, "product");
    }

    #[test]
    fn events_round_trip_through_json() {
        let event = Event::OrderStatusChanged {
            order_id: Uuid::new_v4(),
            order_number: "ORD-TEST01".into(),
            client_id: Uuid::new_v4(),
            old_status: OrderStatus::Preparing,
            new_status: OrderStatus::Delivered,
        };
        let payload = serde_json::to_value(&event).unwrap();
        let back: Event = serde_json::from_value(payload).unwrap();
        match back {
            Event::OrderStatusChanged { new_status, .. } => {
                assert_eq!(new_status, OrderStatus::Delivered)
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
