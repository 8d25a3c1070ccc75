//! Stock event publication
//!
//! Every state transition (create, approve, update, delete, decrement,
//! boxset deduction) emits a named event carrying the affected record.
//! Delivery is fire-and-forget and best-effort: a publish failure is
//! logged and never propagated into the stock mutation that caused it.
//!
//! The publisher is injected through `AppState` so the ledger services
//! have no dependency on a particular transport; tests substitute a
//! recording implementation.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use shared::models::{LedgerEntry, StockUnit};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events emitted by the stock ledger
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StockEvent {
    StockCreated {
        unit: StockUnit,
    },
    StockApproved {
        unit: StockUnit,
    },
    StockUpdated {
        unit: StockUnit,
    },
    StockDeleted {
        unit_id: Uuid,
        branch_code: String,
    },
    StockDecremented {
        branch_code: String,
        po_number: String,
        qty: i32,
        entry: LedgerEntry,
    },
    BoxsetDeducted {
        contract_no: String,
        branch_code: String,
        deducted: usize,
    },
}

impl StockEvent {
    /// Event name as exposed to subscribers
    pub fn name(&self) -> &'static str {
        match self {
            StockEvent::StockCreated { .. } => "stock.created",
            StockEvent::StockApproved { .. } => "stock.approved",
            StockEvent::StockUpdated { .. } => "stock.updated",
            StockEvent::StockDeleted { .. } => "stock.deleted",
            StockEvent::StockDecremented { .. } => "stock.decremented",
            StockEvent::BoxsetDeducted { .. } => "stock.boxset_deducted",
        }
    }
}

/// Transport-agnostic publisher seam
pub trait EventPublisher: Send + Sync {
    /// Publish an event; implementations must not block or fail the caller
    fn publish(&self, event: StockEvent);
}

/// Shared handle used by services and handlers
pub type EventBus = Arc<dyn EventPublisher>;

/// Broadcast-channel publisher; subscribers (websocket fan-out, audit
/// tailers) attach via [`BroadcastPublisher::subscribe`]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<StockEvent>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StockEvent> {
        self.sender.subscribe()
    }
}

impl EventPublisher for BroadcastPublisher {
    fn publish(&self, event: StockEvent) {
        let name = event.name();
        // A send error only means there are currently no subscribers
        if let Err(e) = self.sender.send(event) {
            tracing::debug!(event = name, "no subscribers for event: {}", e);
        } else {
            tracing::debug!(event = name, "event published");
        }
    }
}

/// Publisher that drops everything; used where event fan-out is disabled
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _event: StockEvent) {}
}

/// Publisher that records events in memory for test assertions
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<StockEvent>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<StockEvent> {
        self.events.lock().expect("event lock poisoned").clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.recorded().iter().map(|e| e.name()).collect()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: StockEvent) {
        self.events.lock().expect("event lock poisoned").push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_publisher_captures_in_order() {
        let publisher = RecordingPublisher::new();
        publisher.publish(StockEvent::StockDeleted {
            unit_id: Uuid::nil(),
            branch_code: "B1".into(),
        });
        publisher.publish(StockEvent::BoxsetDeducted {
            contract_no: "C-001".into(),
            branch_code: "B1".into(),
            deducted: 2,
        });
        assert_eq!(
            publisher.names(),
            vec!["stock.deleted", "stock.boxset_deducted"]
        );
    }

    #[test]
    fn broadcast_publisher_without_subscribers_does_not_panic() {
        let publisher = BroadcastPublisher::new(8);
        publisher.publish(StockEvent::StockDeleted {
            unit_id: Uuid::nil(),
            branch_code: "B1".into(),
        });
    }

    #[test]
    fn broadcast_publisher_delivers_to_subscriber() {
        let publisher = BroadcastPublisher::new(8);
        let mut rx = publisher.subscribe();
        publisher.publish(StockEvent::StockDeleted {
            unit_id: Uuid::nil(),
            branch_code: "B7".into(),
        });
        let event = tokio_test::block_on(rx.recv()).expect("event delivered");
        assert_eq!(event.name(), "stock.deleted");
    }

    #[test]
    fn events_are_tagged_for_subscribers() {
        let json = serde_json::to_value(StockEvent::BoxsetDeducted {
            contract_no: "C-001".into(),
            branch_code: "B1".into(),
            deducted: 3,
        })
        .unwrap();
        assert_eq!(json["event"], "boxset_deducted");
        assert_eq!(json["contract_no"], "C-001");
    }
}
