//! Internal event system for committed dispatch mutations
//!
//! The EventBus uses `tokio::sync::broadcast` to decouple the engine from
//! whoever wants to observe it (the demo server logs events; tests subscribe
//! to assert on them).
//!
//! ```text
//! LifecycleEngine ──┐
//!                   ├──▶ EventBus::publish() ──▶ broadcast channel ──▶ subscribers
//! CatalogService ───┘
//! ```
//!
//! Events are published only after the mutation is committed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::entities::{CatalogKind, WorkOrderStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogAction {
    Created,
    Updated,
    Deleted,
}

/// A committed change to a work order or the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchEvent {
    WorkOrderCreated {
        work_order_id: String,
        parent_id: Option<String>,
    },
    /// Client, remarks or requested closing time were patched
    WorkOrderUpdated {
        work_order_id: String,
    },
    StatusChanged {
        work_order_id: String,
        from: WorkOrderStatus,
        to: WorkOrderStatus,
    },
    /// Existing unmapped child work orders were attached to a parent
    ChildrenMapped {
        parent_id: String,
        child_ids: Vec<String>,
    },
    /// Auto assignment was switched off for a work order
    AutomationStopped {
        work_order_id: String,
    },
    ContractorAssigned {
        work_order_id: String,
        contractor_id: String,
    },
    CatalogChanged {
        catalog: CatalogKind,
        entry_id: Uuid,
        action: CatalogAction,
    },
}

impl DispatchEvent {
    pub fn event_kind(&self) -> &'static str {
        match self {
            DispatchEvent::WorkOrderCreated { .. } => "work_order_created",
            DispatchEvent::WorkOrderUpdated { .. } => "work_order_updated",
            DispatchEvent::StatusChanged { .. } => "status_changed",
            DispatchEvent::ChildrenMapped { .. } => "children_mapped",
            DispatchEvent::AutomationStopped { .. } => "automation_stopped",
            DispatchEvent::ContractorAssigned { .. } => "contractor_assigned",
            DispatchEvent::CatalogChanged { .. } => "catalog_changed",
        }
    }

    /// Work order this event relates to, if any
    pub fn work_order_id(&self) -> Option<&str> {
        match self {
            DispatchEvent::WorkOrderCreated { work_order_id, .. }
            | DispatchEvent::WorkOrderUpdated { work_order_id }
            | DispatchEvent::StatusChanged { work_order_id, .. }
            | DispatchEvent::AutomationStopped { work_order_id }
            | DispatchEvent::ContractorAssigned { work_order_id, .. } => Some(work_order_id),
            DispatchEvent::ChildrenMapped { parent_id, .. } => Some(parent_id),
            DispatchEvent::CatalogChanged { .. } => None,
        }
    }
}

/// Envelope wrapping an event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: DispatchEvent,
}

impl EventEnvelope {
    pub fn new(event: DispatchEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Broadcast-based event bus
///
/// Cheap to clone and shareable across tasks.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    ///
    /// Slow receivers start losing events (lagged) once `capacity` events are
    /// buffered.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers
    ///
    /// Never fails. Returns the number of receivers that will get the event.
    pub fn publish(&self, event: DispatchEvent) -> usize {
        let envelope = EventEnvelope::new(event);
        // Err only means nobody is subscribed
        self.sender.send(envelope).unwrap_or(0)
    }

    /// Subscribe to events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
