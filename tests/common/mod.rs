//! Shared fixtures for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use indexmap::IndexMap;
use serde_json::json;
use std::sync::{Arc, Mutex};

use dispatch::config::AssignmentConfig;
use dispatch::core::error::DependencyError;
use dispatch::entities::{Notification, StandardRate};
use dispatch::prelude::*;

/// Manually advanced time source
#[derive(Clone)]
pub struct TestClock(Arc<Mutex<DateTime<Utc>>>);

impl TestClock {
    pub fn at(at: DateTime<Utc>) -> Self {
        Self(Arc::new(Mutex::new(at)))
    }

    pub fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.0.lock().unwrap() = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }
}

/// Notifier that always fails, as an unreachable mail server would
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _: &Notification) -> Result<(), DependencyError> {
        Err(DependencyError::new("smtp", "connection refused"))
    }
}

/// Notifier that keeps every message it was handed
#[derive(Clone, Default)]
pub struct RecordingNotifier(pub Arc<Mutex<Vec<Notification>>>);

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), DependencyError> {
        self.0.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.0.lock().unwrap().clone()
    }
}

pub fn contractor(id: &str, rate: f64, locations: &str, active: bool) -> Contractor {
    Contractor {
        id: id.to_string(),
        name: format!("Contractor {}", id),
        email: format!("{}@contractors.test", id),
        rate,
        service_locations: locations.to_string(),
        active,
    }
}

/// c-1 and c-2 serve north, c-3 is inactive, c-4 only serves south.
/// Mall One pays c-1 a standard rate of 150 in north.
pub fn directory() -> InMemoryContractorDirectory {
    InMemoryContractorDirectory::new(
        vec![
            contractor("c-1", 300.0, "north", true),
            contractor("c-2", 200.0, "north, harbour", true),
            contractor("c-3", 100.0, "north", false),
            contractor("c-4", 50.0, "south", true),
        ],
        vec![StandardRate {
            contractor_id: "c-1".to_string(),
            client: "Mall One".to_string(),
            area: "north".to_string(),
            rate: 150.0,
        }],
    )
}

pub fn january(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, 9, 0, 0).unwrap()
}

pub struct Harness {
    pub engine: Arc<LifecycleEngine>,
    pub clock: TestClock,
}

pub fn engine_with(notifier: Arc<dyn Notifier>, assignment: AssignmentConfig) -> Harness {
    let clock = TestClock::at(january(15));
    let events = EventBus::new(256);
    let notifications =
        NotificationDispatcher::new(notifier, &dispatch::config::NotificationConfig::default())
            .unwrap();
    let time = clock.clone();
    let engine = LifecycleEngine::new(
        Arc::new(InMemoryWorkOrderRepository::new()),
        CatalogService::new(Arc::new(InMemoryCatalogStore::new()), events.clone()),
        ContractorMatcher::new(Arc::new(directory())),
        notifications,
        events,
        assignment,
    )
    .with_clock(move || time.now());
    Harness {
        engine: Arc::new(engine),
        clock,
    }
}

pub fn harness() -> Harness {
    engine_with(Arc::new(LogNotifier), AssignmentConfig::default())
}

pub fn new_work_order(parent_id: Option<&str>) -> NewWorkOrder {
    let mut rate = IndexMap::new();
    rate.insert("cleaning".to_string(), json!(500));
    rate.insert("ac".to_string(), json!(1200));
    NewWorkOrder {
        id: None,
        types: vec!["cleaning".to_string(), "ac".to_string()],
        area: "north".to_string(),
        client: "Mall One".to_string(),
        assignment_type: AssignmentType::Manual,
        requested_closing_time: Some(january(20)),
        remarks: "lobby and food court".to_string(),
        rate,
        parent_id: parent_id.map(str::to_string),
        opening_images: vec!["blob://opening/1".to_string()],
    }
}

/// Create a `W` work order with no parent, ready to be mapped later
pub async fn unmapped_child(engine: &LifecycleEngine, types: &[&str], area: &str) -> WorkOrder {
    let id = engine.generate_id(types[0], true).await.unwrap();
    let payload = NewWorkOrder {
        id: Some(id),
        types: types.iter().map(|t| t.to_string()).collect(),
        area: area.to_string(),
        ..new_work_order(None)
    };
    engine.create(payload).await.unwrap()
}

pub fn auto_work_order() -> NewWorkOrder {
    NewWorkOrder {
        assignment_type: AssignmentType::Auto,
        ..new_work_order(None)
    }
}

pub fn closing_images() -> Vec<String> {
    vec!["blob://closing/1".to_string()]
}

pub fn accept(contractor_id: &str) -> ContractorResponse {
    ContractorResponse {
        contractor_id: contractor_id.to_string(),
        decision: Decision::Accept,
        remark: None,
        issued_at: None,
    }
}

pub fn reject(contractor_id: &str, remark: &str) -> ContractorResponse {
    ContractorResponse {
        contractor_id: contractor_id.to_string(),
        decision: Decision::Reject,
        remark: Some(remark.to_string()),
        issued_at: None,
    }
}

/// Walk a freshly created (OPEN) work order to `status` through legal transitions
pub async fn drive_to(engine: &LifecycleEngine, id: &str, status: WorkOrderStatus) {
    use WorkOrderStatus::*;
    if status == Open {
        return;
    }
    engine.assign_contractor(id, "c-2").await.unwrap();
    match status {
        Assigned => {}
        Rejected => {
            engine.respond(id, reject("c-2", "busy")).await.unwrap();
        }
        Accepted | InProgress | Closed => {
            engine.respond(id, accept("c-2")).await.unwrap();
            if status != Accepted {
                engine.start(id).await.unwrap();
            }
            if status == Closed {
                engine.close(id, closing_images()).await.unwrap();
            }
        }
        Open => unreachable!(),
    }
    assert_eq!(engine.get(id).await.unwrap().status, status);
}
