//! Outgoing notifications and their delivery log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Sent to the contractor when a work order is assigned to them
    AssignmentRequest,
    /// Sent to the work order owner once the contractor answered
    ResponseRecorded,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::AssignmentRequest => "assignment_request",
            NotificationKind::ResponseRecorded => "response_recorded",
        }
    }
}

/// A rendered message ready for a [`Notifier`](crate::core::service::Notifier)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub work_order_id: String,
    pub kind: NotificationKind,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Sent,
    Failed { reason: String },
    TimedOut,
}

/// One delivery attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub work_order_id: String,
    pub recipient: String,
    pub kind: NotificationKind,
    #[serde(flatten)]
    pub status: DeliveryStatus,
    pub at: DateTime<Utc>,
}

impl NotificationRecord {
    pub fn new(notification: &Notification, status: DeliveryStatus) -> Self {
        Self {
            work_order_id: notification.work_order_id.clone(),
            recipient: notification.recipient.clone(),
            kind: notification.kind,
            status,
            at: Utc::now(),
        }
    }
}
