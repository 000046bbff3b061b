//! Best-effort notification delivery
//!
//! Messages are rendered with `tera`, handed to a [`Notifier`] under a bounded
//! timeout and every attempt is written to the notification log. A failed or
//! timed out delivery never undoes the mutation that triggered it; the caller
//! gets the [`DependencyError`] back as a warning.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tera::{Context, Tera};
use tracing::{info, warn};
use url::Url;

use crate::config::NotificationConfig;
use crate::core::error::{DependencyError, DispatchResult, StorageError};
use crate::core::service::Notifier;
use crate::entities::{
    ContractorAssignment, DeliveryStatus, Notification, NotificationKind, NotificationRecord,
    WorkOrder,
};

const ASSIGNMENT_SUBJECT: &str = "Work order {{ work_order.id }} assigned to you";
const ASSIGNMENT_BODY: &str = "Hello {{ contractor.name }},

work order {{ work_order.id }} ({{ work_order.types | join(sep=\", \") }}) in {{ work_order.area }} \
for {{ work_order.client }} has been assigned to you at a rate of {{ contractor.rate }}.
Requested closing time: {{ work_order.requested_closing_time }}
{% if work_order.remarks %}Remarks: {{ work_order.remarks }}
{% endif %}
Accept or reject: {{ response_url }}
The link expires at {{ expires_at }}.
";

const RESPONSE_SUBJECT: &str = "Work order {{ work_order.id }} {{ decision }}";
const RESPONSE_BODY: &str = "{{ contractor.name }} {{ decision }} work order {{ work_order.id }} \
in {{ work_order.area }}.
{% if remark %}Remark: {{ remark }}
{% endif %}";

/// Notifier that only writes to the log; the default when nothing else is configured
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), DependencyError> {
        info!(
            work_order_id = %notification.work_order_id,
            recipient = %notification.recipient,
            kind = notification.kind.as_str(),
            subject = %notification.subject,
            "notification"
        );
        Ok(())
    }
}

/// Posts notifications as JSON to a webhook
#[cfg(feature = "push")]
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

#[cfg(feature = "push")]
impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[cfg(feature = "push")]
#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), DependencyError> {
        self.client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map(|_| ())
            .map_err(|e| DependencyError::new("webhook notifier", e.to_string()))
    }
}

#[derive(Serialize)]
struct ResponseContext<'a> {
    work_order: &'a WorkOrder,
    contractor: &'a ContractorAssignment,
    decision: &'a str,
    remark: Option<&'a str>,
}

/// Renders, delivers and logs notifications
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
    response_base_url: Url,
    operator_email: String,
    templates: Tera,
    /// Every send, kept for the lifetime of the dispatcher like the
    /// in-memory repository records
    log: RwLock<Vec<NotificationRecord>>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, config: &NotificationConfig) -> DispatchResult<Self> {
        let mut templates = Tera::default();
        templates
            .add_raw_templates(vec![
                ("assignment_subject", ASSIGNMENT_SUBJECT),
                ("assignment_body", ASSIGNMENT_BODY),
                ("response_subject", RESPONSE_SUBJECT),
                ("response_body", RESPONSE_BODY),
            ])
            .map_err(|e| DependencyError::new("notification templates", e.to_string()))?;

        let response_base_url = Url::parse(config.response_base_url.trim())
            .map_err(|e| DependencyError::new("response link", e.to_string()))?;
        if response_base_url.cannot_be_a_base() {
            return Err(DependencyError::new(
                "response link",
                format!("'{}' cannot be a base URL", config.response_base_url),
            )
            .into());
        }

        Ok(Self {
            notifier,
            timeout: config.timeout(),
            response_base_url,
            operator_email: config.operator_email.clone(),
            templates,
            log: RwLock::new(Vec::new()),
        })
    }

    /// Link a contractor follows to accept or reject an assignment
    ///
    /// Path segments and query values are percent-encoded.
    pub fn response_url(
        &self,
        work_order_id: &str,
        contractor_id: &str,
        issued_at: DateTime<Utc>,
    ) -> String {
        let mut url = self.response_base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["work-orders", work_order_id, "respond"]);
        }
        url.query_pairs_mut()
            .append_pair("contractor_id", contractor_id)
            .append_pair("issued_at", &issued_at.timestamp().to_string());
        url.into()
    }

    fn render(&self, name: &str, context: &Context) -> Result<String, DependencyError> {
        self.templates
            .render(name, context)
            .map_err(|e| DependencyError::new("notification templates", e.to_string()))
    }

    /// Message asking the assigned contractor to accept or reject
    pub fn assignment_request(
        &self,
        work_order: &WorkOrder,
        contractor: &ContractorAssignment,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Notification, DependencyError> {
        let mut context = Context::new();
        context.insert("work_order", work_order);
        context.insert("contractor", contractor);
        context.insert(
            "response_url",
            &self.response_url(&work_order.id, &contractor.id, issued_at),
        );
        context.insert("expires_at", &expires_at.to_rfc3339());

        Ok(Notification {
            work_order_id: work_order.id.clone(),
            kind: NotificationKind::AssignmentRequest,
            recipient: contractor.email.clone(),
            subject: self.render("assignment_subject", &context)?,
            body: self.render("assignment_body", &context)?,
        })
    }

    /// Message telling the operator how the contractor answered
    pub fn response_recorded(
        &self,
        work_order: &WorkOrder,
        contractor: &ContractorAssignment,
        accepted: bool,
        remark: Option<&str>,
    ) -> Result<Notification, DependencyError> {
        let context = Context::from_serialize(ResponseContext {
            work_order,
            contractor,
            decision: if accepted { "accepted" } else { "rejected" },
            remark,
        })
        .map_err(|e| DependencyError::new("notification templates", e.to_string()))?;

        Ok(Notification {
            work_order_id: work_order.id.clone(),
            kind: NotificationKind::ResponseRecorded,
            recipient: self.operator_email.clone(),
            subject: self.render("response_subject", &context)?,
            body: self.render("response_body", &context)?,
        })
    }

    /// Send with a bounded timeout and log the outcome
    pub async fn deliver(&self, notification: &Notification) -> Result<(), DependencyError> {
        let (status, outcome) =
            match tokio::time::timeout(self.timeout, self.notifier.send(notification)).await {
                Ok(Ok(())) => (DeliveryStatus::Sent, Ok(())),
                Ok(Err(e)) => (
                    DeliveryStatus::Failed {
                        reason: e.message.clone(),
                    },
                    Err(e),
                ),
                Err(_) => (
                    DeliveryStatus::TimedOut,
                    Err(DependencyError::new(
                        "notifier",
                        format!("no answer within {} ms", self.timeout.as_millis()),
                    )),
                ),
            };

        if let Err(e) = &outcome {
            warn!(
                work_order_id = %notification.work_order_id,
                recipient = %notification.recipient,
                error = %e,
                "notification not delivered"
            );
        }
        self.record(NotificationRecord::new(notification, status));
        outcome
    }

    fn record(&self, record: NotificationRecord) {
        match self.log.write() {
            Ok(mut log) => log.push(record),
            Err(_) => warn!(
                work_order_id = %record.work_order_id,
                "notification log lock poisoned; record dropped"
            ),
        }
    }

    /// Delivery attempts for one work order, oldest first
    pub fn log_for(&self, work_order_id: &str) -> DispatchResult<Vec<NotificationRecord>> {
        let log = self
            .log
            .read()
            .map_err(|_| StorageError::poisoned("notification log"))?;
        Ok(log
            .iter()
            .filter(|r| r.work_order_id == work_order_id)
            .cloned()
            .collect())
    }
}
