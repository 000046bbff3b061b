//! Auto assignment attempts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::contractor::ContractorCandidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    /// Assigned, waiting for the contractor's answer
    Pending,
    Accepted,
    Rejected,
    /// Automation was stopped while the attempt was pending
    Stopped,
}

/// One contractor tried by auto assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentAttempt {
    pub work_order_id: String,
    pub contractor_id: String,
    pub contractor_name: String,
    /// 1-based, in the order the contractors were tried
    pub attempt_number: u32,
    pub status: AttemptStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl AssignmentAttempt {
    pub fn pending(
        work_order_id: &str,
        candidate: &ContractorCandidate,
        attempt_number: u32,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            work_order_id: work_order_id.to_string(),
            contractor_id: candidate.contractor_id.clone(),
            contractor_name: candidate.name.clone(),
            attempt_number,
            status: AttemptStatus::Pending,
            remark: None,
            created_at: at,
            updated_at: None,
        }
    }

    /// Close a pending attempt; settled attempts are left alone
    pub fn settle(&mut self, status: AttemptStatus, remark: Option<String>, at: DateTime<Utc>) {
        if self.status != AttemptStatus::Pending {
            return;
        }
        self.status = status;
        self.remark = remark.filter(|r| !r.trim().is_empty());
        self.updated_at = Some(at);
    }
}

/// Auto assignment state of one work order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutomationStatus {
    pub work_order_id: String,
    pub stopped: bool,
    pub attempts: Vec<AssignmentAttempt>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> ContractorCandidate {
        ContractorCandidate {
            contractor_id: "c-1".to_string(),
            name: "Acme".to_string(),
            email: "acme@example.com".to_string(),
            rate: 100.0,
            service_locations: "north".to_string(),
        }
    }

    #[test]
    fn test_settle_only_touches_pending() {
        let at = Utc::now();
        let mut attempt = AssignmentAttempt::pending("15012024P000001", &candidate(), 1, at);
        attempt.settle(AttemptStatus::Rejected, Some("too far".to_string()), at);
        assert_eq!(attempt.status, AttemptStatus::Rejected);
        assert_eq!(attempt.remark.as_deref(), Some("too far"));

        attempt.settle(AttemptStatus::Stopped, Some("stopped".to_string()), at);
        assert_eq!(attempt.status, AttemptStatus::Rejected);
        assert_eq!(attempt.remark.as_deref(), Some("too far"));
    }

    #[test]
    fn test_attempt_serialization() {
        let attempt = AssignmentAttempt::pending("15012024P000001", &candidate(), 2, Utc::now());
        let json = serde_json::to_value(&attempt).unwrap();
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["attempt_number"], 2);
        assert_eq!(json["contractor_name"], "Acme");
        assert!(json.get("updated_at").is_none());
    }
}
