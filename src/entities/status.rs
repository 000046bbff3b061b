//! Work order status and the exhaustive transition table

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a work order
///
/// `Open` is initial, `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkOrderStatus {
    Open,
    Assigned,
    Accepted,
    Rejected,
    InProgress,
    Closed,
}

/// Caller-driven events that move a work order between statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Assign,
    Accept,
    Reject,
    Reopen,
    Start,
    Close,
}

/// (from, event, to). Anything not listed here is rejected.
const TRANSITIONS: &[(WorkOrderStatus, Transition, WorkOrderStatus)] = {
    use Transition::*;
    use WorkOrderStatus::*;
    &[
        (Open, Assign, Assigned),
        (Open, Close, Closed),
        (Assigned, Accept, Accepted),
        (Assigned, Reject, Rejected),
        (Rejected, Reopen, Open),
        (Accepted, Start, InProgress),
        (InProgress, Close, Closed),
    ]
};

impl WorkOrderStatus {
    pub const ALL: [WorkOrderStatus; 6] = [
        WorkOrderStatus::Open,
        WorkOrderStatus::Assigned,
        WorkOrderStatus::Accepted,
        WorkOrderStatus::Rejected,
        WorkOrderStatus::InProgress,
        WorkOrderStatus::Closed,
    ];

    /// Target status of `transition` from `self`, if the table allows it
    pub fn apply(self, transition: Transition) -> Option<WorkOrderStatus> {
        TRANSITIONS
            .iter()
            .find(|(from, event, _)| *from == self && *event == transition)
            .map(|(_, _, to)| *to)
    }

    pub fn can(self, transition: Transition) -> bool {
        self.apply(transition).is_some()
    }

    pub fn is_terminal(self) -> bool {
        self == WorkOrderStatus::Closed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkOrderStatus::Open => "OPEN",
            WorkOrderStatus::Assigned => "ASSIGNED",
            WorkOrderStatus::Accepted => "ACCEPTED",
            WorkOrderStatus::Rejected => "REJECTED",
            WorkOrderStatus::InProgress => "IN_PROGRESS",
            WorkOrderStatus::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkOrderStatus {
    type Err = String;

    /// Case-insensitive; accepts `in progress`, `in-progress` and `IN_PROGRESS`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        WorkOrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| format!("unknown work order status '{}'", s))
    }
}

impl Transition {
    pub fn as_str(self) -> &'static str {
        match self {
            Transition::Assign => "assign",
            Transition::Accept => "accept",
            Transition::Reject => "reject",
            Transition::Reopen => "reopen",
            Transition::Start => "start",
            Transition::Close => "close",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
