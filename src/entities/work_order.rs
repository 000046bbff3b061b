//! The work order aggregate and its creation / update payloads

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use validator::Validate;

use super::contractor::ContractorAssignment;
use super::rate::Rate;
use super::status::{Transition, WorkOrderStatus};
use crate::core::validation::validators::{non_blank_items, not_blank, work_order_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentType {
    Auto,
    Manual,
}

/// A unit of requested service work
///
/// Identity fields (`id`, `types`, `area`, `assignment_type`, `parent_id`,
/// `created_at`) never change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: String,
    pub types: Vec<String>,
    pub area: String,
    pub client: String,
    pub status: WorkOrderStatus,
    pub rate: Rate,
    pub requested_closing_time: DateTime<Utc>,
    pub remarks: String,
    pub assignment_type: AssignmentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contractor: Option<ContractorAssignment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub opening_images: Vec<String>,
    pub closing_images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl WorkOrder {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Whether the id carries the `W` marker of a child work order
    ///
    /// Such a work order may exist without a parent until it is mapped.
    pub fn has_child_id(&self) -> bool {
        self.id.chars().nth(8) == Some('W')
    }

    /// Root work orders with a `P` id can take children
    pub fn can_have_children(&self) -> bool {
        self.is_root() && !self.has_child_id()
    }
}

/// Creation payload
///
/// `types` accepts either a JSON array or a comma joined string.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewWorkOrder {
    /// Id reserved earlier through id generation; generated when absent
    #[validate(custom(function = "work_order_id"))]
    #[serde(default)]
    pub id: Option<String>,

    #[validate(
        length(min = 1, message = "at least one type is required"),
        custom(function = "non_blank_items")
    )]
    #[serde(deserialize_with = "types_list")]
    pub types: Vec<String>,

    #[validate(custom(function = "not_blank"))]
    pub area: String,

    #[validate(custom(function = "not_blank"))]
    pub client: String,

    pub assignment_type: AssignmentType,

    #[validate(required(message = "requested closing time is required"))]
    #[serde(default)]
    pub requested_closing_time: Option<DateTime<Utc>>,

    #[validate(custom(function = "not_blank"))]
    pub remarks: String,

    /// Price per selected type; anything non-numeric counts as 0
    #[serde(default)]
    pub rate: IndexMap<String, Value>,

    #[serde(default)]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub opening_images: Vec<String>,
}

impl NewWorkOrder {
    /// Trimmed, de-duplicated type names in selection order
    pub fn normalized_types(&self) -> Vec<String> {
        let mut types: Vec<String> = Vec::with_capacity(self.types.len());
        for ty in &self.types {
            let ty = ty.trim();
            if !ty.is_empty() && !types.iter().any(|t| t == ty) {
                types.push(ty.to_string());
            }
        }
        types
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

fn types_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Types {
        Joined(String),
        List(Vec<String>),
    }

    Ok(match Types::deserialize(deserializer)? {
        Types::Joined(joined) => joined
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        Types::List(list) => list,
    })
}

/// Fields that may change after creation
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct WorkOrderPatch {
    #[validate(custom(function = "not_blank"))]
    pub client: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub remarks: Option<String>,
    pub requested_closing_time: Option<DateTime<Utc>>,
}

impl WorkOrderPatch {
    pub fn is_empty(&self) -> bool {
        self.client.is_none() && self.remarks.is_none() && self.requested_closing_time.is_none()
    }

    pub fn apply(self, work_order: &mut WorkOrder) {
        if let Some(client) = self.client {
            work_order.client = client.trim().to_string();
        }
        if let Some(remarks) = self.remarks {
            work_order.remarks = remarks;
        }
        if let Some(at) = self.requested_closing_time {
            work_order.requested_closing_time = at;
        }
    }
}

/// Body of a child mapping request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MapChildren {
    #[validate(
        length(min = 1, message = "at least one child work order is required"),
        custom(function = "non_blank_items")
    )]
    pub child_ids: Vec<String>,
}

/// One committed status change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEntry {
    pub at: DateTime<Utc>,
    pub transition: Transition,
    pub from: WorkOrderStatus,
    pub to: WorkOrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contractor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

impl LifecycleEntry {
    pub fn new(transition: Transition, from: WorkOrderStatus, to: WorkOrderStatus) -> Self {
        Self {
            at: Utc::now(),
            transition,
            from,
            to,
            contractor: None,
            remark: None,
        }
    }

    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = at;
        self
    }

    pub fn with_contractor(mut self, contractor_id: impl Into<String>) -> Self {
        self.contractor = Some(contractor_id.into());
        self
    }

    pub fn with_remark(mut self, remark: Option<String>) -> Self {
        self.remark = remark.filter(|r| !r.trim().is_empty());
        self
    }
}
