//! Catalog reference data: work order types and areas

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use crate::core::validation::validators::not_blank;

/// Which catalog a [`CatalogEntry`] belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    Type,
    Area,
}

impl CatalogKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CatalogKind::Type => "work_order_type",
            CatalogKind::Area => "work_order_area",
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CatalogStatus {
    #[default]
    Active,
    Inactive,
}

impl CatalogStatus {
    pub fn is_active(self) -> bool {
        self == CatalogStatus::Active
    }
}

/// A work order type or area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: Uuid,
    pub kind: CatalogKind,
    pub name: String,
    pub status: CatalogStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogEntry {
    pub fn new(kind: CatalogKind, name: impl Into<String>, status: CatalogStatus) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            name: name.into().trim().to_string(),
            status,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Payload for creating a type or area
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCatalogEntry {
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[serde(default)]
    pub status: CatalogStatus,
}

/// Fields an operator may change on an existing entry
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CatalogPatch {
    #[validate(custom(function = "not_blank"))]
    pub name: Option<String>,
    pub status: Option<CatalogStatus>,
}

impl CatalogPatch {
    pub fn apply(self, entry: &mut CatalogEntry) {
        if let Some(name) = self.name {
            entry.name = name.trim().to_string();
        }
        if let Some(status) = self.status {
            entry.status = status;
        }
        entry.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_trims_name() {
        let entry = CatalogEntry::new(CatalogKind::Type, "  cleaning ", CatalogStatus::Active);
        assert_eq!(entry.name, "cleaning");
        assert!(entry.status.is_active());
    }

    #[test]
    fn test_blank_name_rejected() {
        let payload = NewCatalogEntry {
            name: "   ".to_string(),
            status: CatalogStatus::Active,
        };
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
    }

    #[test]
    fn test_patch_keeps_unset_fields() {
        let mut entry = CatalogEntry::new(CatalogKind::Area, "north", CatalogStatus::Active);
        CatalogPatch {
            name: None,
            status: Some(CatalogStatus::Inactive),
        }
        .apply(&mut entry);
        assert_eq!(entry.name, "north");
        assert_eq!(entry.status, CatalogStatus::Inactive);
    }

    #[test]
    fn test_status_serializes_capitalized() {
        assert_eq!(
            serde_json::to_value(CatalogStatus::Inactive).unwrap(),
            "Inactive"
        );
    }
}
