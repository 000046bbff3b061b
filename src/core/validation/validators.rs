//! Reusable field validators
//!
//! Plugged into `#[validate(custom(function = ...))]` on payload types, plus
//! the date parser shared by the filter query.

use chrono::NaiveDate;
use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;
use validator::ValidationError;

use crate::core::error::{DispatchError, DispatchResult};

/// `DDMMYYYY`, then `P` (root) or `W` (child), then a 6 digit serial
pub const WORK_ORDER_ID_PATTERN: &str = r"^\d{8}[PW]\d{6}$";

/// Date format accepted by the filter range
pub const DATE_FORMAT: &str = "%Y-%m-%d";

fn id_regex() -> Option<&'static Regex> {
    static ID_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    ID_REGEX
        .get_or_init(|| Regex::new(WORK_ORDER_ID_PATTERN).ok())
        .as_ref()
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Validator: string must contain something besides whitespace
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(error("blank", "must not be blank"))
    } else {
        Ok(())
    }
}

/// Validator: no element of the list may be blank
pub fn non_blank_items(values: &[String]) -> Result<(), ValidationError> {
    if values.iter().any(|v| v.trim().is_empty()) {
        Err(error("blank_item", "entries must not be blank"))
    } else {
        Ok(())
    }
}

pub fn is_work_order_id(value: &str) -> bool {
    id_regex().is_some_and(|re| re.is_match(value))
}

/// Validator: reserved ids must have the generated shape
pub fn work_order_id(value: &str) -> Result<(), ValidationError> {
    if is_work_order_id(value) {
        Ok(())
    } else {
        Err(error(
            "work_order_id",
            "must match DDMMYYYY followed by P or W and a 6 digit serial",
        ))
    }
}

/// Parse a `YYYY-MM-DD` query value, naming the field on failure
pub fn parse_date(field: &str, value: &str) -> DispatchResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        DispatchError::field(
            field,
            format!("must be in {} format (got '{}')", DATE_FORMAT, value),
        )
    })
}
