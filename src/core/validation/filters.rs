//! Reusable payload filters
//!
//! Filters run on the raw JSON body before it is deserialized and validated.

use anyhow::Result;
use serde_json::Value;

/// Filter: trim whitespace from a string
pub fn trim() -> impl Fn(&str, Value) -> Result<Value> + Send + Sync + Clone {
    |_: &str, value: Value| {
        if let Some(s) = value.as_str() {
            Ok(Value::String(s.trim().to_string()))
        } else {
            Ok(value)
        }
    }
}

/// Filter: lowercase a string (enum-like fields such as `assignment_type`)
pub fn lowercase() -> impl Fn(&str, Value) -> Result<Value> + Send + Sync + Clone {
    |_: &str, value: Value| {
        if let Some(s) = value.as_str() {
            Ok(Value::String(s.to_lowercase()))
        } else {
            Ok(value)
        }
    }
}

/// Filter: turn empty strings into `null` so optional fields read as absent
pub fn empty_as_null() -> impl Fn(&str, Value) -> Result<Value> + Send + Sync + Clone {
    |_: &str, value: Value| match value.as_str() {
        Some(s) if s.trim().is_empty() => Ok(Value::Null),
        _ => Ok(value),
    }
}

/// Apply the standard filters to the top-level fields of a JSON object
///
/// Strings are trimmed, except `remarks` which is free text. `parent_id` and
/// `id` become `null` when empty. `assignment_type` is lowercased.
pub fn normalize_payload(payload: Value) -> Result<Value> {
    let Value::Object(map) = payload else {
        return Ok(payload);
    };

    let trim = trim();
    let lowercase = lowercase();
    let empty_as_null = empty_as_null();

    let mut out = serde_json::Map::with_capacity(map.len());
    for (field, value) in map {
        let value = match field.as_str() {
            "remarks" => value,
            "id" | "parent_id" => empty_as_null(field.as_str(), trim(field.as_str(), value)?)?,
            "assignment_type" => lowercase(field.as_str(), trim(field.as_str(), value)?)?,
            _ => trim(field.as_str(), value)?,
        };
        out.insert(field, value);
    }
    Ok(Value::Object(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trim_removes_whitespace() {
        let f = trim();
        assert_eq!(f("name", json!("  hello  ")).unwrap(), json!("hello"));
        assert_eq!(f("age", json!(42)).unwrap(), json!(42));
    }

    #[test]
    fn test_empty_as_null() {
        let f = empty_as_null();
        assert_eq!(f("parent_id", json!("  ")).unwrap(), Value::Null);
        assert_eq!(f("parent_id", json!("x")).unwrap(), json!("x"));
    }

    #[test]
    fn test_normalize_payload() {
        let out = normalize_payload(json!({
            "area": " north ",
            "remarks": "  keep spacing ",
            "parent_id": "",
            "assignment_type": " AUTO",
            "types": ["ac"]
        }))
        .unwrap();
        assert_eq!(out["area"], "north");
        assert_eq!(out["remarks"], "  keep spacing ");
        assert_eq!(out["parent_id"], Value::Null);
        assert_eq!(out["assignment_type"], "auto");
        assert_eq!(out["types"], json!(["ac"]));
    }

    #[test]
    fn test_normalize_non_object_passthrough() {
        assert_eq!(normalize_payload(json!([1, 2])).unwrap(), json!([1, 2]));
    }
}
