//! Rate composition for work orders with several types

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Total rate of a work order plus the per-type breakdown
///
/// `total` always equals the sum of `by_type`. Equality ignores key order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Rate {
    pub total: f64,
    pub by_type: IndexMap<String, f64>,
}

impl Rate {
    /// Sum of the breakdown; what `total` must equal
    pub fn breakdown_sum(&self) -> f64 {
        canonical_sum(&self.by_type)
    }

    pub fn is_consistent(&self) -> bool {
        self.total == self.breakdown_sum()
    }
}

/// Combine the selected types into a [`Rate`]
///
/// Types missing from `per_type_rate` count as 0, as does anything that is not
/// a finite number (numeric strings are accepted). Negative amounts are kept,
/// so a discount line lowers the total. Duplicate selections are counted once.
/// Rates for types that were not selected are ignored.
pub fn compose<S: AsRef<str>>(selected_types: &[S], per_type_rate: &IndexMap<String, Value>) -> Rate {
    let mut by_type = IndexMap::with_capacity(selected_types.len());
    for ty in selected_types {
        let ty = ty.as_ref().trim();
        if ty.is_empty() || by_type.contains_key(ty) {
            continue;
        }
        let amount = per_type_rate.get(ty).map(numeric).unwrap_or(0.0);
        by_type.insert(ty.to_string(), amount);
    }

    Rate {
        total: canonical_sum(&by_type),
        by_type,
    }
}

/// Sum in type-name order so the selection order cannot change the rounding
fn canonical_sum(by_type: &IndexMap<String, f64>) -> f64 {
    let mut entries: Vec<(&String, &f64)> = by_type.iter().collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
    entries.into_iter().map(|(_, amount)| *amount).sum()
}

fn numeric(value: &Value) -> f64 {
    let amount = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if amount.is_finite() {
        amount
    } else {
        0.0
    }
}
