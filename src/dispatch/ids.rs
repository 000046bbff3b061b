//! Work order id generation

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::error::{DispatchError, DispatchResult};

/// Serial numbers wrap after this many ids
const SERIAL_SPACE: u64 = 1_000_000;

/// Hands out `DDMMYYYY` + `P`/`W` + 6 digit serial ids
///
/// The serial comes from one atomic counter shared by every caller, so two
/// concurrent calls never see the same value.
#[derive(Debug)]
pub struct IdGenerator {
    sequence: AtomicU64,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Resume after `last_serial` (e.g. after loading existing work orders)
    pub fn starting_at(last_serial: u64) -> Self {
        Self {
            sequence: AtomicU64::new(last_serial),
        }
    }

    /// Next id for a work order created at `at`
    ///
    /// `primary_type` must not be blank; `child` selects the `W` marker.
    pub fn next(&self, primary_type: &str, child: bool, at: DateTime<Utc>) -> DispatchResult<String> {
        if primary_type.trim().is_empty() {
            return Err(DispatchError::field("type", "a work order type is required"));
        }
        let serial = (self.sequence.fetch_add(1, Ordering::Relaxed) + 1) % SERIAL_SPACE;
        Ok(format!(
            "{}{}{:06}",
            at.format("%d%m%Y"),
            if child { 'W' } else { 'P' },
            serial
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validation::validators::is_work_order_id;
    use chrono::TimeZone;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_format() {
        let ids = IdGenerator::new();
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap();
        assert_eq!(ids.next("cleaning", false, at).unwrap(), "15012024P000001");
        assert_eq!(ids.next("cleaning", true, at).unwrap(), "15012024W000002");
        assert!(is_work_order_id(&ids.next("ac", false, Utc::now()).unwrap()));
    }

    #[test]
    fn test_blank_type_rejected() {
        let err = IdGenerator::new().next("  ", false, Utc::now()).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_concurrent_ids_are_distinct() {
        let ids = Arc::new(IdGenerator::new());
        let at = Utc::now();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ids = Arc::clone(&ids);
                std::thread::spawn(move || {
                    (0..250)
                        .map(|_| ids.next("cleaning", false, at).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id");
            }
        }
        assert_eq!(seen.len(), 2000);
    }
}
