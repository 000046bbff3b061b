//! Query string parameters for listing, searching and filtering

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Deserialize;

use crate::core::error::{DispatchError, DispatchResult, ValidationError};
use crate::core::validation::validators::parse_date;
use crate::entities::WorkOrderStatus;

/// `?active=true` on catalog listings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogQuery {
    pub active: Option<bool>,
}

/// `?type=cleaning&child=true` on id generation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerateIdQuery {
    #[serde(rename = "type")]
    pub work_order_type: Option<String>,
    pub child: bool,
}

/// `?query=...` on work order search
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub query: Option<String>,
}

impl SearchQuery {
    /// Trimmed query; empty when absent
    pub fn text(&self) -> &str {
        self.query.as_deref().map(str::trim).unwrap_or_default()
    }
}

/// Query parameters of the date range filter
///
/// # Example
/// ```text
/// GET /work-orders/filter?from=2024-01-01&to=2024-01-31&status=CLOSED
/// GET /work-orders/filter?from=2024-01-01&to=2024-01-31&status=All
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilterQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    /// A status name, or `All` / empty for every status
    pub status: Option<String>,
}

/// A validated filter: inclusive `[from, to]` on `created_at`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub status: Option<WorkOrderStatus>,
}

impl DateRange {
    /// Whole days: `from` at midnight, `to` through the last instant of the day
    pub fn from_dates(
        from: NaiveDate,
        to: NaiveDate,
        status: Option<WorkOrderStatus>,
    ) -> DispatchResult<Self> {
        if from > to {
            return Err(DispatchError::field("from", "must not be after 'to'"));
        }
        let start = Utc.from_utc_datetime(&from.and_time(NaiveTime::MIN));
        let end = match to.succ_opt() {
            Some(next) => {
                Utc.from_utc_datetime(&next.and_time(NaiveTime::MIN)) - chrono::Duration::nanoseconds(1)
            }
            None => DateTime::<Utc>::MAX_UTC,
        };
        Ok(Self {
            from: start,
            to: end,
            status,
        })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at <= self.to
    }
}

impl FilterQuery {
    /// Validate and convert into a [`DateRange`]
    ///
    /// Both bounds are required; the error names the first missing one.
    pub fn range(&self) -> DispatchResult<DateRange> {
        let from = required(&self.from, "from")?;
        let to = required(&self.to, "to")?;
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) if s.eq_ignore_ascii_case("all") => None,
            Some(s) => Some(
                s.parse::<WorkOrderStatus>()
                    .map_err(|msg| DispatchError::field("status", msg))?,
            ),
        };
        DateRange::from_dates(parse_date("from", from)?, parse_date("to", to)?, status)
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> DispatchResult<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::MissingArgument {
            argument: name.to_string(),
        }
        .into()),
    }
}
