//! Search and filtering over a log collection.
//!
//! Filtering is a pure projection: it borrows the records, never mutates the
//! store, and keeps the input order.

use crate::record::{ServiceLogRecord, ServiceType, parse_date};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Active search/filter parameters for one log list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
    /// Case-insensitive substring over provider, car, service order and
    /// description. Empty matches everything.
    #[serde(default)]
    pub query: String,
    /// Allowed service types. Empty means no restriction.
    #[serde(default)]
    pub types: BTreeSet<ServiceType>,
    /// Inclusive lower bound on `startDate`.
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on `startDate`.
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
}

impl LogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_types(mut self, types: impl IntoIterator<Item = ServiceType>) -> Self {
        self.types = types.into_iter().collect();
        self
    }

    pub fn with_date_from(mut self, date: NaiveDate) -> Self {
        self.date_from = Some(date);
        self
    }

    pub fn with_date_to(mut self, date: NaiveDate) -> Self {
        self.date_to = Some(date);
        self
    }

    /// Whether any predicate narrows the result.
    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
            || !self.types.is_empty()
            || self.date_from.is_some()
            || self.date_to.is_some()
    }

    /// Reset every predicate.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Whether `log` passes all predicates.
    pub fn matches(&self, log: &ServiceLogRecord) -> bool {
        self.matches_query(log) && self.matches_type(log) && self.matches_dates(log)
    }

    fn matches_query(&self, log: &ServiceLogRecord) -> bool {
        if self.query.is_empty() {
            return true;
        }
        let needle = self.query.to_lowercase();
        let fields = &log.fields;
        [
            &fields.provider_id,
            &fields.car_id,
            &fields.service_order,
            &fields.service_description,
        ]
        .iter()
        .any(|haystack| haystack.to_lowercase().contains(&needle))
    }

    fn matches_type(&self, log: &ServiceLogRecord) -> bool {
        self.types.is_empty() || self.types.contains(&log.fields.service_type)
    }

    fn matches_dates(&self, log: &ServiceLogRecord) -> bool {
        if self.date_from.is_none() && self.date_to.is_none() {
            return true;
        }
        // Unparseable start dates cannot be placed in a range.
        let Some(start) = parse_date(&log.fields.start_date) else {
            return false;
        };
        if let Some(from) = self.date_from
            && start < from
        {
            return false;
        }
        if let Some(to) = self.date_to
            && start > to
        {
            return false;
        }
        true
    }
}

/// Records from `logs` that pass `filter`, in input order.
pub fn filter_logs<'a, I>(logs: I, filter: &LogFilter) -> Vec<&'a ServiceLogRecord>
where
    I: IntoIterator<Item = &'a ServiceLogRecord>,
{
    logs.into_iter().filter(|log| filter.matches(log)).collect()
}
