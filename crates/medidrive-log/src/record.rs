//! Service-log record types: the primary entity in medidrive-log.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Calendar date format used for `startDate`/`endDate`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Service classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Planned,
    Unplanned,
    Emergency,
}

impl ServiceType {
    pub const ALL: [ServiceType; 3] = [
        ServiceType::Planned,
        ServiceType::Unplanned,
        ServiceType::Emergency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Planned => "planned",
            ServiceType::Unplanned => "unplanned",
            ServiceType::Emergency => "emergency",
        }
    }

    /// Human-facing label.
    pub fn label(&self) -> &'static str {
        match self {
            ServiceType::Planned => "Planned",
            ServiceType::Unplanned => "Unplanned",
            ServiceType::Emergency => "Emergency",
        }
    }

    /// Parse the wire value. Case and surrounding whitespace are ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
    }
}

impl Display for ServiceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Editable fields of a service log: everything except identity,
/// timestamps and the draft flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftFields {
    pub provider_id: String,
    pub service_order: String,
    pub car_id: String,
    pub odometer: f64,
    pub engine_hours: f64,
    pub start_date: String,
    pub end_date: String,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    pub service_description: String,
}

impl DraftFields {
    /// Blank form values anchored at `today`: zero counters, planned
    /// service, ending the following day.
    pub fn defaults_for(today: NaiveDate) -> Self {
        let start = today.format(DATE_FORMAT).to_string();
        let end = (today + Duration::days(1)).format(DATE_FORMAT).to_string();
        Self {
            provider_id: String::new(),
            service_order: String::new(),
            car_id: String::new(),
            odometer: 0.0,
            engine_hours: 0.0,
            start_date: start,
            end_date: end,
            service_type: ServiceType::Planned,
            service_description: String::new(),
        }
    }

    /// Overlay every field present in `partial`.
    pub fn merged(mut self, partial: &PartialDraft) -> Self {
        if let Some(value) = &partial.provider_id {
            self.provider_id = value.clone();
        }
        if let Some(value) = &partial.service_order {
            self.service_order = value.clone();
        }
        if let Some(value) = &partial.car_id {
            self.car_id = value.clone();
        }
        if let Some(value) = partial.odometer {
            self.odometer = value;
        }
        if let Some(value) = partial.engine_hours {
            self.engine_hours = value;
        }
        if let Some(value) = &partial.start_date {
            self.start_date = value.clone();
        }
        if let Some(value) = &partial.end_date {
            self.end_date = value.clone();
        }
        if let Some(value) = partial.service_type {
            self.service_type = value;
        }
        if let Some(value) = &partial.service_description {
            self.service_description = value.clone();
        }
        self
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        parse_date(&self.start_date)
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        parse_date(&self.end_date)
    }
}

/// A form snapshot where any field may be missing. This is the shape held
/// by the autosave slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_order: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub car_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub odometer: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<ServiceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_description: Option<String>,
}

impl From<&DraftFields> for PartialDraft {
    fn from(fields: &DraftFields) -> Self {
        Self {
            provider_id: Some(fields.provider_id.clone()),
            service_order: Some(fields.service_order.clone()),
            car_id: Some(fields.car_id.clone()),
            odometer: Some(fields.odometer),
            engine_hours: Some(fields.engine_hours),
            start_date: Some(fields.start_date.clone()),
            end_date: Some(fields.end_date.clone()),
            service_type: Some(fields.service_type),
            service_description: Some(fields.service_description.clone()),
        }
    }
}

/// A persisted service log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceLogRecord {
    // ── Identity ──
    pub id: String,

    // ── Content ──
    #[serde(flatten)]
    pub fields: DraftFields,

    // ── Workflow ──
    pub draft: bool,

    // ── Timestamps ──
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceLogRecord {
    pub fn is_draft(&self) -> bool {
        self.draft
    }

    pub fn service_type(&self) -> ServiceType {
        self.fields.service_type
    }
}

/// Parse a `YYYY-MM-DD` date, ignoring any time-of-day suffix
/// (`2024-01-10T08:00:00Z` reads as `2024-01-10`).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let day = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(day, DATE_FORMAT).ok()
}

/// `date + 1 day` in `YYYY-MM-DD`, or `None` if `date` does not parse.
pub fn next_day(date: &str) -> Option<String> {
    parse_date(date)
        .and_then(|day| day.succ_opt())
        .map(|day| day.format(DATE_FORMAT).to_string())
}
