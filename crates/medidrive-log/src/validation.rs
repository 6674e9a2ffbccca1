//! Field-level validation for draft fields.
//!
//! Each field has one validator returning a [`FieldCheck`]; the record-level
//! validator composes them into a [`ValidationReport`] keyed by wire field
//! name. Message text is for display only.

use crate::record::{DraftFields, ServiceType, parse_date};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const FIELD_PROVIDER_ID: &str = "providerId";
pub const FIELD_SERVICE_ORDER: &str = "serviceOrder";
pub const FIELD_CAR_ID: &str = "carId";
pub const FIELD_ODOMETER: &str = "odometer";
pub const FIELD_ENGINE_HOURS: &str = "engineHours";
pub const FIELD_START_DATE: &str = "startDate";
pub const FIELD_END_DATE: &str = "endDate";
pub const FIELD_TYPE: &str = "type";
pub const FIELD_SERVICE_DESCRIPTION: &str = "serviceDescription";

/// Outcome of one field validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCheck {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FieldCheck {
    pub fn ok() -> Self {
        Self {
            valid: true,
            message: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
        }
    }
}

pub fn check_required(value: &str, message: &str) -> FieldCheck {
    if value.trim().is_empty() {
        FieldCheck::fail(message)
    } else {
        FieldCheck::ok()
    }
}

pub fn check_non_negative(value: f64) -> FieldCheck {
    if !value.is_finite() {
        FieldCheck::fail("Must be a number")
    } else if value < 0.0 {
        FieldCheck::fail("Must be ≥ 0")
    } else {
        FieldCheck::ok()
    }
}

pub fn check_date(value: &str, required_message: &str) -> FieldCheck {
    let required = check_required(value, required_message);
    if !required.valid {
        return required;
    }
    match parse_date(value) {
        Some(_) => FieldCheck::ok(),
        None => FieldCheck::fail("Must be a date (YYYY-MM-DD)"),
    }
}

/// Validate a raw service type value coming from text input.
pub fn check_service_type(raw: &str) -> FieldCheck {
    if raw.trim().is_empty() {
        return FieldCheck::fail("Type is required");
    }
    match ServiceType::parse(raw) {
        Some(_) => FieldCheck::ok(),
        None => FieldCheck::fail("Invalid type"),
    }
}

/// Field errors for one draft, keyed by wire field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("invalid service log ({})", summarize(.errors))]
pub struct ValidationReport {
    errors: BTreeMap<String, String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Error message for `field`, if it failed.
    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Failed field names in deterministic order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `field: message` pairs joined by commas.
    pub fn summary(&self) -> String {
        summarize(&self.errors)
    }

    fn record(&mut self, field: &str, check: FieldCheck) {
        if !check.valid {
            let message = check.message.unwrap_or_else(|| "Invalid value".to_string());
            self.errors.insert(field.to_string(), message);
        }
    }
}

fn summarize(errors: &BTreeMap<String, String>) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Run every field validator over `fields`.
pub fn validate_fields(fields: &DraftFields) -> ValidationReport {
    let mut report = ValidationReport::default();
    report.record(
        FIELD_PROVIDER_ID,
        check_required(&fields.provider_id, "Provider ID is required"),
    );
    report.record(
        FIELD_SERVICE_ORDER,
        check_required(&fields.service_order, "Service order is required"),
    );
    report.record(
        FIELD_CAR_ID,
        check_required(&fields.car_id, "Car ID is required"),
    );
    report.record(FIELD_ODOMETER, check_non_negative(fields.odometer));
    report.record(FIELD_ENGINE_HOURS, check_non_negative(fields.engine_hours));
    report.record(
        FIELD_START_DATE,
        check_date(&fields.start_date, "Start date is required"),
    );
    report.record(
        FIELD_END_DATE,
        check_date(&fields.end_date, "End date is required"),
    );
    report.record(
        FIELD_SERVICE_DESCRIPTION,
        check_required(
            &fields.service_description,
            "Service description is required",
        ),
    );
    report
}
