//! Service-log form state: current values, dirty tracking and the derived
//! end-date rule.

use chrono::NaiveDate;
use medidrive_log::{DraftFields, PartialDraft, ServiceLogRecord, ServiceType, next_day};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::trace;

/// Whether the form creates a new log or edits an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormMode {
    Create,
    Edit,
}

/// Form field identifiers, named after the wire fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    ProviderId,
    ServiceOrder,
    CarId,
    Odometer,
    EngineHours,
    StartDate,
    EndDate,
    ServiceType,
    ServiceDescription,
}

impl FormField {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormField::ProviderId => "providerId",
            FormField::ServiceOrder => "serviceOrder",
            FormField::CarId => "carId",
            FormField::Odometer => "odometer",
            FormField::EngineHours => "engineHours",
            FormField::StartDate => "startDate",
            FormField::EndDate => "endDate",
            FormField::ServiceType => "type",
            FormField::ServiceDescription => "serviceDescription",
        }
    }
}

/// One user edit to one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEdit {
    ProviderId(String),
    ServiceOrder(String),
    CarId(String),
    Odometer(f64),
    EngineHours(f64),
    StartDate(String),
    EndDate(String),
    ServiceType(ServiceType),
    ServiceDescription(String),
}

impl FieldEdit {
    pub fn field(&self) -> FormField {
        match self {
            FieldEdit::ProviderId(_) => FormField::ProviderId,
            FieldEdit::ServiceOrder(_) => FormField::ServiceOrder,
            FieldEdit::CarId(_) => FormField::CarId,
            FieldEdit::Odometer(_) => FormField::Odometer,
            FieldEdit::EngineHours(_) => FormField::EngineHours,
            FieldEdit::StartDate(_) => FormField::StartDate,
            FieldEdit::EndDate(_) => FormField::EndDate,
            FieldEdit::ServiceType(_) => FormField::ServiceType,
            FieldEdit::ServiceDescription(_) => FormField::ServiceDescription,
        }
    }
}

/// In-progress form values.
///
/// Dirty state is tracked per field against the baseline the form was
/// opened (or last reset) with. Derived updates never mark a field dirty.
#[derive(Debug, Clone)]
pub struct ServiceLogForm {
    mode: FormMode,
    defaults: DraftFields,
    baseline: DraftFields,
    values: DraftFields,
    dirty: BTreeSet<FormField>,
    start_date_initialized: bool,
}

impl ServiceLogForm {
    /// Open a create form anchored at `today`, restoring `restored` (the
    /// autosave slot) over the defaults when present.
    pub fn create(today: NaiveDate, restored: Option<&PartialDraft>) -> Self {
        let defaults = DraftFields::defaults_for(today);
        let initial = match restored {
            Some(partial) => defaults.clone().merged(partial),
            None => defaults.clone(),
        };
        Self::open(FormMode::Create, defaults, initial)
    }

    /// Open an edit form over an existing record.
    pub fn edit(today: NaiveDate, record: &ServiceLogRecord) -> Self {
        Self::open(
            FormMode::Edit,
            DraftFields::defaults_for(today),
            record.fields.clone(),
        )
    }

    fn open(mode: FormMode, defaults: DraftFields, initial: DraftFields) -> Self {
        let mut form = Self {
            mode,
            baseline: defaults.clone(),
            values: defaults.clone(),
            defaults,
            dirty: BTreeSet::new(),
            start_date_initialized: false,
        };
        form.load(initial);
        form
    }

    /// Replace values and baseline wholesale, as on first load or when
    /// persisted state arrives after the form was opened. Loading never
    /// derives the end date.
    pub fn load(&mut self, values: DraftFields) {
        self.baseline = values.clone();
        self.values = values;
        self.dirty.clear();
        self.start_date_initialized = true;
    }

    /// [`Self::load`] with `partial` merged over the current values.
    pub fn hydrate(&mut self, partial: &PartialDraft) {
        let merged = self.values.clone().merged(partial);
        self.load(merged);
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn values(&self) -> &DraftFields {
        &self.values
    }

    /// Full snapshot in autosave-slot shape.
    pub fn snapshot(&self) -> PartialDraft {
        PartialDraft::from(&self.values)
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn is_field_dirty(&self, field: FormField) -> bool {
        self.dirty.contains(&field)
    }

    /// Apply one user edit.
    ///
    /// A start-date edit also sets `endDate = startDate + 1 day`, replacing
    /// any manual end date. The derived end date does not count as a user
    /// edit for dirty tracking.
    pub fn set_field(&mut self, edit: FieldEdit) {
        let field = edit.field();
        match edit {
            FieldEdit::ProviderId(value) => self.values.provider_id = value,
            FieldEdit::ServiceOrder(value) => self.values.service_order = value,
            FieldEdit::CarId(value) => self.values.car_id = value,
            FieldEdit::Odometer(value) => self.values.odometer = value,
            FieldEdit::EngineHours(value) => self.values.engine_hours = value,
            FieldEdit::StartDate(value) => self.values.start_date = value,
            FieldEdit::EndDate(value) => self.values.end_date = value,
            FieldEdit::ServiceType(value) => self.values.service_type = value,
            FieldEdit::ServiceDescription(value) => self.values.service_description = value,
        }
        self.refresh_dirty(field);

        if field == FormField::StartDate && self.start_date_initialized {
            self.derive_end_date();
        }
    }

    /// Restore the defaults and forget every edit.
    pub fn reset(&mut self) {
        self.values = self.defaults.clone();
        self.baseline = self.defaults.clone();
        self.dirty.clear();
    }

    fn derive_end_date(&mut self) {
        if let Some(end) = next_day(&self.values.start_date) {
            trace!(start = %self.values.start_date, end = %end, "end date derived");
            self.values.end_date = end;
            // A derived value can settle a manual end-date edit, never create one.
            if !self.differs_from_baseline(FormField::EndDate) {
                self.dirty.remove(&FormField::EndDate);
            }
        }
    }

    fn refresh_dirty(&mut self, field: FormField) {
        if self.differs_from_baseline(field) {
            self.dirty.insert(field);
        } else {
            self.dirty.remove(&field);
        }
    }

    fn differs_from_baseline(&self, field: FormField) -> bool {
        let (now, base) = (&self.values, &self.baseline);
        match field {
            FormField::ProviderId => now.provider_id != base.provider_id,
            FormField::ServiceOrder => now.service_order != base.service_order,
            FormField::CarId => now.car_id != base.car_id,
            FormField::Odometer => now.odometer != base.odometer,
            FormField::EngineHours => now.engine_hours != base.engine_hours,
            FormField::StartDate => now.start_date != base.start_date,
            FormField::EndDate => now.end_date != base.end_date,
            FormField::ServiceType => now.service_type != base.service_type,
            FormField::ServiceDescription => now.service_description != base.service_description,
        }
    }
}
