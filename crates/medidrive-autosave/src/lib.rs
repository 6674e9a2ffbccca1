//! # medidrive-autosave
//!
//! In-progress form state and its debounced autosave:
//! - `ServiceLogForm`: values, per-field dirty tracking, derived end date
//! - `DebounceTimer`: single cancellable delayed callback on tokio
//! - `AutosaveController`: captures dirty create-form snapshots into one
//!   autosave slot and reports `idle` / `saving` / `saved`
//!
//! Controllers must be created inside a tokio runtime.

pub mod controller;
pub mod debounce;
pub mod form;

pub use controller::{
    AutosaveController, AutosaveError, AutosaveSink, AutosaveStatus, DEFAULT_DEBOUNCE,
};
pub use debounce::{DebounceError, DebounceTimer};
pub use form::{FieldEdit, FormField, FormMode, ServiceLogForm};
