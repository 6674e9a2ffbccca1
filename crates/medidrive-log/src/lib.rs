//! # medidrive-log
//!
//! Memory layer for vehicle service logs.
//!
//! This crate provides:
//! - `ServiceLogRecord`, `DraftFields` and `PartialDraft` (the record model)
//! - per-field validators composed into a `ValidationReport`
//! - `LogStore` (canonical in-memory, insertion-ordered state)
//! - `LogFilter` search/filter projection
//! - `StateStorage` backends for best-effort local persistence
//!
//! It intentionally does not own timers or notifications. Those concerns
//! live in `medidrive-autosave` and `medidrive-ux`.
//!
//! ## Data model
//!
//! ```text
//! StateStorage (key -> versioned JSON envelope)
//!     ↕  load / save
//! LogStore (ordered records)  ──filter──▶  views
//! ```

pub mod filter;
pub mod record;
pub mod storage;
pub mod store;
pub mod validation;

pub use filter::{LogFilter, filter_logs};
pub use record::{
    DATE_FORMAT, DraftFields, PartialDraft, ServiceLogRecord, ServiceType, next_day, parse_date,
};
pub use storage::{
    AUTOSAVE_KEY, FileStorage, LOGS_KEY, MemoryStorage, STATE_VERSION, StateStorage,
    StorageError, decode_autosave, decode_logs, encode_autosave, encode_logs, load_autosave,
    load_logs, save_autosave, save_logs,
};
pub use store::{Clock, LogStore, MutationOutcome};
pub use validation::{FieldCheck, ValidationReport, validate_fields};
