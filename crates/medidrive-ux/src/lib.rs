//! Session layer for the service-log pages.
//!
//! Composes the log store, create-form autosave and toast slot from
//! `medidrive-log` and `medidrive-autosave` into one [`LogsSession`] that a
//! rendering layer drives. Configuration and logging setup live here too.

pub mod config;
pub mod logging;
pub mod session;
pub mod toast;

pub use config::{
    AppConfig, AutosaveConfig, ConfigError, LoggingConfig, StorageConfig, ToastConfig,
};
pub use session::{
    LogsSession, MSG_DRAFT_CONFIRMED, MSG_DRAFT_CREATED, MSG_DRAFTS_REMOVED, MSG_LOG_CREATED,
    MSG_LOG_DELETED, MSG_LOG_UPDATED, SessionError, Today,
};
pub use toast::{Notifier, Severity, ToastState};
