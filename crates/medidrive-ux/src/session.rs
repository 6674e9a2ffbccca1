//! One application session: the log store, the create-form autosave and the
//! toast slot behind the operations a page issues.

use crate::config::AppConfig;
use crate::toast::{Notifier, Severity, ToastState};
use chrono::{Local, NaiveDate};
use medidrive_autosave::{
    AutosaveController, AutosaveError, AutosaveSink, AutosaveStatus, ServiceLogForm,
};
use medidrive_log::{
    DraftFields, LogFilter, LogStore, MutationOutcome, PartialDraft, ServiceLogRecord,
    StateStorage, ValidationReport, filter_logs, load_autosave, load_logs, save_autosave,
    save_logs, validate_fields,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub const MSG_DRAFT_CREATED: &str = "Draft created";
pub const MSG_LOG_CREATED: &str = "Service log created";
pub const MSG_LOG_UPDATED: &str = "Service log updated";
pub const MSG_DRAFT_CONFIRMED: &str = "Draft confirmed";
pub const MSG_LOG_DELETED: &str = "Service log deleted";
pub const MSG_DRAFTS_REMOVED: &str = "All drafts removed";

/// Source of "today" for new forms.
pub type Today = fn() -> NaiveDate;

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Autosave(#[from] AutosaveError),

    #[error(transparent)]
    Validation(#[from] ValidationReport),
}

/// Best-effort persistence shared by the session and the autosave sink.
///
/// The first load or save failure switches the session to in-memory only;
/// nothing is written after that so a bad backend cannot clobber state.
struct Persistence {
    storage: Arc<dyn StateStorage>,
    degraded: AtomicBool,
}

impl Persistence {
    fn degrade(&self, what: &str, error: &dyn std::fmt::Display) {
        if !self.degraded.swap(true, Ordering::SeqCst) {
            warn!(what, %error, "persistence failed; continuing in memory only");
        }
    }

    fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    fn save_logs(&self, store: &LogStore) {
        if self.is_degraded() {
            return;
        }
        if let Err(error) = save_logs(self.storage.as_ref(), store) {
            self.degrade("save logs", &error);
        }
    }

    fn save_autosave(&self, slot: Option<&PartialDraft>) {
        if self.is_degraded() {
            return;
        }
        if let Err(error) = save_autosave(self.storage.as_ref(), slot) {
            self.degrade("save autosave", &error);
        }
    }
}

struct PersistingSink {
    persistence: Arc<Persistence>,
}

impl AutosaveSink for PersistingSink {
    fn slot_changed(&self, slot: Option<&PartialDraft>) {
        self.persistence.save_autosave(slot);
    }
}

pub struct LogsSession {
    config: AppConfig,
    store: LogStore,
    autosave: AutosaveController,
    notifier: Notifier,
    persistence: Arc<Persistence>,
    today: Today,
}

impl std::fmt::Debug for LogsSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogsSession")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("autosave", &self.autosave)
            .field("notifier", &self.notifier)
            .field("persistent", &self.is_persistent())
            .finish()
    }
}

impl LogsSession {
    /// Open a session over `config.storage_backend()`.
    pub fn from_config(config: AppConfig) -> Result<Self, SessionError> {
        let storage = config.storage_backend();
        Self::open(config, storage)
    }

    /// Hydrate a session from `storage`. Missing state starts empty;
    /// unreadable state starts empty and disables persistence.
    ///
    /// Must be called inside a tokio runtime.
    pub fn open(
        config: AppConfig,
        storage: Arc<dyn StateStorage>,
    ) -> Result<Self, SessionError> {
        let persistence = Arc::new(Persistence {
            storage,
            degraded: AtomicBool::new(false),
        });

        let store = match load_logs(persistence.storage.as_ref()) {
            Ok(store) => store,
            Err(error) => {
                persistence.degrade("load logs", &error);
                LogStore::new()
            }
        };
        let slot = match load_autosave(persistence.storage.as_ref()) {
            Ok(slot) => slot,
            Err(error) => {
                persistence.degrade("load autosave", &error);
                None
            }
        };

        let sink: Arc<dyn AutosaveSink> = Arc::new(PersistingSink {
            persistence: Arc::clone(&persistence),
        });
        let mut autosave = AutosaveController::new(config.debounce(), sink)?;
        autosave.restore(slot);

        info!(
            logs = store.len(),
            restored_autosave = autosave.slot().is_some(),
            persistent = !persistence.is_degraded(),
            "session opened"
        );

        Ok(Self {
            config,
            store,
            autosave,
            notifier: Notifier::new(),
            persistence,
            today: local_today,
        })
    }

    /// Replace the source of "today" used for new forms.
    pub fn with_today(mut self, today: Today) -> Self {
        self.today = today;
        self
    }

    /// Replace the store's timestamp source.
    pub fn with_clock(mut self, clock: medidrive_log::Clock) -> Self {
        self.store = std::mem::take(&mut self.store).with_clock(clock);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &LogStore {
        &self.store
    }

    /// Whether writes still reach the storage backend.
    pub fn is_persistent(&self) -> bool {
        !self.persistence.is_degraded()
    }

    // ── Views ──

    pub fn drafts(&self, filter: &LogFilter) -> Vec<&ServiceLogRecord> {
        filter_logs(self.store.drafts(), filter)
    }

    pub fn confirmed_logs(&self, filter: &LogFilter) -> Vec<&ServiceLogRecord> {
        filter_logs(self.store.confirmed_logs(), filter)
    }

    // ── Create form & autosave ──

    /// Create form restored from the autosave slot, if any.
    pub fn create_form(&self) -> ServiceLogForm {
        ServiceLogForm::create((self.today)(), self.autosave.slot().as_ref())
    }

    /// Edit form over an existing record.
    pub fn edit_form(&self, id: &str) -> Option<ServiceLogForm> {
        self.store
            .get(id)
            .map(|record| ServiceLogForm::edit((self.today)(), record))
    }

    /// Forward a form change to autosave. Returns whether a commit was
    /// scheduled.
    pub fn form_edited(&mut self, form: &ServiceLogForm) -> bool {
        self.autosave.notify_edit(form)
    }

    /// Reset the create form and discard its autosave slot.
    pub fn clear_form(&mut self, form: &mut ServiceLogForm) {
        form.reset();
        self.autosave.clear();
    }

    pub fn autosave_slot(&self) -> Option<PartialDraft> {
        self.autosave.slot()
    }

    pub fn autosave_status(&self) -> AutosaveStatus {
        self.autosave.status()
    }

    pub fn subscribe_autosave(&self) -> watch::Receiver<AutosaveStatus> {
        self.autosave.subscribe()
    }

    // ── Mutations ──

    /// Validate and store `data` as a draft.
    pub fn create_draft(&mut self, data: DraftFields) -> Result<ServiceLogRecord, SessionError> {
        let record = self.add_validated(data, true)?;
        self.notifier.show(MSG_DRAFT_CREATED, Severity::Info);
        Ok(record)
    }

    /// Validate and store `data` as a confirmed log.
    pub fn submit(&mut self, data: DraftFields) -> Result<ServiceLogRecord, SessionError> {
        let record = self.add_validated(data, false)?;
        self.notifier.success(MSG_LOG_CREATED);
        Ok(record)
    }

    fn add_validated(
        &mut self,
        data: DraftFields,
        draft: bool,
    ) -> Result<ServiceLogRecord, SessionError> {
        let report = validate_fields(&data);
        if !report.is_valid() {
            debug!(fields = report.len(), "create rejected by validation");
            return Err(report.into());
        }
        let record = self.store.add_log(data, draft);
        self.persistence.save_logs(&self.store);
        self.autosave.clear();
        Ok(record)
    }

    /// Overwrite an existing record's fields and draft flag.
    pub fn save_edit(
        &mut self,
        id: &str,
        data: DraftFields,
        draft: bool,
    ) -> Result<MutationOutcome, SessionError> {
        let report = validate_fields(&data);
        if !report.is_valid() {
            return Err(report.into());
        }
        let outcome = self.store.save_edit(id, data, draft);
        if outcome.applied() {
            self.persistence.save_logs(&self.store);
            self.notifier.success(MSG_LOG_UPDATED);
        }
        Ok(outcome)
    }

    pub fn confirm_draft(&mut self, id: &str) -> MutationOutcome {
        let outcome = self.store.confirm_draft(id);
        if outcome.applied() {
            self.persistence.save_logs(&self.store);
            self.notifier.success(MSG_DRAFT_CONFIRMED);
        }
        outcome
    }

    pub fn delete_log(&mut self, id: &str) -> MutationOutcome {
        let outcome = self.store.delete_log(id);
        if outcome.applied() {
            self.persistence.save_logs(&self.store);
            self.notifier.show(MSG_LOG_DELETED, Severity::Warning);
        }
        outcome
    }

    /// Remove every draft. Returns how many were removed.
    pub fn remove_all_drafts(&mut self) -> usize {
        let removed = self.store.remove_all_drafts();
        if removed > 0 {
            self.persistence.save_logs(&self.store);
        }
        self.notifier.show(MSG_DRAFTS_REMOVED, Severity::Warning);
        removed
    }

    // ── Toast ──

    pub fn toast(&self) -> &ToastState {
        self.notifier.state()
    }

    pub fn hide_toast(&mut self) {
        self.notifier.hide();
    }

    /// Cancel pending autosave work. The session stays readable.
    pub fn close(&mut self) {
        self.autosave.shutdown();
        debug!("session closed");
    }
}
