//! Autosave controller: debounced capture of create-form edits into one
//! autosave slot.

use crate::debounce::{DebounceError, DebounceTimer};
use crate::form::{FormMode, ServiceLogForm};
use medidrive_log::PartialDraft;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, trace};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(800);

/// Progress signal for the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutosaveStatus {
    Idle,
    Saving,
    Saved,
}

/// Receives slot changes: `Some` on a debounced commit, `None` on clear.
///
/// Commits are delivered on the timer task after the controller's locks are
/// released. Calls are serialized, and a change that was superseded before
/// delivery is skipped.
pub trait AutosaveSink: Send + Sync {
    fn slot_changed(&self, slot: Option<&PartialDraft>);
}

#[derive(Debug, thiserror::Error)]
pub enum AutosaveError {
    #[error(transparent)]
    Debounce(#[from] DebounceError),
}

/// Orders sink deliveries by the revision each slot change was stamped with.
#[derive(Debug, Default)]
struct Publisher {
    next: AtomicU64,
    delivered: Mutex<u64>,
}

impl Publisher {
    fn stamp(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn deliver(
        &self,
        revision: u64,
        sink: &dyn AutosaveSink,
        slot: Option<&PartialDraft>,
    ) -> bool {
        let mut delivered = lock(&self.delivered);
        if *delivered >= revision {
            return false;
        }
        sink.slot_changed(slot);
        *delivered = revision;
        true
    }
}

pub struct AutosaveController {
    debounce: Duration,
    slot: Arc<Mutex<Option<PartialDraft>>>,
    timer: DebounceTimer,
    status: Arc<watch::Sender<AutosaveStatus>>,
    /// Status before the pending window started.
    settled: AutosaveStatus,
    sink: Arc<dyn AutosaveSink>,
    publisher: Arc<Publisher>,
    closed: bool,
}

impl std::fmt::Debug for AutosaveController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutosaveController")
            .field("debounce", &self.debounce)
            .field("slot", &*lock(&self.slot))
            .field("status", &*self.status.borrow())
            .field("closed", &self.closed)
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl AutosaveController {
    /// Controller bound to the current tokio runtime.
    pub fn new(debounce: Duration, sink: Arc<dyn AutosaveSink>) -> Result<Self, AutosaveError> {
        let (status, _) = watch::channel(AutosaveStatus::Idle);
        Ok(Self {
            debounce,
            slot: Arc::new(Mutex::new(None)),
            timer: DebounceTimer::new()?,
            status: Arc::new(status),
            settled: AutosaveStatus::Idle,
            sink,
            publisher: Arc::new(Publisher::default()),
            closed: false,
        })
    }

    /// Seed the slot with previously persisted state. The sink is not
    /// notified.
    pub fn restore(&mut self, slot: Option<PartialDraft>) {
        *lock(&self.slot) = slot;
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Current slot contents.
    pub fn slot(&self) -> Option<PartialDraft> {
        lock(&self.slot).clone()
    }

    pub fn status(&self) -> AutosaveStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<AutosaveStatus> {
        self.status.subscribe()
    }

    pub fn is_pending(&self) -> bool {
        self.timer.is_armed()
    }

    /// Notify the controller that `form` changed.
    ///
    /// Only dirty create forms are captured. Each accepted notification
    /// restarts the debounce window; when it elapses uninterrupted the form
    /// snapshot taken here overwrites the slot. A create form that is clean
    /// again withdraws the pending commit. Returns whether a commit was
    /// scheduled.
    pub fn notify_edit(&mut self, form: &ServiceLogForm) -> bool {
        if self.closed || form.mode() == FormMode::Edit {
            return false;
        }
        if !form.is_dirty() {
            self.withdraw();
            return false;
        }
        self.schedule(form.snapshot());
        true
    }

    /// Restart the debounce window with `snapshot` as the pending commit.
    pub fn schedule(&mut self, snapshot: PartialDraft) {
        if self.closed {
            return;
        }
        let current = *self.status.borrow();
        if current != AutosaveStatus::Saving {
            self.settled = current;
        }
        self.status.send_replace(AutosaveStatus::Saving);

        let slot = Arc::clone(&self.slot);
        let sink = Arc::clone(&self.sink);
        let status = Arc::clone(&self.status);
        let publisher = Arc::clone(&self.publisher);
        self.timer.arm_then(self.debounce, move || {
            *lock(&slot) = Some(snapshot.clone());
            let revision = publisher.stamp();
            status.send_replace(AutosaveStatus::Saved);
            debug!(revision, "autosave slot committed");
            move || {
                if !publisher.deliver(revision, sink.as_ref(), Some(&snapshot)) {
                    trace!(revision, "superseded autosave commit not delivered");
                }
            }
        });
    }

    /// Cancel the pending commit, if any, and fall back to the status from
    /// before its window started.
    fn withdraw(&mut self) {
        if !self.timer.is_armed() {
            return;
        }
        self.timer.cancel();
        let current = *self.status.borrow();
        if current == AutosaveStatus::Saving {
            self.status.send_replace(self.settled);
        }
        trace!("pending autosave withdrawn");
    }

    /// Discard the slot and cancel any pending commit. Idempotent.
    pub fn clear(&mut self) {
        self.timer.cancel();
        let had_slot = lock(&self.slot).take().is_some();
        let revision = self.publisher.stamp();
        self.publisher.deliver(revision, self.sink.as_ref(), None);
        self.status.send_replace(AutosaveStatus::Idle);
        trace!(had_slot, "autosave slot cleared");
    }

    /// Cancel any pending commit and stop accepting edits. The slot is kept
    /// so it can be restored later.
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.timer.cancel();
        self.closed = true;
        debug!("autosave controller shut down");
    }
}

impl Drop for AutosaveController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
