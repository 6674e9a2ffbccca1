//! Single-shot cancellable delayed callback on a tokio runtime.
//!
//! At most one callback is armed per timer. Arming again or cancelling
//! aborts the previous task and bumps a generation counter; a task only
//! fires while holding the gate lock and only if its generation is still
//! current, so a superseded task never fires even if it already woke up.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::trace;

#[derive(Debug, thiserror::Error)]
pub enum DebounceError {
    #[error("debounce timer requires a tokio runtime: {0}")]
    NoRuntime(String),
}

#[derive(Debug)]
pub struct DebounceTimer {
    runtime: Handle,
    gate: Arc<Mutex<u64>>,
    task: Option<JoinHandle<()>>,
}

impl DebounceTimer {
    /// Bind a timer to the current tokio runtime.
    pub fn new() -> Result<Self, DebounceError> {
        let runtime = Handle::try_current().map_err(|e| DebounceError::NoRuntime(e.to_string()))?;
        Ok(Self::with_handle(runtime))
    }

    pub fn with_handle(runtime: Handle) -> Self {
        Self {
            runtime,
            gate: Arc::new(Mutex::new(0)),
            task: None,
        }
    }

    /// Cancel any armed callback, then run `fire` after `delay` unless this
    /// timer is armed again or cancelled first.
    pub fn arm<F>(&mut self, delay: Duration, fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.arm_then(delay, move || {
            fire();
            || {}
        });
    }

    /// [`Self::arm`] in two phases. `fire` runs under the gate, so `cancel`
    /// and `arm` wait for it; the follow-up it returns runs once the gate is
    /// released and may block without holding them up.
    pub fn arm_then<F, G>(&mut self, delay: Duration, fire: F)
    where
        F: FnOnce() -> G + Send + 'static,
        G: FnOnce() + Send + 'static,
    {
        let generation = self.bump();
        if let Some(task) = self.task.take() {
            task.abort();
        }

        let gate = Arc::clone(&self.gate);
        self.task = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let follow_up = {
                let current = match gate.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                if *current != generation {
                    trace!(generation, "superseded debounce tick dropped");
                    return;
                }
                fire()
            };
            follow_up();
        }));
        trace!(generation, delay_ms = delay.as_millis() as u64, "debounce armed");
    }

    /// Cancel the armed callback, if any. Once this returns, no callback
    /// armed before it will fire. Idempotent.
    pub fn cancel(&mut self) {
        self.bump();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Whether a callback is armed and has not run yet.
    pub fn is_armed(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn bump(&self) -> u64 {
        let mut generation = match self.gate.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *generation += 1;
        *generation
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
