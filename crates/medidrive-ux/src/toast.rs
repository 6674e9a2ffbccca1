//! Single-slot transient notifications.

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Success,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// What the rendering layer shows. `message` survives `hide` so a dismiss
/// animation can still render the last text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToastState {
    pub open: bool,
    pub message: String,
    pub severity: Severity,
}

/// Depth-1 toast emitter: a new message replaces the current one.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    state: ToastState,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ToastState {
        &self.state
    }

    pub fn is_visible(&self) -> bool {
        self.state.open
    }

    pub fn show(&mut self, message: impl Into<String>, severity: Severity) {
        let message = message.into();
        debug!(severity = severity.as_str(), %message, "toast shown");
        self.state = ToastState {
            open: true,
            message,
            severity,
        };
    }

    /// [`Self::show`] with the default severity.
    pub fn success(&mut self, message: impl Into<String>) {
        self.show(message, Severity::default());
    }

    pub fn hide(&mut self) {
        self.state.open = false;
    }
}
