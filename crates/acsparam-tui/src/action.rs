//! UI actions. Every state change goes through one of these.

use acsparam_core::{Task, TaskOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// A one-line status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn info(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Info,
        }
    }

    pub fn success(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Success,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    // ── Lifecycle ──────────────────────────────────────────────────
    Quit,
    Render,
    Resize(u16, u16),

    // ── Search ────────────────────────────────────────────────────
    /// The search text has been quiet for the debounce delay.
    SearchSettled,

    // ── Tasks ─────────────────────────────────────────────────────
    QueueTask(Task),
    TaskFinished(TaskOutcome),

    // ── Chrome ────────────────────────────────────────────────────
    ToggleHelp,
    Notify(Notification),
}
