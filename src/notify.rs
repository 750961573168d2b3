//! Notification channel: the one-way sink extensions and the host use to
//! surface operator-visible messages.
//!
//! The host treats the sink as opaque; whatever UI surface owns the session
//! (terminal, log, web panel) implements [`Notifier`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Severity of an operator-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// One-way sink for operator-visible messages.
///
/// No return value is consumed by the core; delivery failures are the
/// sink's own problem.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, severity: Severity, message: &str);
}

/// Routes notifications to `tracing` at the matching level.
///
/// Default sink for headless embedders and tests that only care about logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => tracing::info!(target: "exthost::notify", "{message}"),
            Severity::Warning => tracing::warn!(target: "exthost::notify", "{message}"),
            Severity::Error => tracing::error!(target: "exthost::notify", "{message}"),
        }
    }
}

/// Records notifications in memory, preserving order.
///
/// Used by tests and by embedders that batch-render notifications.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    entries: Mutex<Vec<(Severity, String)>>,
}

impl MemoryNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all notifications received so far.
    #[must_use]
    pub fn entries(&self) -> Vec<(Severity, String)> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Notifications at a given severity.
    #[must_use]
    pub fn at(&self, severity: Severity) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, m)| m)
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn notify(&self, severity: Severity, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((severity, message.to_string()));
        }
    }
}
