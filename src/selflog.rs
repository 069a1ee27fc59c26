//! Side channel for failures inside the sinks themselves.
//!
//! Sinks never return errors to the code that logs an event. When a file
//! cannot be opened or written they report here instead, and the message is
//! forwarded to `tracing` under [`SELFLOG_TARGET`]. Install a subscriber with
//! [`crate::init_diagnostics`] to see it.

use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex, PoisonError};

/// `tracing` target used for every self-log message.
pub const SELFLOG_TARGET: &str = "jsonsink::selflog";

/// Handle to the diagnostic channel.
///
/// Cloning is cheap; clones share the captured entries.
#[derive(Debug, Clone, Default)]
pub struct SelfLog {
    captured: Option<Arc<Mutex<Vec<String>>>>,
}

impl SelfLog {
    /// A handle that only forwards to `tracing`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that also keeps every message in memory.
    pub fn capturing() -> Self {
        Self {
            captured: Some(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    /// Record a diagnostic message.
    pub fn write(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(target: SELFLOG_TARGET, "{}", message);
        if let Some(captured) = &self.captured {
            captured
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(message);
        }
    }

    /// Messages captured so far. Always empty for non-capturing handles.
    pub fn entries(&self) -> Vec<String> {
        self.captured
            .as_ref()
            .map(|captured| {
                captured
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone()
            })
            .unwrap_or_default()
    }
}

/// Lets the first failure of a sink through to the self-log and drops the rest.
#[derive(Debug)]
pub(crate) struct FailureLatch {
    selflog: SelfLog,
    tripped: OnceCell<()>,
}

impl FailureLatch {
    pub(crate) fn new(selflog: SelfLog) -> Self {
        Self {
            selflog,
            tripped: OnceCell::new(),
        }
    }

    /// Report a failure. Returns false when an earlier failure was already reported.
    pub(crate) fn report(&self, message: impl FnOnce() -> String) -> bool {
        if self.tripped.set(()).is_ok() {
            self.selflog.write(message());
            true
        } else {
            false
        }
    }

    pub(crate) fn selflog(&self) -> &SelfLog {
        &self.selflog
    }
}
