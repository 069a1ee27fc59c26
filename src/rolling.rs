//! JSON output to a series of dated files.
//!
//! Each emit runs one pass under the sink's lock:
//!
//! ```text
//! format → decide (keep / roll) → [open next, close previous, sweep] → append
//! ```
//!
//! The file is opened lazily on the first event, so construction only fails
//! for configuration mistakes. Any I/O failure after that is reported once to
//! the self-log and turns the sink into a no-op.

use crate::config::RollingFileConfig;
use crate::format::Formatter;
use crate::retention;
use crate::rotation::{Decision, FileIdentity, PathTemplate, RollingPolicy};
use crate::selflog::FailureLatch;
use crate::sink::Sink;
use crate::writer::FileWriter;
use crate::{Event, Result, SelfLog};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lifecycle of a [`RollingFileSink`], as reported by [`RollingFileSink::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollingState {
    /// No event seen yet.
    Uninitialized,
    /// A file is open.
    Active,
    /// A failure disabled the sink.
    Failed,
    /// Disposed.
    Closed,
}

/// The open file and where it came from.
struct ActiveFile {
    identity: FileIdentity,
    writer: FileWriter,
    /// Set when rolling failed; the sink then stays on this file.
    pinned: bool,
}

enum State {
    Uninitialized,
    Active(ActiveFile),
    Failed,
    Closed,
}

/// Writes events to files named after their date, rolling on date change or
/// size limit and keeping a bounded number of files.
pub struct RollingFileSink {
    path_format: String,
    policy: RollingPolicy,
    retained_file_count_limit: Option<u32>,
    buffered: bool,
    formatter: Box<dyn Formatter>,
    state: Mutex<State>,
    failures: FailureLatch,
}

impl RollingFileSink {
    /// Create a sink for `config`. No file is opened until the first event.
    pub fn new(
        config: &RollingFileConfig,
        formatter: impl Formatter + 'static,
        selflog: SelfLog,
    ) -> Result<Self> {
        config.validate()?;
        let template = PathTemplate::parse(&config.path_format)?;

        Ok(Self {
            path_format: config.path_format.clone(),
            policy: RollingPolicy::new(template, config.file_size_limit_bytes),
            retained_file_count_limit: config.retained_file_count_limit,
            buffered: config.buffered,
            formatter: Box::new(formatter),
            state: Mutex::new(State::Uninitialized),
            failures: FailureLatch::new(selflog),
        })
    }

    /// Path of the file currently written to.
    pub fn current_path(&self) -> Option<PathBuf> {
        match &*self.lock_state() {
            State::Active(active) => Some(active.identity.path().to_path_buf()),
            _ => None,
        }
    }

    /// Where the sink is in its lifecycle.
    pub fn state(&self) -> RollingState {
        match &*self.lock_state() {
            State::Uninitialized => RollingState::Uninitialized,
            State::Active(_) => RollingState::Active,
            State::Failed => RollingState::Failed,
            State::Closed => RollingState::Closed,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open the file for `identity` that can take a record of `record_len`
    /// bytes. The first file of a date continues the highest sequence an
    /// earlier run left on disk; a file already at the size limit is passed
    /// over for the next sequence.
    fn open(&self, identity: FileIdentity, record_len: u64) -> io::Result<ActiveFile> {
        let template = self.policy.template();
        let mut identity = match identity.sequence() {
            0 => match retention::latest_sequence(template, identity.date()) {
                Some(sequence) if sequence > 0 => {
                    FileIdentity::new(template, identity.date(), sequence)
                }
                _ => identity,
            },
            _ => identity,
        };

        loop {
            let writer = FileWriter::open(identity.path(), self.buffered)?;
            if self.policy.fits(writer.size(), record_len) {
                tracing::debug!(
                    path = %identity.path().display(),
                    size = writer.size(),
                    "opened log file"
                );
                return Ok(ActiveFile {
                    identity,
                    writer,
                    pinned: false,
                });
            }

            // Nothing was written, so there is nothing to flush.
            drop(writer);
            identity = FileIdentity::new(template, identity.date(), identity.sequence() + 1);
        }
    }

    fn sweep(&self, current: &Path) {
        let report = retention::sweep(
            self.policy.template(),
            self.retained_file_count_limit,
            current,
            self.failures.selflog(),
        );
        if !report.deleted.is_empty() {
            tracing::debug!(
                deleted = report.deleted.len(),
                retained = report.retained,
                "applied retention"
            );
        }
    }

    fn start(&self, event: &Event, record: &[u8]) -> State {
        let identity = self.policy.identity_for(event);
        match self.open(identity.clone(), record.len() as u64) {
            Ok(active) => {
                self.sweep(active.identity.path());
                self.write(active, record)
            }
            Err(e) => {
                self.failures.report(|| {
                    format!(
                        "Unable to open file sink for {}: {}",
                        identity.path().display(),
                        e
                    )
                });
                State::Failed
            }
        }
    }

    /// Apply the rolling policy. When the next file cannot be opened the
    /// current one stays in use for the rest of the sink's life.
    fn roll_if_needed(&self, active: ActiveFile, record_len: usize, event: &Event) -> ActiveFile {
        if active.pinned {
            return active;
        }

        let decision = self.policy.decide(
            Some(&active.identity),
            active.writer.size(),
            record_len as u64,
            event,
        );
        let Decision::RollTo(next) = decision else {
            return active;
        };

        match self.open(next.clone(), record_len as u64) {
            Ok(next) => {
                let previous = active.identity;
                if let Err(e) = active.writer.close() {
                    self.failures.selflog().write(format!(
                        "Unable to close {}: {}",
                        previous.path().display(),
                        e
                    ));
                }
                tracing::debug!(
                    from = %previous.path().display(),
                    to = %next.identity.path().display(),
                    "rolled log file"
                );
                self.sweep(next.identity.path());
                next
            }
            Err(e) => {
                self.failures.report(|| {
                    format!(
                        "Unable to roll to {}: {}; continuing in {}",
                        next.path().display(),
                        e,
                        active.identity.path().display()
                    )
                });
                ActiveFile {
                    pinned: true,
                    ..active
                }
            }
        }
    }

    fn write(&self, mut active: ActiveFile, record: &[u8]) -> State {
        match active.writer.append(record) {
            Ok(()) => State::Active(active),
            Err(e) => {
                self.failures.report(|| {
                    format!(
                        "Unable to write to {}: {}",
                        active.identity.path().display(),
                        e
                    )
                });
                let _ = active.writer.close();
                State::Failed
            }
        }
    }

    fn fail(&self, state: State, message: impl FnOnce() -> String) -> State {
        if let State::Active(active) = state {
            let _ = active.writer.close();
        }
        self.failures.report(message);
        State::Failed
    }
}

impl Sink for RollingFileSink {
    fn emit(&self, event: &Event) {
        let mut record = Vec::with_capacity(256);
        let formatted = self.formatter.format(event, &mut record);

        let mut guard = self.lock_state();
        let state = std::mem::replace(&mut *guard, State::Closed);
        *guard = match (state, formatted) {
            (State::Closed, _) => State::Closed,
            (State::Failed, _) => State::Failed,
            (state, Err(e)) => self.fail(state, || {
                format!("Unable to format event for {}: {}", self.path_format, e)
            }),
            (State::Uninitialized, Ok(())) => self.start(event, &record),
            (State::Active(active), Ok(())) => {
                let active = self.roll_if_needed(active, record.len(), event);
                self.write(active, &record)
            }
        };
    }

    fn flush(&self) {
        let mut guard = self.lock_state();
        let state = std::mem::replace(&mut *guard, State::Closed);
        *guard = match state {
            State::Active(mut active) => match active.writer.flush() {
                Ok(()) => State::Active(active),
                Err(e) => self.fail(State::Active(active), || {
                    format!("Unable to flush {}: {}", self.path_format, e)
                }),
            },
            other => other,
        };
    }

    fn dispose(&self) {
        let state = std::mem::replace(&mut *self.lock_state(), State::Closed);
        if let State::Active(active) = state {
            let path = active.identity.path().to_path_buf();
            if let Err(e) = active.writer.close() {
                self.failures
                    .selflog()
                    .write(format!("Unable to close {}: {}", path.display(), e));
            }
        }
    }
}

impl Drop for RollingFileSink {
    fn drop(&mut self) {
        self.dispose();
    }
}
