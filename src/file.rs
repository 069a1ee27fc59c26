//! JSON output to one file that never rolls.

use crate::config::FileSinkConfig;
use crate::format::Formatter;
use crate::selflog::FailureLatch;
use crate::sink::Sink;
use crate::writer::FileWriter;
use crate::{Event, Result, SelfLog};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Appends formatted events to a single file.
///
/// Once the file reaches its size limit further events are dropped; the
/// limit is checked before each write, so the last record may take the file
/// past it.
pub struct FileSink {
    path: PathBuf,
    formatter: Box<dyn Formatter>,
    file_size_limit: Option<u64>,
    /// `None` after dispose or a failure.
    writer: Mutex<Option<FileWriter>>,
    failures: FailureLatch,
    limit_notice: FailureLatch,
}

impl FileSink {
    /// Open the configured file.
    ///
    /// Fails with [`crate::Error::Config`] for an invalid configuration and
    /// [`crate::Error::Io`] when the file cannot be opened.
    pub fn open(
        config: &FileSinkConfig,
        formatter: impl Formatter + 'static,
        selflog: SelfLog,
    ) -> Result<Self> {
        config.validate()?;
        let writer = FileWriter::open(&config.path, config.buffered)?;

        Ok(Self {
            path: config.path.clone(),
            formatter: Box::new(formatter),
            file_size_limit: config.file_size_limit_bytes,
            writer: Mutex::new(Some(writer)),
            failures: FailureLatch::new(selflog.clone()),
            limit_notice: FailureLatch::new(selflog),
        })
    }

    /// Path of the file written to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_writer(&self) -> MutexGuard<'_, Option<FileWriter>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Close the file and stop writing.
    fn degrade(&self, slot: &mut Option<FileWriter>, message: impl FnOnce() -> String) {
        if let Some(writer) = slot.take() {
            let _ = writer.close();
        }
        self.failures.report(message);
    }
}

impl Sink for FileSink {
    fn emit(&self, event: &Event) {
        let mut record = Vec::with_capacity(256);
        let formatted = self.formatter.format(event, &mut record);

        let mut slot = self.lock_writer();
        if slot.is_none() {
            return;
        }
        if let Err(e) = formatted {
            self.degrade(&mut slot, || {
                format!("Unable to format event for {}: {}", self.path.display(), e)
            });
            return;
        }

        let Some(writer) = slot.as_mut() else {
            return;
        };
        if let Some(limit) = self.file_size_limit
            && writer.size() >= limit
        {
            self.limit_notice.report(|| {
                format!(
                    "File size limit of {} bytes reached for {}; further events are dropped",
                    limit,
                    self.path.display()
                )
            });
            return;
        }

        if let Err(e) = writer.append(&record) {
            self.degrade(&mut slot, || {
                format!("Unable to write to {}: {}", self.path.display(), e)
            });
        }
    }

    fn flush(&self) {
        let mut slot = self.lock_writer();
        if let Some(writer) = slot.as_mut()
            && let Err(e) = writer.flush()
        {
            self.degrade(&mut slot, || {
                format!("Unable to flush {}: {}", self.path.display(), e)
            });
        }
    }

    fn dispose(&self) {
        let writer = self.lock_writer().take();
        if let Some(writer) = writer
            && let Err(e) = writer.close()
        {
            self.failures
                .selflog()
                .write(format!("Unable to close {}: {}", self.path.display(), e));
        }
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        self.dispose();
    }
}
