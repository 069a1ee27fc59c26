//! The sink capability and the simple sinks.

use crate::format::Formatter;
use crate::selflog::FailureLatch;
use crate::{Event, SelfLog};
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// A destination for events.
///
/// `emit` never fails: a sink that cannot write reports through its
/// [`SelfLog`] and carries on, so logging can never take the application down.
pub trait Sink: Send + Sync {
    /// Write one event.
    fn emit(&self, event: &Event);

    /// Push any buffered output to its destination.
    fn flush(&self) {}

    /// Flush and release resources. Later calls to `emit` do nothing.
    fn dispose(&self) {}
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn emit(&self, event: &Event) {
        (**self).emit(event)
    }

    fn flush(&self) {
        (**self).flush()
    }

    fn dispose(&self) {
        (**self).dispose()
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn emit(&self, event: &Event) {
        (**self).emit(event)
    }

    fn flush(&self) {
        (**self).flush()
    }

    fn dispose(&self) {
        (**self).dispose()
    }
}

/// Discards every event. Stands in for sinks that could not be built.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl Sink for NullSink {
    fn emit(&self, _event: &Event) {}
}

/// Writes formatted events to standard output.
pub struct ConsoleSink {
    formatter: Box<dyn Formatter>,
    output: Mutex<Box<dyn Write + Send>>,
    failures: FailureLatch,
}

impl ConsoleSink {
    /// Write to standard output.
    pub fn new(formatter: impl Formatter + 'static) -> Self {
        Self::with_writer(formatter, io::stdout())
    }

    /// Write to any stream instead of standard output.
    pub fn with_writer(
        formatter: impl Formatter + 'static,
        writer: impl Write + Send + 'static,
    ) -> Self {
        Self {
            formatter: Box::new(formatter),
            output: Mutex::new(Box::new(writer)),
            failures: FailureLatch::new(SelfLog::new()),
        }
    }

    /// Report formatting failures to `selflog`.
    pub fn with_selflog(mut self, selflog: SelfLog) -> Self {
        self.failures = FailureLatch::new(selflog);
        self
    }
}

impl Sink for ConsoleSink {
    fn emit(&self, event: &Event) {
        let mut record = Vec::with_capacity(256);
        if let Err(e) = self.formatter.format(event, &mut record) {
            self.failures
                .report(|| format!("Unable to format event for console: {}", e));
            return;
        }

        // A closed or broken console is not worth reporting.
        let mut output = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = output.write_all(&record).and_then(|()| output.flush());
    }

    fn flush(&self) {
        let mut output = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = output.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{JsonFormatter, Level, Result};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    struct FailingFormatter;

    impl Formatter for FailingFormatter {
        fn format(&self, _event: &Event, _output: &mut dyn Write) -> Result<()> {
            Err(crate::Error::Config("cannot format".to_string()))
        }
    }

    #[test]
    fn test_console_sink_writes_json_lines() {
        let buf = SharedBuf::default();
        let sink = ConsoleSink::with_writer(JsonFormatter::new(), buf.clone());

        sink.emit(&Event::new(Level::Information, "first"));
        sink.emit(&Event::new(Level::Error, "second"));

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"MessageTemplate\":\"first\""));
        assert!(lines[1].contains("\"Level\":\"Error\""));
    }

    #[test]
    fn test_console_sink_swallows_broken_stream() {
        let sink = ConsoleSink::with_writer(JsonFormatter::new(), BrokenPipe);
        sink.emit(&Event::new(Level::Information, "lost"));
        sink.flush();
    }

    #[test]
    fn test_console_sink_reports_format_failure_once() {
        let selflog = SelfLog::capturing();
        let buf = SharedBuf::default();
        let sink =
            ConsoleSink::with_writer(FailingFormatter, buf.clone()).with_selflog(selflog.clone());

        sink.emit(&Event::new(Level::Information, "a"));
        sink.emit(&Event::new(Level::Information, "b"));

        assert!(buf.0.lock().unwrap().is_empty());
        assert_eq!(selflog.entries().len(), 1);
    }

    #[test]
    fn test_null_sink_accepts_everything() {
        let sink = NullSink;
        sink.emit(&Event::new(Level::Fatal, "ignored"));
        sink.flush();
        sink.dispose();
    }
}
