//! Bridge from `tracing` into a [`Logger`].

use crate::logger::Logger;
use crate::sink::Sink;
use crate::{Event, Level};
use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;
use std::sync::Arc;
use tracing::Subscriber;
use tracing::field::{Field, Visit};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

/// A tracing Layer that turns every `tracing` event into an [`Event`] and
/// emits it through a shared [`Logger`].
///
/// The `message` field becomes the message template and the other fields
/// become properties. An `error` recorded as `&dyn Error` becomes the
/// exception. Events from this crate itself are skipped, so sink
/// diagnostics never feed back into a sink.
pub struct EventLayer {
    logger: Arc<Logger>,
}

impl EventLayer {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }
}

fn is_own_target(target: &str) -> bool {
    target == "jsonsink" || target.starts_with("jsonsink::")
}

impl<S> Layer<S> for EventLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if is_own_target(metadata.target()) {
            return;
        }

        let level = Level::from(*metadata.level());
        if !self.logger.is_enabled(level) {
            return;
        }

        let mut visitor = PropertyVisitor::default();
        event.record(&mut visitor);

        if let Some(scope) = ctx.event_scope(event) {
            let spans: Vec<&str> = scope.from_root().map(|span| span.name()).collect();
            if !spans.is_empty() {
                visitor
                    .properties
                    .entry("Span".to_string())
                    .or_insert_with(|| spans.join(" > ").into());
            }
        }

        let mut record = Event::new(level, visitor.message.unwrap_or_default())
            .with_properties(visitor.properties);
        if let Some(exception) = visitor.exception {
            record = record.with_exception(exception);
        }
        self.logger.emit(&record);
    }
}

/// Collects event fields as JSON values.
#[derive(Default)]
struct PropertyVisitor {
    message: Option<String>,
    exception: Option<String>,
    properties: BTreeMap<String, serde_json::Value>,
}

impl PropertyVisitor {
    fn insert(&mut self, field: &Field, value: serde_json::Value) {
        self.properties.insert(field.name().to_string(), value);
    }
}

impl Visit for PropertyVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let mut buf = String::new();
        let _ = write!(&mut buf, "{:?}", value);

        if field.name() == "message" {
            self.message = Some(buf);
        } else {
            self.insert(field, serde_json::Value::String(buf));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.insert(field, serde_json::Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if let Some(n) = serde_json::Number::from_f64(value) {
            self.insert(field, serde_json::Value::Number(n));
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        if field.name() == "error" && self.exception.is_none() {
            self.exception = Some(value.to_string());
        } else {
            self.insert(field, serde_json::Value::String(value.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<Event>>>);

    impl Sink for Recorder {
        fn emit(&self, event: &Event) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    fn capture(minimum: Level, body: impl FnOnce()) -> Vec<Event> {
        let recorder = Recorder::default();
        let logger = Arc::new(Logger::builder().sink(minimum, recorder.clone()).build());
        let subscriber = tracing_subscriber::registry().with(EventLayer::new(logger));
        tracing::subscriber::with_default(subscriber, body);
        let events = recorder.0.lock().unwrap().clone();
        events
    }

    #[test]
    fn test_layer_maps_message_and_fields() {
        let events = capture(Level::Verbose, || {
            tracing::info!(user = "alice", attempts = 3_u64, ok = true, "login");
        });

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.level(), Level::Information);
        assert_eq!(event.message_template(), "login");
        assert_eq!(event.properties()["user"], serde_json::json!("alice"));
        assert_eq!(event.properties()["attempts"], serde_json::json!(3));
        assert_eq!(event.properties()["ok"], serde_json::json!(true));
    }

    #[test]
    fn test_layer_maps_levels_and_filters() {
        let events = capture(Level::Debug, || {
            tracing::trace!("hidden");
            tracing::debug!("debug");
            tracing::warn!("warn");
            tracing::error!("error");
        });

        let levels: Vec<Level> = events.iter().map(|e| e.level()).collect();
        assert_eq!(levels, vec![Level::Debug, Level::Warning, Level::Error]);
    }

    #[test]
    fn test_layer_skips_own_diagnostics() {
        let events = capture(Level::Verbose, || {
            crate::SelfLog::new().write("sink trouble");
            tracing::info!(target: "jsonsink::rolling", "internal");
            tracing::info!(target: "jsonsinkish", "external");
        });

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message_template(), "external");
    }

    #[test]
    fn test_layer_records_error_and_span() {
        let error = std::io::Error::other("disk full");
        let events = capture(Level::Verbose, || {
            let span = tracing::info_span!("request");
            let _guard = span.enter();
            tracing::error!(error = &error as &(dyn std::error::Error + 'static), "write failed");
        });

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].exception(), Some("disk full"));
        assert_eq!(events[0].properties()["Span"], serde_json::json!("request"));
    }
}
