//! Rendering events to text.

use crate::{Event, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use time::format_description::well_known::Rfc3339;

/// Renders one event to an output stream.
///
/// Implementations must write one complete, self-contained record per call.
pub trait Formatter: Send + Sync {
    /// Write `event` to `output`.
    fn format(&self, event: &Event, output: &mut dyn Write) -> Result<()>;
}

/// Formats events as one JSON object per line.
///
/// ```text
/// {"Timestamp":"2024-01-15T10:00:00Z","Level":"Information","MessageTemplate":"Hello {Name}","Properties":{"Name":"world"}}
/// ```
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    render_message: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct JsonRecord<'a> {
    timestamp: String,
    level: &'static str,
    message_template: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    rendered_message: Option<String>,
    #[serde(skip_serializing_if = "no_properties")]
    properties: &'a BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exception: Option<&'a str>,
}

fn no_properties(properties: &&BTreeMap<String, Value>) -> bool {
    properties.is_empty()
}

impl JsonFormatter {
    /// Create a formatter that writes the template but not the rendered message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also write a `RenderedMessage` field with properties substituted into the template.
    pub fn with_rendered_message(mut self, render_message: bool) -> Self {
        self.render_message = render_message;
        self
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, event: &Event, output: &mut dyn Write) -> Result<()> {
        let timestamp = event
            .timestamp()
            .format(&Rfc3339)
            .map_err(time::error::Error::from)?;

        let record = JsonRecord {
            timestamp,
            level: event.level().as_str(),
            message_template: event.message_template(),
            rendered_message: self
                .render_message
                .then(|| render_template(event.message_template(), event.properties())),
            properties: event.properties(),
            exception: event.exception(),
        };

        serde_json::to_writer(&mut *output, &record)?;
        output.write_all(b"\n")?;
        Ok(())
    }
}

/// Substitute `{Name}` tokens in a message template with property values.
///
/// String values are written without quotes. `{{` and `}}` produce literal
/// braces. Tokens naming an unknown property are kept as written. A leading
/// `@` or `$` and any `:format` or `,alignment` suffix are ignored when
/// looking the name up.
pub fn render_template(template: &str, properties: &BTreeMap<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
        } else if tail.starts_with('}') {
            out.push('}');
            rest = &tail[1..];
        } else if let Some(end) = tail.find('}') {
            let token = &tail[1..end];
            let name = token.trim_start_matches(['@', '$']);
            let name = name.split([':', ',']).next().unwrap_or(name);
            match properties.get(name) {
                Some(Value::String(s)) => out.push_str(s),
                Some(value) => out.push_str(&value.to_string()),
                None => out.push_str(&tail[..=end]),
            }
            rest = &tail[end + 1..];
        } else {
            out.push_str(tail);
            rest = "";
        }
    }

    out.push_str(rest);
    out
}
