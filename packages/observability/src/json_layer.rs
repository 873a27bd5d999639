//! JSONL layer.
//!
//! One object per line: timestamp, level, service, pid, target, message and
//! the remaining event fields. `wallet_address` and `attempt` are lifted out
//! of `fields` so a sign-in can be followed with a single `jq` filter.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::redact;

/// Field names promoted to top-level keys of a [`LogEntry`].
const WALLET_FIELD: &str = "wallet_address";
const ATTEMPT_FIELD: &str = "attempt";

/// A single structured log line.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: &'static str,
    pub service: String,
    pub pid: u32,
    pub target: String,
    pub message: String,
    /// Wallet the event concerns, when the event names one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    /// Handshake attempt number, when the event names one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u64>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub fields: HashMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

#[derive(Default)]
struct FieldVisitor {
    fields: HashMap<String, Value>,
    message: Option<String>,
}

impl FieldVisitor {
    fn put(&mut self, field: &Field, value: Value) {
        match (field.name(), value) {
            ("message", Value::String(text)) => self.message = Some(text),
            (name, value) => {
                self.fields.insert(name.to_string(), value);
            }
        }
    }

    /// Pull the correlation fields out of the general map.
    fn take_correlation(&mut self) -> (Option<String>, Option<u64>) {
        let wallet = match self.fields.remove(WALLET_FIELD) {
            Some(Value::String(address)) => Some(address),
            Some(other) => Some(other.to_string()),
            None => None,
        };
        let attempt = match self.fields.remove(ATTEMPT_FIELD) {
            Some(value) => match value.as_u64() {
                Some(n) => Some(n),
                None => {
                    self.fields.insert(ATTEMPT_FIELD.to_string(), value);
                    None
                }
            },
            None => None,
        };
        (wallet, attempt)
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, Value::Number(value.into()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, Value::Number(value.into()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, Value::Bool(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        let value = Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(value.to_string()));
        self.put(field, value);
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.put(field, Value::String(value.to_string()));
    }
}

/// Layer writing one [`LogEntry`] per event.
pub struct JsonLayer<W> {
    service_name: String,
    pid: u32,
    make_writer: W,
    redact_secrets: bool,
}

impl<W> JsonLayer<W> {
    pub fn new(service_name: String, make_writer: W, redact_secrets: bool) -> Self {
        Self {
            service_name,
            pid: std::process::id(),
            make_writer,
            redact_secrets,
        }
    }
}

impl<S, W> Layer<S> for JsonLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'writer> MakeWriter<'writer> + 'static,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        let (wallet_address, attempt) = visitor.take_correlation();
        if self.redact_secrets {
            redact::sanitize_fields(&mut visitor.fields);
        }

        let metadata = event.metadata();
        let entry = LogEntry {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            level: metadata.level().as_str(),
            service: self.service_name.clone(),
            pid: self.pid,
            target: metadata.target().to_string(),
            message: visitor.message.unwrap_or_default(),
            wallet_address,
            attempt,
            fields: visitor.fields,
            span: ctx.event_span(event).map(|span| span.name().to_string()),
            file: metadata.file().map(str::to_string),
            line: metadata.line(),
        };

        let Ok(json) = serde_json::to_string(&entry) else {
            return;
        };
        let mut writer = self.make_writer.make_writer();
        let _ = writeln!(writer, "{json}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture(redact_secrets: bool, emit: impl FnOnce()) -> serde_json::Value {
        let sink = Captured::default();
        let subscriber = tracing_subscriber::registry().with(JsonLayer::new(
            "solvibe-test".to_string(),
            sink.clone(),
            redact_secrets,
        ));
        tracing::subscriber::with_default(subscriber, emit);

        let bytes = sink.0.lock().unwrap().clone();
        let line = String::from_utf8(bytes).unwrap();
        serde_json::from_str(line.trim()).unwrap()
    }

    #[test]
    fn test_log_entry_serialization() {
        let entry = LogEntry {
            timestamp: "2024-01-15T10:30:00.000000Z".to_string(),
            level: "INFO",
            service: "solvibe".to_string(),
            pid: 12345,
            target: "auth_session_machine::machine".to_string(),
            message: "auth state transition".to_string(),
            wallet_address: None,
            attempt: Some(3),
            fields: HashMap::new(),
            span: None,
            file: Some("src/machine.rs".to_string()),
            line: Some(42),
        };

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"service\":\"solvibe\""));
        assert!(json.contains("\"pid\":12345"));
        assert!(json.contains("\"attempt\":3"));
        assert!(!json.contains("\"fields\""));
        assert!(!json.contains("wallet_address"));
    }

    #[test]
    fn test_layer_writes_redacted_fields() {
        let value = capture(true, || {
            tracing::info!(token = "tok1", attempt = 2u64, wallet_address = "Addr1", "verified");
        });

        assert_eq!(value["message"], "verified");
        assert_eq!(value["service"], "solvibe-test");
        assert_eq!(value["level"], "INFO");
        assert_eq!(value["fields"]["token"], redact::REDACTED);
        assert_eq!(value["attempt"], 2);
        assert_eq!(value["wallet_address"], "Addr1");
        assert!(value["fields"].get("attempt").is_none());
    }

    #[test]
    fn test_layer_keeps_fields_when_redaction_disabled() {
        let value = capture(false, || {
            tracing::warn!(token = "tok1", "raw");
        });

        assert_eq!(value["fields"]["token"], "tok1");
    }
}
