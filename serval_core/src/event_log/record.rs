use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::ResolutionEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventLevel::Debug => "debug",
            EventLevel::Info => "info",
            EventLevel::Warning => "warning",
            EventLevel::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: EventLevel,
    /// Qualified id of the dependency this record belongs to, when the
    /// log is correlated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency: Option<String>,
    pub message: String,
    pub event: ResolutionEvent,
}

impl EventRecord {
    /// Structured fields of the record, for downstream renderers.
    pub fn fields(&self) -> serde_json::Value {
        serde_json::to_value(&self.event).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.timestamp, self.level, self.message)
    }
}

/// Append-only event log. Cloning shares the underlying records.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    records: Arc<Mutex<Vec<EventRecord>>>,
    correlation: Option<String>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log whose records are tagged with the given dependency id.
    pub fn correlated(dependency: impl Into<String>) -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            correlation: Some(dependency.into()),
        }
    }

    pub fn append(&self, level: EventLevel, message: impl Into<String>, event: ResolutionEvent) {
        let record = EventRecord {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            level,
            dependency: self.correlation.clone(),
            message: message.into(),
            event,
        };
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }

    pub fn debug(&self, message: impl Into<String>, event: ResolutionEvent) {
        self.append(EventLevel::Debug, message, event);
    }

    pub fn info(&self, message: impl Into<String>, event: ResolutionEvent) {
        self.append(EventLevel::Info, message, event);
    }

    pub fn warning(&self, message: impl Into<String>, event: ResolutionEvent) {
        self.append(EventLevel::Warning, message, event);
    }

    pub fn error(&self, message: impl Into<String>, event: ResolutionEvent) {
        self.append(EventLevel::Error, message, event);
    }

    pub fn all(&self) -> Vec<EventRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append every record of `other`, keeping their correlation tags.
    pub fn extend(&self, other: &EventLog) {
        let incoming = other.all();
        if let Ok(mut records) = self.records.lock() {
            records.extend(incoming);
        }
    }
}
