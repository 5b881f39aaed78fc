//! Per-transfer sessions and their event logs
//!
//! A [`Session`] is an append-only log of [`LogEvent`]s with a single writer
//! (the transfer task) and any number of readers. Readers attached at any
//! point replay the log from the start and then follow it live until the
//! session completes, at which point they receive [`SessionFeed::End`].

mod registry;
mod store;

pub use registry::SessionRegistry;
pub use store::Session;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session identifier
pub type SessionId = Uuid;

/// Severity of a log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Success,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Success => "success",
            LogLevel::Error => "error",
        })
    }
}

/// One timestamped message in a session's narrative
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl LogEvent {
    /// Create an event stamped with the current time
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Item delivered to a session subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionFeed {
    Event(LogEvent),
    /// The session completed; nothing follows
    End,
}

impl SessionFeed {
    /// The carried event, if any
    pub fn event(&self) -> Option<&LogEvent> {
        match self {
            SessionFeed::Event(event) => Some(event),
            SessionFeed::End => None,
        }
    }
}
