//! Append-only event log with replay-then-follow subscriptions

use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock};

use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::watch;

use super::{LogEvent, LogLevel, SessionFeed, SessionId};

struct Inner {
    events: Vec<LogEvent>,
    completed: bool,
}

/// Event log of one transfer attempt
///
/// Subscribers read by offset from the shared log, so every subscriber sees
/// the same sequence regardless of when it attached: no event is skipped at
/// the snapshot boundary and none is delivered twice.
pub struct Session {
    id: SessionId,
    inner: RwLock<Inner>,
    // Bumped on every append and on completion; wakes idle subscribers.
    version: watch::Sender<u64>,
}

impl Session {
    /// Create an empty, open session
    pub fn new(id: SessionId) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            id,
            inner: RwLock::new(Inner {
                events: Vec::with_capacity(32),
                completed: false,
            }),
            version,
        }
    }

    /// Session identifier
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Append an event and wake subscribers
    ///
    /// Returns `false` (and drops the event) once the session has completed.
    pub fn push(&self, event: LogEvent) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.completed {
            tracing::debug!(session = %self.id, "dropping event after completion: {}", event.message);
            return false;
        }

        match event.level {
            LogLevel::Info | LogLevel::Success => {
                tracing::info!(session = %self.id, level = %event.level, "{}", event.message)
            }
            LogLevel::Warn => tracing::warn!(session = %self.id, "{}", event.message),
            LogLevel::Error => tracing::error!(session = %self.id, "{}", event.message),
        }

        inner.events.push(event);
        self.version.send_modify(|v| *v += 1);
        true
    }

    /// Push informational message
    pub fn info<S: Into<String>>(&self, message: S) {
        self.push(LogEvent::new(LogLevel::Info, message));
    }

    /// Push warning message
    pub fn warn<S: Into<String>>(&self, message: S) {
        self.push(LogEvent::new(LogLevel::Warn, message));
    }

    /// Push success message
    pub fn success<S: Into<String>>(&self, message: S) {
        self.push(LogEvent::new(LogLevel::Success, message));
    }

    /// Push error message
    pub fn error<S: Into<String>>(&self, message: S) {
        self.push(LogEvent::new(LogLevel::Error, message));
    }

    /// Mark the session terminal and deliver the end signal
    ///
    /// Returns `true` only for the call that actually completed the session.
    pub fn complete(&self) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.completed {
            return false;
        }
        inner.completed = true;
        self.version.send_modify(|v| *v += 1);
        tracing::debug!(session = %self.id, events = inner.events.len(), "session completed");
        true
    }

    /// Whether the end signal has been issued
    pub fn is_completed(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .completed
    }

    /// Snapshot of the log
    #[cfg(test)]
    pub(crate) fn history(&self) -> Vec<LogEvent> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .clone()
    }

    fn read_from(&self, offset: usize) -> (Vec<LogEvent>, bool) {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let batch = inner.events.get(offset..).unwrap_or_default().to_vec();
        (batch, inner.completed)
    }

    /// Replay the log from the start, then follow live appends until the end signal
    ///
    /// Dropping the stream detaches the subscriber without affecting the writer.
    pub fn subscribe(self: &Arc<Self>) -> BoxStream<'static, SessionFeed> {
        self.subscribe_from(0)
    }

    /// Like [`subscribe`](Self::subscribe), starting at event `offset`
    pub fn subscribe_from(self: &Arc<Self>, offset: usize) -> BoxStream<'static, SessionFeed> {
        let cursor = Cursor {
            session: Arc::clone(self),
            changes: self.version.subscribe(),
            offset,
            pending: VecDeque::new(),
            finished: false,
        };

        stream::unfold(cursor, |mut cursor| async move {
            loop {
                if let Some(event) = cursor.pending.pop_front() {
                    return Some((SessionFeed::Event(event), cursor));
                }
                if cursor.finished {
                    return None;
                }

                // Mark seen before reading so an append racing the read still wakes us.
                let _ = cursor.changes.borrow_and_update();
                let (batch, completed) = cursor.session.read_from(cursor.offset);
                cursor.offset += batch.len();

                if !batch.is_empty() {
                    cursor.pending.extend(batch);
                    continue;
                }
                if completed {
                    cursor.finished = true;
                    return Some((SessionFeed::End, cursor));
                }
                if cursor.changes.changed().await.is_err() {
                    cursor.finished = true;
                    return Some((SessionFeed::End, cursor));
                }
            }
        })
        .boxed()
    }
}

struct Cursor {
    session: Arc<Session>,
    changes: watch::Receiver<u64>,
    offset: usize,
    pending: VecDeque<LogEvent>,
    finished: bool,
}
