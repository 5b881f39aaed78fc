//! Registry of live and recently completed sessions

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{LogEvent, LogLevel, Session, SessionFeed, SessionId};
use crate::constants::DEFAULT_SESSION_RETENTION;

/// Owns every session from creation until it is released and its retention lapses
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
    retention: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_RETENTION)
    }
}

impl SessionRegistry {
    /// Create a registry that keeps completed sessions replayable for `retention`
    pub fn new(retention: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            retention,
        }
    }

    /// Register a new empty session under a fresh identifier
    pub async fn create(&self) -> Arc<Session> {
        let session = Arc::new(Session::new(Uuid::new_v4()));
        self.sessions
            .write()
            .await
            .insert(session.id(), Arc::clone(&session));
        tracing::debug!(session = %session.id(), "session created");
        session
    }

    /// Look a session up
    pub async fn get(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions.read().await.get(&id).map(Arc::clone)
    }

    /// Remove a session immediately
    ///
    /// Subscribers already attached keep their handle and still drain to the end signal.
    pub async fn remove(&self, id: SessionId) -> Option<Arc<Session>> {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(&id);
        if removed.is_some() {
            tracing::debug!(session = %id, remaining = sessions.len(), "session removed");
        }
        removed
    }

    /// Schedule removal of a completed session once the retention period lapses
    pub fn release(self: &Arc<Self>, id: SessionId) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(registry.retention).await;
            registry.remove(id).await;
        })
    }

    /// Subscribe to a session by id
    ///
    /// Unknown ids yield a single "not found" error event followed by the end signal.
    pub async fn subscribe(&self, id: SessionId) -> BoxStream<'static, SessionFeed> {
        match self.get(id).await {
            Some(session) => session.subscribe(),
            None => not_found(&id.to_string()),
        }
    }

    /// Subscribe using an identifier as received from a client
    pub async fn subscribe_raw(&self, id: &str) -> BoxStream<'static, SessionFeed> {
        match id.parse::<SessionId>() {
            Ok(id) => self.subscribe(id).await,
            Err(_) => not_found(id),
        }
    }
}

fn not_found(id: &str) -> BoxStream<'static, SessionFeed> {
    tracing::debug!(session = %id, "subscription to unknown session");
    stream::iter([
        SessionFeed::Event(LogEvent::new(
            LogLevel::Error,
            format!("Session {id} not found"),
        )),
        SessionFeed::End,
    ])
    .boxed()
}
