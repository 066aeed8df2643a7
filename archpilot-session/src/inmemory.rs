use crate::{Session, SessionStore, Turn};
use archpilot_core::{ArchError, Artifact, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use uuid::Uuid;

/// In-memory session store with TTL expiry and per-kind version enforcement.
///
/// Sessions are held behind a single lock; the lock is only taken for the
/// in-memory read/update/write of a session record, never across an external
/// call.
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self { sessions: Arc::new(RwLock::new(HashMap::new())) }
    }

    fn with_live_session<T>(
        &self,
        key: &str,
        update: impl FnOnce(&mut Session) -> Result<T>,
    ) -> Result<T> {
        let mut sessions = self.sessions.write().unwrap();
        let session = sessions
            .get_mut(key)
            .ok_or_else(|| ArchError::Session(format!("session '{key}' not found")))?;

        if session.is_expired(Utc::now()) {
            sessions.remove(key);
            return Err(ArchError::Session(format!("session '{key}' expired")));
        }

        let result = update(session)?;
        session.last_access = Utc::now();
        Ok(result)
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, key: Option<String>, ttl: Duration) -> Result<Session> {
        let key = key.unwrap_or_else(|| Uuid::new_v4().to_string());
        let session = Session::new(key.clone(), ttl);

        let mut sessions = self.sessions.write().unwrap();
        if let Some(existing) = sessions.get(&key) {
            if !existing.is_expired(Utc::now()) {
                return Err(ArchError::Session(format!("session '{key}' already exists")));
            }
        }
        sessions.insert(key.clone(), session.clone());
        drop(sessions);

        tracing::info!(session_key = %key, "session created");
        Ok(session)
    }

    async fn get(&self, key: &str) -> Result<Session> {
        let sessions = self.sessions.read().unwrap();
        let session = sessions
            .get(key)
            .ok_or_else(|| ArchError::Session(format!("session '{key}' not found")))?;

        if session.is_expired(Utc::now()) {
            drop(sessions);
            let mut sessions = self.sessions.write().unwrap();
            sessions.remove(key);
            return Err(ArchError::Session(format!("session '{key}' expired")));
        }

        Ok(session.clone())
    }

    async fn get_or_create(&self, key: &str, ttl: Duration) -> Result<Session> {
        match self.get(key).await {
            Ok(session) => Ok(session),
            Err(ArchError::Session(_)) => self.create(Some(key.to_string()), ttl).await,
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut sessions = self.sessions.write().unwrap();
        sessions.remove(key);
        Ok(())
    }

    async fn append_turn(&self, key: &str, turn: Turn) -> Result<()> {
        self.with_live_session(key, |session| {
            session.turns.push(turn);
            Ok(())
        })
    }

    async fn put_state(&self, key: &str, state_key: &str, value: Value) -> Result<()> {
        self.with_live_session(key, |session| {
            session.state.insert(state_key.to_string(), value);
            Ok(())
        })
    }

    async fn append_artifact(&self, key: &str, artifact: Artifact) -> Result<u64> {
        self.with_live_session(key, |session| {
            let expected = session.next_version(artifact.kind);
            if artifact.version != expected {
                return Err(ArchError::Session(format!(
                    "artifact version conflict for kind '{}' in session '{key}': expected v{expected}, got v{}",
                    artifact.kind, artifact.version
                )));
            }

            let kind = artifact.kind;
            let version = artifact.version;
            session.artifacts.entry(kind).or_default().push(artifact);
            tracing::info!(session_key = %key, kind = %kind, version, "artifact persisted");
            Ok(version)
        })
    }

    async fn sweep_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(removed, "expired sessions evicted");
        }
        Ok(removed)
    }
}
