use crate::{Session, Turn};
use archpilot_core::{Artifact, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Durable key/value backend for sessions.
///
/// Implementations must support concurrent access to distinct session keys
/// without cross-session interference, and enforce the artifact version
/// invariant: for a given kind, versions are strictly increasing with no gaps.
/// Every successful write refreshes the session's TTL.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates a session under `key`, or a generated key when `None`.
    async fn create(&self, key: Option<String>, ttl: Duration) -> Result<Session>;

    /// Loads a session. An expired session is evicted and reported as missing.
    async fn get(&self, key: &str) -> Result<Session>;

    /// Loads a session, creating a fresh one when missing or expired.
    async fn get_or_create(&self, key: &str, ttl: Duration) -> Result<Session>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn append_turn(&self, key: &str, turn: Turn) -> Result<()>;

    async fn put_state(&self, key: &str, state_key: &str, value: Value) -> Result<()>;

    /// Appends an artifact to its kind's history. The artifact's version must
    /// equal the current history length plus one; anything else is rejected,
    /// which makes a retried step write idempotent for its own version slot.
    async fn append_artifact(&self, key: &str, artifact: Artifact) -> Result<u64>;

    /// Evicts every session whose TTL elapsed; returns how many were removed.
    async fn sweep_expired(&self) -> Result<usize>;
}
