use archpilot_core::{Artifact, ArtifactKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// One entry in a session's conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub author: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self { author: author.into(), text: text.into(), timestamp: Utc::now() }
    }
}

/// State key under which the active requirement text is stored.
pub const STATE_REQUIREMENTS: &str = "requirements";
/// State key for the structured requirements profile from the gateway extractor.
pub const STATE_REQUIREMENTS_PROFILE: &str = "requirements_profile";

/// Durable state spanning one user's multi-turn interaction with the pipeline.
///
/// Artifacts are grouped by kind and monotonically versioned; history is
/// append-only. The store enforces the version invariant on write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
    pub ttl: Duration,
    pub turns: Vec<Turn>,
    pub state: HashMap<String, Value>,
    pub artifacts: HashMap<ArtifactKind, Vec<Artifact>>,
}

impl Session {
    pub fn new(key: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            created_at: now,
            last_access: now,
            ttl,
            turns: Vec::new(),
            state: HashMap::new(),
            artifacts: HashMap::new(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match (now - self.last_access).to_std() {
            Ok(elapsed) => elapsed > self.ttl,
            // last_access in the future means a clock skew, not expiry.
            Err(_) => false,
        }
    }

    /// Full version history for a kind, oldest first.
    pub fn history(&self, kind: ArtifactKind) -> &[Artifact] {
        self.artifacts.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Latest artifact of a kind regardless of acceptance.
    pub fn latest(&self, kind: ArtifactKind) -> Option<&Artifact> {
        self.history(kind).last()
    }

    /// Accepted artifacts of a kind, oldest first.
    pub fn accepted(&self, kind: ArtifactKind) -> Vec<&Artifact> {
        self.history(kind).iter().filter(|a| a.accepted).collect()
    }

    pub fn accepted_count(&self, kind: ArtifactKind) -> usize {
        self.accepted(kind).len()
    }

    /// Version the next artifact of this kind must carry.
    pub fn next_version(&self, kind: ArtifactKind) -> u64 {
        self.history(kind).len() as u64 + 1
    }

    pub fn artifact_at(&self, kind: ArtifactKind, version: u64) -> Option<&Artifact> {
        self.history(kind).iter().find(|a| a.version == version)
    }

    pub fn requirements(&self) -> Option<&str> {
        self.state.get(STATE_REQUIREMENTS).and_then(Value::as_str)
    }
}
