use crate::payload::{Comparison, DesignCandidate, DiagramSource, StaffingPlan};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of artifact kinds the pipeline can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Design,
    Comparison,
    Diagram,
    Staffing,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Design => "design",
            ArtifactKind::Comparison => "comparison",
            ArtifactKind::Diagram => "diagram",
            ArtifactKind::Staffing => "staffing",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed payload of one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArtifactPayload {
    Design(DesignCandidate),
    Comparison(Comparison),
    Diagram(DiagramSource),
    Staffing(StaffingPlan),
}

impl ArtifactPayload {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            ArtifactPayload::Design(_) => ArtifactKind::Design,
            ArtifactPayload::Comparison(_) => ArtifactKind::Comparison,
            ArtifactPayload::Diagram(_) => ArtifactKind::Diagram,
            ArtifactPayload::Staffing(_) => ArtifactKind::Staffing,
        }
    }

    pub fn as_design(&self) -> Option<&DesignCandidate> {
        match self {
            ArtifactPayload::Design(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_comparison(&self) -> Option<&Comparison> {
        match self {
            ArtifactPayload::Comparison(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_diagram(&self) -> Option<&DiagramSource> {
        match self {
            ArtifactPayload::Diagram(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_staffing(&self) -> Option<&StaffingPlan> {
        match self {
            ArtifactPayload::Staffing(s) => Some(s),
            _ => None,
        }
    }
}

/// A versioned unit of pipeline output, owned by exactly one session.
///
/// Versions for a kind start at 1 and are strictly increasing; the session
/// store rejects writes that would create gaps or duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub version: u64,
    pub producer: String,
    pub created_at: DateTime<Utc>,
    pub payload: ArtifactPayload,
    /// Whether the refinement engine accepted this artifact. Unaccepted
    /// artifacts are best-effort results after attempt exhaustion.
    pub accepted: bool,
    /// Refinement attempts consumed before acceptance or exhaustion.
    pub attempts: u32,
}

impl Artifact {
    pub fn new(version: u64, producer: impl Into<String>, payload: ArtifactPayload) -> Self {
        Self {
            kind: payload.kind(),
            version,
            producer: producer.into(),
            created_at: Utc::now(),
            payload,
            accepted: true,
            attempts: 1,
        }
    }

    pub fn with_acceptance(mut self, accepted: bool, attempts: u32) -> Self {
        self.accepted = accepted;
        self.attempts = attempts;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::DiagramSource;

    #[test]
    fn test_kind_serializes_as_string() {
        let json = serde_json::to_string(&ArtifactKind::Staffing).unwrap();
        assert_eq!(json, "\"staffing\"");
    }

    #[test]
    fn test_payload_kind_matches_variant() {
        let payload = ArtifactPayload::Diagram(DiagramSource {
            format: "mermaid".into(),
            source: "graph TD".into(),
            nodes: vec!["S3".into()],
            edges: vec![],
        });
        assert_eq!(payload.kind(), ArtifactKind::Diagram);
        assert!(payload.as_diagram().is_some());
        assert!(payload.as_design().is_none());
    }

    #[test]
    fn test_artifact_new_defaults_accepted() {
        let payload = ArtifactPayload::Diagram(DiagramSource {
            format: "mermaid".into(),
            source: String::new(),
            nodes: vec![],
            edges: vec![],
        });
        let artifact = Artifact::new(1, "diagram_agent", payload);
        assert!(artifact.accepted);
        assert_eq!(artifact.version, 1);
        assert_eq!(artifact.kind, ArtifactKind::Diagram);
    }
}
