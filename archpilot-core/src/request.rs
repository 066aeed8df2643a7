use crate::artifact::{Artifact, ArtifactKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A caller's request for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRequest {
    /// Raw requirement text. Optional when the session already holds
    /// requirements from a previous turn.
    pub requirement_text: Option<String>,
    /// Ensure at least this many accepted design candidates exist.
    pub design_count: u32,
    pub compare: bool,
    pub diagram: bool,
    pub staffing: bool,
    /// Explicit design selection (artifact version) for diagram/staffing steps.
    pub selected_design: Option<u64>,
}

impl PipelineRequest {
    pub fn designs(count: u32) -> Self {
        Self {
            requirement_text: None,
            design_count: count,
            compare: false,
            diagram: false,
            staffing: false,
            selected_design: None,
        }
    }

    #[must_use]
    pub fn with_requirements(mut self, text: impl Into<String>) -> Self {
        self.requirement_text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_comparison(mut self) -> Self {
        self.compare = true;
        self
    }

    #[must_use]
    pub fn with_diagram(mut self) -> Self {
        self.diagram = true;
        self
    }

    #[must_use]
    pub fn with_staffing(mut self) -> Self {
        self.staffing = true;
        self
    }

    #[must_use]
    pub fn with_selected_design(mut self, version: u64) -> Self {
        self.selected_design = Some(version);
        self
    }

    /// Artifact kinds this request asks for.
    pub fn requested_kinds(&self) -> Vec<ArtifactKind> {
        let mut kinds = Vec::new();
        if self.design_count > 0 {
            kinds.push(ArtifactKind::Design);
        }
        if self.compare {
            kinds.push(ArtifactKind::Comparison);
        }
        if self.diagram {
            kinds.push(ArtifactKind::Diagram);
        }
        if self.staffing {
            kinds.push(ArtifactKind::Staffing);
        }
        kinds
    }
}

/// Latest artifact of one kind plus its acceptance status. Unaccepted entries
/// are best-effort results after refinement exhaustion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleEntry {
    pub artifact: Artifact,
    pub accepted: bool,
}

/// End-to-end result of one pipeline run: the latest artifact per requested
/// kind, plus any non-fatal warnings collected along the way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultBundle {
    pub session_key: String,
    pub artifacts: HashMap<ArtifactKind, BundleEntry>,
    pub warnings: Vec<String>,
}

impl ResultBundle {
    pub fn new(session_key: impl Into<String>) -> Self {
        Self { session_key: session_key.into(), artifacts: HashMap::new(), warnings: Vec::new() }
    }

    pub fn entry(&self, kind: ArtifactKind) -> Option<&BundleEntry> {
        self.artifacts.get(&kind)
    }

    pub fn is_fully_accepted(&self) -> bool {
        self.artifacts.values().all(|e| e.accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_kinds() {
        let request = PipelineRequest::designs(2).with_comparison();
        assert_eq!(request.requested_kinds(), vec![ArtifactKind::Design, ArtifactKind::Comparison]);
    }

    #[test]
    fn test_builder_flags() {
        let request = PipelineRequest::designs(1)
            .with_requirements("stateless web API")
            .with_diagram()
            .with_selected_design(1);
        assert!(request.diagram);
        assert!(!request.staffing);
        assert_eq!(request.selected_design, Some(1));
    }
}
