use crate::agent::{CheckReport, CheckResult, GenerationAgent, ProposeInput};
use crate::parse::parse_reply;
use archpilot_core::{
    ArchError, ArtifactKind, ArtifactPayload, DiagramSource, Inference, InferenceRequest, Result,
    TEMPLATE_DIAGRAM,
};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Produces a diagram-source description for one selected design.
pub struct DiagramAgent {
    inference: Arc<dyn Inference>,
}

impl DiagramAgent {
    pub fn new(inference: Arc<dyn Inference>) -> Self {
        Self { inference }
    }
}

#[async_trait]
impl GenerationAgent for DiagramAgent {
    fn name(&self) -> &str {
        "diagram_agent"
    }

    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Diagram
    }

    async fn propose(&self, input: &ProposeInput) -> Result<ArtifactPayload> {
        let design = input
            .selected_design()
            .and_then(|a| a.payload.as_design())
            .ok_or_else(|| ArchError::Agent("diagram step received no design artifact".into()))?;

        let mut request = InferenceRequest::new(TEMPLATE_DIAGRAM)
            .with_variable("design", serde_json::to_string_pretty(design)?)
            .with_temperature(0.3);
        if !input.context.is_empty() {
            request = request.with_variable("context", input.context.to_prompt_block());
        }
        if let Some(critique) = &input.critique {
            request = request.with_variable("critique", critique.to_prompt_text());
        }

        let reply = self.inference.generate(request).await?;
        let diagram: DiagramSource = parse_reply(&reply)?;
        Ok(ArtifactPayload::Diagram(diagram))
    }

    fn evaluate(&self, candidate: &ArtifactPayload, input: &ProposeInput) -> CheckReport {
        let mut report = CheckReport::default();
        let Some(diagram) = candidate.as_diagram() else {
            report.push(CheckResult::fail("payload_kind", "candidate is not a diagram"));
            return report;
        };

        if diagram.source.trim().is_empty() {
            report.push(CheckResult::fail("has_source", "diagram source text is empty"));
        } else {
            report.push(CheckResult::pass("has_source"));
        }

        let Some(design) = input.selected_design().and_then(|a| a.payload.as_design()) else {
            report.push(CheckResult::fail("component_nodes", "no design artifact to check against"));
            return report;
        };

        let nodes: BTreeSet<&str> = diagram.nodes.iter().map(String::as_str).collect();
        let missing: Vec<&str> =
            design.components().into_iter().filter(|c| !nodes.contains(c)).collect();
        if missing.is_empty() {
            report.push(CheckResult::pass("component_nodes"));
        } else {
            report.push(CheckResult::fail(
                "component_nodes",
                format!("design services missing from the node set: {}", missing.join(", ")),
            ));
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archpilot_core::{Artifact, DesignCandidate};
    use archpilot_model::ScriptedInference;

    fn selected_design() -> Artifact {
        Artifact::new(
            1,
            "design_agent",
            ArtifactPayload::Design(DesignCandidate {
                name: "Balanced".into(),
                description: "d".into(),
                compute_services: vec!["Lambda".into()],
                storage_services: vec!["S3".into()],
                database_services: vec![],
                networking_services: vec!["API Gateway".into()],
                security_services: vec![],
                monitoring_services: vec![],
                other_services: vec![],
                data_flow: String::new(),
                estimated_monthly_cost: String::new(),
                pros: vec![],
                cons: vec![],
            }),
        )
    }

    fn diagram(nodes: &[&str]) -> ArtifactPayload {
        ArtifactPayload::Diagram(DiagramSource {
            format: "mermaid".into(),
            source: "graph TD; a-->b".into(),
            nodes: nodes.iter().map(|n| n.to_string()).collect(),
            edges: vec![],
        })
    }

    #[test]
    fn test_node_set_must_cover_design_components() {
        let agent = DiagramAgent::new(Arc::new(ScriptedInference::new("mock")));
        let input = ProposeInput::new("req").with_priors(vec![selected_design()]);

        let report = agent.evaluate(&diagram(&["Lambda", "S3"]), &input);
        let failure = report.failed().next().expect("missing node should fail");
        assert_eq!(failure.name, "component_nodes");
        assert!(failure.detail.contains("API Gateway"));

        let report = agent.evaluate(&diagram(&["Lambda", "S3", "API Gateway", "Users"]), &input);
        assert!(report.all_passed(), "extra nodes are allowed");
    }

    #[tokio::test]
    async fn test_propose_without_design_errors() {
        let agent = DiagramAgent::new(Arc::new(ScriptedInference::new("mock")));
        let err = agent.propose(&ProposeInput::new("req")).await.unwrap_err();
        assert!(err.to_string().contains("no design artifact"));
    }
}
