use crate::agent::{CheckReport, CheckResult, GenerationAgent, ProposeInput};
use crate::parse::parse_reply;
use archpilot_core::{
    ArchError, ArtifactKind, ArtifactPayload, Inference, InferenceRequest, Result, StaffingPlan,
    TEMPLATE_STAFFING,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Produces a role and timeline plan for one selected design.
pub struct StaffingAgent {
    inference: Arc<dyn Inference>,
}

impl StaffingAgent {
    pub fn new(inference: Arc<dyn Inference>) -> Self {
        Self { inference }
    }
}

#[async_trait]
impl GenerationAgent for StaffingAgent {
    fn name(&self) -> &str {
        "staffing_agent"
    }

    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Staffing
    }

    async fn propose(&self, input: &ProposeInput) -> Result<ArtifactPayload> {
        let design = input
            .selected_design()
            .and_then(|a| a.payload.as_design())
            .ok_or_else(|| ArchError::Agent("staffing step received no design artifact".into()))?;

        let mut request = InferenceRequest::new(TEMPLATE_STAFFING)
            .with_variable("design", serde_json::to_string_pretty(design)?)
            .with_temperature(0.3);
        if !input.context.is_empty() {
            request = request.with_variable("context", input.context.to_prompt_block());
        }
        if let Some(critique) = &input.critique {
            request = request.with_variable("critique", critique.to_prompt_text());
        }

        let reply = self.inference.generate(request).await?;
        let plan: StaffingPlan = parse_reply(&reply)?;
        Ok(ArtifactPayload::Staffing(plan))
    }

    fn evaluate(&self, candidate: &ArtifactPayload, input: &ProposeInput) -> CheckReport {
        let mut report = CheckReport::default();
        let Some(plan) = candidate.as_staffing() else {
            report.push(CheckResult::fail("payload_kind", "candidate is not a staffing plan"));
            return report;
        };

        let Some(design) = input.selected_design().and_then(|a| a.payload.as_design()) else {
            report.push(CheckResult::fail("layer_coverage", "no design artifact to check against"));
            return report;
        };

        for layer in design.layers() {
            let name = format!("role_for_{layer}");
            if plan.covers_layer(layer) {
                report.push(CheckResult::pass(name));
            } else {
                report.push(CheckResult::fail(
                    name,
                    format!("no role assigned to the {layer} layer"),
                ));
            }
        }

        report
    }
}
