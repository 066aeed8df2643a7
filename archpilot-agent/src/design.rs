use crate::agent::{CheckReport, CheckResult, GenerationAgent, ProposeInput};
use crate::parse::parse_reply;
use archpilot_core::{
    Artifact, ArtifactKind, ArtifactPayload, DesignCandidate, Inference, InferenceRequest, Result,
    TEMPLATE_DESIGN,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Renders prior design artifacts into a prompt-ready JSON array, keeping the
/// artifact version visible so replies can reference designs by identity.
pub(crate) fn designs_prompt_json(designs: &[&Artifact]) -> Result<String> {
    let entries: Vec<serde_json::Value> = designs
        .iter()
        .filter_map(|a| {
            a.payload.as_design().map(|d| {
                serde_json::json!({
                    "version": a.version,
                    "design": d,
                })
            })
        })
        .collect();
    Ok(serde_json::to_string_pretty(&entries)?)
}

/// Produces one structurally distinct architecture candidate per invocation.
pub struct DesignAgent {
    inference: Arc<dyn Inference>,
}

impl DesignAgent {
    pub fn new(inference: Arc<dyn Inference>) -> Self {
        Self { inference }
    }
}

#[async_trait]
impl GenerationAgent for DesignAgent {
    fn name(&self) -> &str {
        "design_agent"
    }

    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Design
    }

    async fn propose(&self, input: &ProposeInput) -> Result<ArtifactPayload> {
        let mut request = InferenceRequest::new(TEMPLATE_DESIGN)
            .with_variable("requirements", &input.requirements)
            .with_temperature(0.7);
        if !input.context.is_empty() {
            request = request.with_variable("context", input.context.to_prompt_block());
        }
        let priors = input.prior_designs();
        if !priors.is_empty() {
            request = request.with_variable("priors", designs_prompt_json(&priors)?);
        }
        if let Some(critique) = &input.critique {
            request = request.with_variable("critique", critique.to_prompt_text());
        }

        let reply = self.inference.generate(request).await?;
        let candidate: DesignCandidate = parse_reply(&reply)?;
        Ok(ArtifactPayload::Design(candidate))
    }

    fn evaluate(&self, candidate: &ArtifactPayload, input: &ProposeInput) -> CheckReport {
        let mut report = CheckReport::default();
        let Some(design) = candidate.as_design() else {
            report.push(CheckResult::fail("payload_kind", "candidate is not a design"));
            return report;
        };

        for (name, services, noun) in [
            ("compute_service", &design.compute_services, "compute"),
            ("storage_service", &design.storage_services, "storage"),
            ("networking_service", &design.networking_services, "networking"),
        ] {
            if services.is_empty() {
                report.push(CheckResult::fail(name, format!("no {noun} service declared")));
            } else {
                report.push(CheckResult::pass(name));
            }
        }

        let service_set = design.service_set();
        let duplicate = input.prior_designs().into_iter().find(|prior| {
            prior.payload.as_design().is_some_and(|d| d.service_set() == service_set)
        });
        match duplicate {
            Some(prior) => report.push(CheckResult::fail(
                "distinct_from_priors",
                format!("service mix duplicates design version {}", prior.version),
            )),
            None => report.push(CheckResult::pass("distinct_from_priors")),
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archpilot_model::ScriptedInference;

    fn design(name: &str, compute: &[&str], storage: &[&str], networking: &[&str]) -> DesignCandidate {
        DesignCandidate {
            name: name.into(),
            description: "test".into(),
            compute_services: compute.iter().map(|s| s.to_string()).collect(),
            storage_services: storage.iter().map(|s| s.to_string()).collect(),
            database_services: vec![],
            networking_services: networking.iter().map(|s| s.to_string()).collect(),
            security_services: vec![],
            monitoring_services: vec![],
            other_services: vec![],
            data_flow: String::new(),
            estimated_monthly_cost: String::new(),
            pros: vec![],
            cons: vec![],
        }
    }

    #[tokio::test]
    async fn test_propose_parses_fenced_reply() {
        let reply = format!(
            "```json\n{}\n```",
            serde_json::to_string(&design("Balanced", &["Lambda"], &["S3"], &["API Gateway"]))
                .unwrap()
        );
        let inference = Arc::new(ScriptedInference::new("mock").with_reply(TEMPLATE_DESIGN, reply));
        let agent = DesignAgent::new(inference);

        let payload = agent.propose(&ProposeInput::new("stateless web API")).await.unwrap();
        assert_eq!(payload.as_design().unwrap().name, "Balanced");
    }

    #[test]
    fn test_evaluate_requires_core_layers() {
        let agent = DesignAgent::new(Arc::new(ScriptedInference::new("mock")));
        let candidate = ArtifactPayload::Design(design("Thin", &["EC2"], &[], &[]));
        let report = agent.evaluate(&candidate, &ProposeInput::new("req"));
        assert!(!report.all_passed());
        let failed: Vec<_> = report.failed().map(|r| r.name.as_str()).collect();
        assert_eq!(failed, vec!["storage_service", "networking_service"]);
    }

    #[test]
    fn test_evaluate_rejects_duplicate_service_mix() {
        let agent = DesignAgent::new(Arc::new(ScriptedInference::new("mock")));
        let existing = design("First", &["Lambda"], &["S3"], &["ALB"]);
        let prior = Artifact::new(1, "design_agent", ArtifactPayload::Design(existing.clone()));

        let candidate = ArtifactPayload::Design(design("Second", &["Lambda"], &["S3"], &["ALB"]));
        let input = ProposeInput::new("req").with_priors(vec![prior]);
        let report = agent.evaluate(&candidate, &input);
        assert!(report.failed().any(|r| r.name == "distinct_from_priors"));

        let candidate = ArtifactPayload::Design(design("Third", &["ECS"], &["EFS"], &["NLB"]));
        let report = agent.evaluate(&candidate, &input);
        assert!(report.all_passed());
    }
}
