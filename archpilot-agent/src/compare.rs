use crate::agent::{CheckReport, CheckResult, GenerationAgent, ProposeInput};
use crate::design::designs_prompt_json;
use crate::parse::parse_reply;
use archpilot_core::{
    ArchError, ArtifactKind, ArtifactPayload, Comparison, Inference, InferenceRequest, Result,
    TEMPLATE_COMPARE,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Default evaluation criteria, following the well-architected pillars.
pub const DEFAULT_CRITERIA: [&str; 5] =
    ["operational-excellence", "security", "reliability", "performance", "cost"];

/// Scores every accepted design candidate on every declared criterion and
/// recommends one.
pub struct CompareAgent {
    inference: Arc<dyn Inference>,
    criteria: Vec<String>,
}

impl CompareAgent {
    pub fn new(inference: Arc<dyn Inference>) -> Self {
        Self { inference, criteria: DEFAULT_CRITERIA.iter().map(|c| c.to_string()).collect() }
    }

    #[must_use]
    pub fn with_criteria<I, S>(mut self, criteria: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.criteria = criteria.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait]
impl GenerationAgent for CompareAgent {
    fn name(&self) -> &str {
        "compare_agent"
    }

    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Comparison
    }

    async fn propose(&self, input: &ProposeInput) -> Result<ArtifactPayload> {
        let priors = input.prior_designs();
        if priors.len() < 2 {
            return Err(ArchError::Agent(format!(
                "comparison needs at least two designs, got {}",
                priors.len()
            )));
        }

        let mut request = InferenceRequest::new(TEMPLATE_COMPARE)
            .with_variable("criteria", self.criteria.join(", "))
            .with_variable("priors", designs_prompt_json(&priors)?)
            .with_temperature(0.2);
        if !input.context.is_empty() {
            request = request.with_variable("context", input.context.to_prompt_block());
        }
        if let Some(critique) = &input.critique {
            request = request.with_variable("critique", critique.to_prompt_text());
        }

        let reply = self.inference.generate(request).await?;
        let comparison: Comparison = parse_reply(&reply)?;
        Ok(ArtifactPayload::Comparison(comparison))
    }

    fn evaluate(&self, candidate: &ArtifactPayload, input: &ProposeInput) -> CheckReport {
        let mut report = CheckReport::default();
        let Some(comparison) = candidate.as_comparison() else {
            report.push(CheckResult::fail("payload_kind", "candidate is not a comparison"));
            return report;
        };

        let designs = input.prior_designs();
        for design in &designs {
            let occurrences =
                comparison.entries.iter().filter(|e| e.design_version == design.version).count();
            let name = format!("entry_for_design_v{}", design.version);
            match occurrences {
                1 => report.push(CheckResult::pass(name)),
                0 => report.push(CheckResult::fail(
                    name,
                    format!("design version {} is missing from the comparison", design.version),
                )),
                n => report.push(CheckResult::fail(
                    name,
                    format!("design version {} appears {n} times", design.version),
                )),
            }
        }

        let unknown = comparison
            .entries
            .iter()
            .find(|e| !designs.iter().any(|d| d.version == e.design_version));
        match unknown {
            Some(entry) => report.push(CheckResult::fail(
                "no_unknown_designs",
                format!("entry '{}' references unknown design version {}", entry.design_name, entry.design_version),
            )),
            None => report.push(CheckResult::pass("no_unknown_designs")),
        }

        let mut unscored = Vec::new();
        for entry in &comparison.entries {
            for criterion in &self.criteria {
                if entry.score_for(criterion).is_none() {
                    unscored.push(format!("{} on {}", entry.design_name, criterion));
                }
            }
        }
        if unscored.is_empty() {
            report.push(CheckResult::pass("all_criteria_scored"));
        } else {
            report.push(CheckResult::fail(
                "all_criteria_scored",
                format!("missing scores: {}", unscored.join("; ")),
            ));
        }

        if comparison.entries.iter().any(|e| e.design_name == comparison.recommended) {
            report.push(CheckResult::pass("recommended_named"));
        } else {
            report.push(CheckResult::fail(
                "recommended_named",
                format!("recommendation '{}' matches no compared design", comparison.recommended),
            ));
        }

        report
    }
}
