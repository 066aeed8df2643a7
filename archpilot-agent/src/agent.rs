use archpilot_core::{Artifact, ArtifactKind, ArtifactPayload, Result};
use archpilot_rag::RetrievalContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Everything an agent needs for one proposal: the requirement text, grounding
/// context, prior artifacts, and the critique from the previous attempt when
/// refinement is iterating.
#[derive(Debug, Clone, Default)]
pub struct ProposeInput {
    pub requirements: String,
    pub context: RetrievalContext,
    pub priors: Vec<Artifact>,
    pub critique: Option<Critique>,
}

impl ProposeInput {
    pub fn new(requirements: impl Into<String>) -> Self {
        Self { requirements: requirements.into(), ..Self::default() }
    }

    #[must_use]
    pub fn with_context(mut self, context: RetrievalContext) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub fn with_priors(mut self, priors: Vec<Artifact>) -> Self {
        self.priors = priors;
        self
    }

    /// Prior design artifacts, oldest first.
    pub fn prior_designs(&self) -> Vec<&Artifact> {
        self.priors.iter().filter(|a| a.kind == ArtifactKind::Design).collect()
    }

    /// The design artifact a downstream step was selected to run against.
    pub fn selected_design(&self) -> Option<&Artifact> {
        self.prior_designs().into_iter().next_back()
    }
}

/// Outcome of one named acceptance check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    pub fn pass(name: impl Into<String>) -> Self {
        Self { name: name.into(), passed: true, detail: String::new() }
    }

    pub fn fail(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self { name: name.into(), passed: false, detail: detail.into() }
    }
}

/// Full acceptance-check report for one candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckReport {
    pub results: Vec<CheckResult>,
}

impl CheckReport {
    pub fn push(&mut self, result: CheckResult) {
        self.results.push(result);
    }

    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &CheckResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    /// Converts the failed checks into the critique seeding the next attempt.
    pub fn to_critique(&self, attempt: u32) -> Critique {
        Critique {
            attempt,
            failed_checks: self
                .failed()
                .map(|r| {
                    if r.detail.is_empty() {
                        r.name.clone()
                    } else {
                        format!("{}: {}", r.name, r.detail)
                    }
                })
                .collect(),
        }
    }
}

/// Structured feedback from a rejected attempt, rendered into the next prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Critique {
    pub attempt: u32,
    pub failed_checks: Vec<String>,
}

impl Critique {
    pub fn to_prompt_text(&self) -> String {
        let mut text = String::from(
            "Your previous candidate was rejected. Fix every issue below and respond again:\n",
        );
        for failed in &self.failed_checks {
            text.push_str(&format!("- {failed}\n"));
        }
        text
    }
}

/// One specialized generation step: a pure mapping from requirements, grounding
/// context, prior artifacts, and optional critique to one candidate payload,
/// plus the acceptance checks that decide whether refinement may stop.
#[async_trait]
pub trait GenerationAgent: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> ArtifactKind;

    async fn propose(&self, input: &ProposeInput) -> Result<ArtifactPayload>;

    fn evaluate(&self, candidate: &ArtifactPayload, input: &ProposeInput) -> CheckReport;
}
