use crate::agent::{CheckReport, Critique, GenerationAgent, ProposeInput};
use archpilot_core::{ArchError, ArtifactPayload, Result};
use std::time::Duration;

/// Record of one refinement iteration, kept only for the duration of the run.
#[derive(Debug, Clone)]
struct RefinementAttempt {
    index: u32,
    candidate: Option<ArtifactPayload>,
    report: Option<CheckReport>,
}

impl RefinementAttempt {
    fn score(&self) -> usize {
        self.report.as_ref().map(CheckReport::passed_count).unwrap_or(0)
    }
}

/// Conclusion of one refinement run.
#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    pub payload: ArtifactPayload,
    pub accepted: bool,
    pub attempts: u32,
    /// Critique of the final rejected candidate, present only on exhaustion.
    pub last_critique: Option<Critique>,
}

enum Phase {
    Propose,
    Evaluate(ArtifactPayload),
    Exhausted,
}

/// Generic iterate-until-accepted loop shared by every generation agent.
///
/// Runs an explicit Propose/Evaluate cycle: each proposal is scored against the
/// agent's acceptance checks, failed checks become the critique seeding the
/// next proposal, and the loop stops on first acceptance or after
/// `max_attempts`. On exhaustion the best-scoring attempt is returned tagged
/// unaccepted; later attempts are not assumed to dominate earlier ones under a
/// non-deterministic generator. A proposal that times out or errors consumes
/// an attempt without producing a candidate.
#[derive(Debug, Clone)]
pub struct RefinementEngine {
    max_attempts: u32,
    propose_timeout: Duration,
}

impl Default for RefinementEngine {
    fn default() -> Self {
        Self { max_attempts: 3, propose_timeout: Duration::from_secs(120) }
    }
}

impl RefinementEngine {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_propose_timeout(mut self, timeout: Duration) -> Self {
        self.propose_timeout = timeout;
        self
    }

    pub async fn refine(
        &self,
        agent: &dyn GenerationAgent,
        mut input: ProposeInput,
    ) -> Result<RefinementOutcome> {
        let mut attempts: Vec<RefinementAttempt> = Vec::new();
        let mut phase = Phase::Propose;

        loop {
            match phase {
                Phase::Propose => {
                    let index = attempts.len() as u32 + 1;
                    if index > self.max_attempts {
                        phase = Phase::Exhausted;
                        continue;
                    }
                    match tokio::time::timeout(self.propose_timeout, agent.propose(&input)).await {
                        Ok(Ok(candidate)) => phase = Phase::Evaluate(candidate),
                        Ok(Err(error)) => {
                            tracing::warn!(
                                agent = agent.name(),
                                attempt = index,
                                error = %error,
                                "Proposal failed; attempt consumed"
                            );
                            attempts.push(RefinementAttempt { index, candidate: None, report: None });
                        }
                        Err(_) => {
                            tracing::warn!(
                                agent = agent.name(),
                                attempt = index,
                                timeout_secs = self.propose_timeout.as_secs(),
                                "Proposal timed out; attempt consumed"
                            );
                            attempts.push(RefinementAttempt { index, candidate: None, report: None });
                        }
                    }
                }
                Phase::Evaluate(candidate) => {
                    let index = attempts.len() as u32 + 1;
                    let report = agent.evaluate(&candidate, &input);
                    if report.all_passed() {
                        tracing::info!(
                            agent = agent.name(),
                            attempt = index,
                            "Candidate accepted"
                        );
                        return Ok(RefinementOutcome {
                            payload: candidate,
                            accepted: true,
                            attempts: index,
                            last_critique: None,
                        });
                    }
                    tracing::info!(
                        agent = agent.name(),
                        attempt = index,
                        passed = report.passed_count(),
                        total = report.results.len(),
                        "Candidate rejected"
                    );
                    input.critique = Some(report.to_critique(index));
                    attempts.push(RefinementAttempt {
                        index,
                        candidate: Some(candidate),
                        report: Some(report),
                    });
                    phase = Phase::Propose;
                }
                Phase::Exhausted => {
                    // Best attempt wins; on equal scores the earliest one does.
                    let best = attempts
                        .iter()
                        .filter(|a| a.candidate.is_some())
                        .max_by(|a, b| a.score().cmp(&b.score()).then(b.index.cmp(&a.index)))
                        .cloned();
                    let Some(best) = best else {
                        return Err(ArchError::Agent(format!(
                            "agent '{}' produced no candidate in {} attempts",
                            agent.name(),
                            self.max_attempts
                        )));
                    };
                    tracing::warn!(
                        agent = agent.name(),
                        best_attempt = best.index,
                        passed = best.score(),
                        max_attempts = self.max_attempts,
                        "Attempt budget exhausted; returning best-scoring candidate unaccepted"
                    );
                    let last_critique =
                        best.report.as_ref().map(|report| report.to_critique(best.index));
                    return Ok(RefinementOutcome {
                        payload: best.candidate.expect("filtered on candidate presence"),
                        accepted: false,
                        attempts: self.max_attempts,
                        last_critique,
                    });
                }
            }
        }
    }
}
