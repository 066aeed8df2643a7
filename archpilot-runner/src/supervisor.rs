use archpilot_core::{ArchError, ArtifactKind, PipelineRequest, Result};
use archpilot_session::Session;
use std::collections::VecDeque;

/// Closed set of pipeline steps the supervisor can schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    Design,
    Compare,
    Diagram,
    Staffing,
}

impl StepKind {
    pub fn artifact_kind(&self) -> ArtifactKind {
        match self {
            StepKind::Design => ArtifactKind::Design,
            StepKind::Compare => ArtifactKind::Comparison,
            StepKind::Diagram => ArtifactKind::Diagram,
            StepKind::Staffing => ArtifactKind::Staffing,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Design => "design",
            StepKind::Compare => "compare",
            StepKind::Diagram => "diagram",
            StepKind::Staffing => "staffing",
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scheduled step. `selected_design` is the artifact version a downstream
/// step runs against, resolved lazily in [`Supervisor::next`].
#[derive(Debug, Clone)]
pub struct PlannedStep {
    pub kind: StepKind,
    pub mandatory: bool,
    pub selected_design: Option<u64>,
}

/// The supervisor's working state: the remaining steps, re-verified before
/// each one because downstream eligibility depends on upstream artifact
/// content, not just completion.
#[derive(Debug, Default)]
pub struct PipelinePlan {
    steps: VecDeque<PlannedStep>,
}

impl PipelinePlan {
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }

    pub fn steps(&self) -> impl Iterator<Item = &PlannedStep> {
        self.steps.iter()
    }

    fn queued_designs(&self) -> usize {
        self.steps.iter().filter(|s| s.kind == StepKind::Design).count()
    }
}

/// Outcome of asking the supervisor for the next step.
#[derive(Debug)]
pub enum NextStep {
    Run(PlannedStep),
    Done,
}

/// Decides which steps to run, in what order, against which design.
///
/// Planning is feasibility-checked upfront but each step is re-verified just
/// before it runs; an upstream design that exhausted refinement unaccepted can
/// invalidate a plan that looked satisfiable at request time.
#[derive(Debug, Default, Clone)]
pub struct Supervisor;

impl Supervisor {
    pub fn new() -> Self {
        Self
    }

    pub fn plan(&self, session: &Session, request: &PipelineRequest) -> Result<PipelinePlan> {
        let mut plan = PipelinePlan::default();
        let accepted_designs = session.accepted_count(ArtifactKind::Design);

        // Designs already accepted in the session count toward the request.
        let to_produce = (request.design_count as usize).saturating_sub(accepted_designs);
        for _ in 0..to_produce {
            plan.steps.push_back(PlannedStep {
                kind: StepKind::Design,
                mandatory: true,
                selected_design: None,
            });
        }

        let reachable_designs = accepted_designs + plan.queued_designs();

        if request.compare {
            if reachable_designs < 2 {
                return Err(ArchError::planning(
                    "design",
                    format!(
                        "comparison requires at least two designs, {reachable_designs} reachable"
                    ),
                ));
            }
            plan.steps.push_back(PlannedStep {
                kind: StepKind::Compare,
                mandatory: false,
                selected_design: None,
            });
        }

        for (flag, kind) in [(request.diagram, StepKind::Diagram), (request.staffing, StepKind::Staffing)] {
            if !flag {
                continue;
            }
            if reachable_designs == 0 {
                return Err(ArchError::planning(
                    "design",
                    format!("a {kind} step requires a design and none exists or is planned"),
                ));
            }
            plan.steps.push_back(PlannedStep {
                kind,
                mandatory: false,
                selected_design: request.selected_design,
            });
        }

        tracing::info!(
            session_key = %session.key,
            steps = plan.remaining(),
            "pipeline planned"
        );
        Ok(plan)
    }

    /// Pops the next step, re-verifying its prerequisites against the current
    /// session content.
    pub fn next(&self, session: &Session, plan: &mut PipelinePlan) -> Result<NextStep> {
        let Some(mut step) = plan.steps.pop_front() else {
            return Ok(NextStep::Done);
        };

        match step.kind {
            StepKind::Design => {}
            StepKind::Compare => {
                let accepted = session.accepted_count(ArtifactKind::Design);
                if accepted < 2 {
                    return Err(ArchError::planning(
                        "design",
                        format!("comparison requires two accepted designs, found {accepted}"),
                    ));
                }
            }
            StepKind::Diagram | StepKind::Staffing => {
                step.selected_design = Some(self.resolve_selection(session, &step)?);
            }
        }

        Ok(NextStep::Run(step))
    }

    /// Selection default chain: explicit request version, else the comparison's
    /// recommended design, else the sole accepted design.
    fn resolve_selection(&self, session: &Session, step: &PlannedStep) -> Result<u64> {
        if let Some(version) = step.selected_design {
            return match session.artifact_at(ArtifactKind::Design, version) {
                Some(artifact) if artifact.accepted => Ok(version),
                Some(_) => Err(ArchError::planning(
                    "design",
                    format!("selected design version {version} was never accepted"),
                )),
                None => Err(ArchError::planning(
                    "design",
                    format!("selected design version {version} does not exist"),
                )),
            };
        }

        if let Some(comparison) = session
            .accepted(ArtifactKind::Comparison)
            .last()
            .and_then(|a| a.payload.as_comparison())
        {
            if let Some(version) = comparison.recommended_version() {
                return Ok(version);
            }
        }

        let accepted = session.accepted(ArtifactKind::Design);
        match accepted.len() {
            0 => Err(ArchError::planning(
                "design",
                format!("a {} step requires an accepted design and none exists", step.kind),
            )),
            1 => Ok(accepted[0].version),
            n => Err(ArchError::planning(
                "comparison",
                format!("{n} accepted designs but no comparison to pick one from"),
            )),
        }
    }
}
