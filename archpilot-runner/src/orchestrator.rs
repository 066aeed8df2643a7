use crate::supervisor::{NextStep, PlannedStep, StepKind, Supervisor};
use archpilot_agent::{
    CompareAgent, DesignAgent, DiagramAgent, GenerationAgent, ProposeInput, RefinementEngine,
    RefinementOutcome, StaffingAgent,
};
use archpilot_core::{
    ArchError, Artifact, ArtifactKind, BundleEntry, Inference, PipelineRequest, RequirementsProfile,
    Result, ResultBundle,
};
use archpilot_gateway::{GatewayClient, TOOL_REQUIREMENTS_EXTRACTOR};
use archpilot_rag::ContextRetriever;
use archpilot_session::{STATE_REQUIREMENTS, STATE_REQUIREMENTS_PROFILE, Session, SessionStore, Turn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Cooperative cancellation handle, checked between pipeline steps. A step's
/// artifact write is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Top-level pipeline driver.
///
/// Owns the session, sequences supervisor decisions, runs each step's agent
/// under the refinement engine, and persists every produced artifact
/// immediately so a crash mid-pipeline loses at most the in-flight step.
pub struct Orchestrator {
    store: Arc<dyn SessionStore>,
    retriever: ContextRetriever,
    engine: RefinementEngine,
    supervisor: Supervisor,
    design_agent: Arc<dyn GenerationAgent>,
    compare_agent: Arc<dyn GenerationAgent>,
    diagram_agent: Arc<dyn GenerationAgent>,
    staffing_agent: Arc<dyn GenerationAgent>,
    gateway: Option<Arc<GatewayClient>>,
    session_ttl: Duration,
    context_budget: usize,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn SessionStore>, inference: Arc<dyn Inference>) -> Self {
        Self {
            store,
            retriever: ContextRetriever::new(),
            engine: RefinementEngine::new(),
            supervisor: Supervisor::new(),
            design_agent: Arc::new(DesignAgent::new(Arc::clone(&inference))),
            compare_agent: Arc::new(CompareAgent::new(Arc::clone(&inference))),
            diagram_agent: Arc::new(DiagramAgent::new(Arc::clone(&inference))),
            staffing_agent: Arc::new(StaffingAgent::new(inference)),
            gateway: None,
            session_ttl: Duration::from_secs(30 * 60),
            context_budget: 4000,
        }
    }

    #[must_use]
    pub fn with_retriever(mut self, retriever: ContextRetriever) -> Self {
        self.retriever = retriever;
        self
    }

    #[must_use]
    pub fn with_engine(mut self, engine: RefinementEngine) -> Self {
        self.engine = engine;
        self
    }

    #[must_use]
    pub fn with_gateway(mut self, gateway: Arc<GatewayClient>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_context_budget(mut self, budget_chars: usize) -> Self {
        self.context_budget = budget_chars;
        self
    }

    /// Single explicit dispatch table over the closed step set.
    fn agent_for(&self, kind: StepKind) -> &Arc<dyn GenerationAgent> {
        match kind {
            StepKind::Design => &self.design_agent,
            StepKind::Compare => &self.compare_agent,
            StepKind::Diagram => &self.diagram_agent,
            StepKind::Staffing => &self.staffing_agent,
        }
    }

    pub async fn run(&self, session_key: &str, request: PipelineRequest) -> Result<ResultBundle> {
        self.run_with_cancel(session_key, request, CancelToken::new()).await
    }

    pub async fn run_with_cancel(
        &self,
        session_key: &str,
        request: PipelineRequest,
        cancel: CancelToken,
    ) -> Result<ResultBundle> {
        let mut warnings: Vec<String> = Vec::new();

        let session = self.store.get_or_create(session_key, self.session_ttl).await?;
        let turn_text = request
            .requirement_text
            .clone()
            .unwrap_or_else(|| format!("pipeline request: {:?}", request.requested_kinds()));
        self.store.append_turn(&session.key, Turn::new("user", turn_text)).await?;

        let requirements = self.resolve_requirements(&session, &request, &mut warnings).await?;

        let session = self.store.get(&session.key).await?;
        let mut plan = self.supervisor.plan(&session, &request)?;

        loop {
            if cancel.is_cancelled() {
                tracing::info!(session_key = %session.key, "pipeline cancelled between steps");
                return Err(ArchError::Cancelled);
            }

            let current = self.store.get(&session.key).await?;
            let step = match self.supervisor.next(&current, &mut plan)? {
                NextStep::Run(step) => step,
                NextStep::Done => break,
            };

            self.execute_step(&current, &step, &requirements, &mut warnings).await?;
        }

        let session = self.store.get(&session.key).await?;
        let mut bundle = ResultBundle::new(&session.key);
        bundle.warnings = warnings;
        for kind in request.requested_kinds() {
            if let Some(artifact) = session.latest(kind) {
                bundle.artifacts.insert(
                    kind,
                    BundleEntry { artifact: artifact.clone(), accepted: artifact.accepted },
                );
            }
        }

        let summary = bundle
            .artifacts
            .iter()
            .map(|(kind, entry)| format!("{kind} v{}", entry.artifact.version))
            .collect::<Vec<_>>()
            .join(", ");
        self.store.append_turn(&session.key, Turn::new("pipeline", format!("produced: {summary}"))).await?;

        Ok(bundle)
    }

    /// Runs one planned step: retrieve grounding context, refine the agent's
    /// candidate, persist the result. A degraded (unaccepted) artifact fails
    /// the pipeline only when the step is mandatory.
    async fn execute_step(
        &self,
        session: &Session,
        step: &PlannedStep,
        requirements: &str,
        warnings: &mut Vec<String>,
    ) -> Result<()> {
        let agent = self.agent_for(step.kind);
        tracing::info!(
            session_key = %session.key,
            step = %step.kind,
            agent = agent.name(),
            "running pipeline step"
        );

        let query = format!("{} {}", step.kind, requirements);
        let context = self.retriever.retrieve(&query, self.context_budget).await?;
        warnings.extend(context.warnings.iter().cloned());

        let priors = self.priors_for(session, step)?;
        let input = ProposeInput::new(requirements).with_context(context).with_priors(priors);

        let outcome = match self.engine.refine(agent.as_ref(), input).await {
            Ok(outcome) => outcome,
            Err(error) if step.mandatory => {
                return Err(ArchError::Pipeline(format!(
                    "mandatory step '{}' produced no artifact: {error}",
                    step.kind
                )));
            }
            Err(error) => {
                tracing::warn!(step = %step.kind, error = %error, "step skipped");
                warnings.push(format!("step '{}' produced no artifact: {error}", step.kind));
                return Ok(());
            }
        };

        self.persist_outcome(session, step, agent.name(), outcome, warnings).await
    }

    async fn persist_outcome(
        &self,
        session: &Session,
        step: &PlannedStep,
        producer: &str,
        outcome: RefinementOutcome,
        warnings: &mut Vec<String>,
    ) -> Result<()> {
        let version = session.next_version(step.kind.artifact_kind());
        let artifact = Artifact::new(version, producer, outcome.payload)
            .with_acceptance(outcome.accepted, outcome.attempts);
        self.store.append_artifact(&session.key, artifact).await?;

        if outcome.accepted {
            return Ok(());
        }

        let critique = outcome
            .last_critique
            .map(|c| c.failed_checks.join("; "))
            .unwrap_or_else(|| "no critique recorded".to_string());
        if step.mandatory {
            return Err(ArchError::Pipeline(format!(
                "mandatory step '{}' exhausted {} attempts; last critique: {critique}",
                step.kind, outcome.attempts
            )));
        }
        warnings.push(format!(
            "step '{}' accepted no candidate in {} attempts; best attempt kept unaccepted ({critique})",
            step.kind, outcome.attempts
        ));
        Ok(())
    }

    fn priors_for(&self, session: &Session, step: &PlannedStep) -> Result<Vec<Artifact>> {
        match step.kind {
            StepKind::Design | StepKind::Compare => {
                Ok(session.accepted(ArtifactKind::Design).into_iter().cloned().collect())
            }
            StepKind::Diagram | StepKind::Staffing => {
                let version = step.selected_design.ok_or_else(|| {
                    ArchError::planning("design", format!("{} step has no selected design", step.kind))
                })?;
                let artifact = session.artifact_at(ArtifactKind::Design, version).ok_or_else(|| {
                    ArchError::planning(
                        "design",
                        format!("selected design version {version} does not exist"),
                    )
                })?;
                Ok(vec![artifact.clone()])
            }
        }
    }

    /// Resolves the requirement text driving this run.
    ///
    /// Fresh document text goes through the gateway's requirements extractor
    /// when one is configured; extraction failure falls back to the raw text
    /// with a warning rather than failing the run.
    async fn resolve_requirements(
        &self,
        session: &Session,
        request: &PipelineRequest,
        warnings: &mut Vec<String>,
    ) -> Result<String> {
        let Some(text) = &request.requirement_text else {
            return session
                .requirements()
                .map(str::to_string)
                .ok_or_else(|| {
                    ArchError::Config(
                        "request carries no requirement text and the session holds none".into(),
                    )
                });
        };

        self.store
            .put_state(
                &session.key,
                STATE_REQUIREMENTS,
                serde_json::Value::String(text.clone()),
            )
            .await?;

        let Some(gateway) = &self.gateway else {
            return Ok(text.clone());
        };

        let args = serde_json::json!({ "document_text": text });
        match gateway.invoke(TOOL_REQUIREMENTS_EXTRACTOR, args).await {
            Ok(payload) => {
                let profile_value = payload.get("requirements").cloned().unwrap_or(payload);
                match serde_json::from_value::<RequirementsProfile>(profile_value.clone()) {
                    Ok(profile) => {
                        self.store
                            .put_state(&session.key, STATE_REQUIREMENTS_PROFILE, profile_value)
                            .await?;
                        tracing::info!(session_key = %session.key, "structured requirements extracted");
                        Ok(profile.to_prompt_text())
                    }
                    Err(e) => {
                        warnings.push(format!(
                            "requirements extractor returned an unusable profile ({e}); using raw text"
                        ));
                        Ok(text.clone())
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "requirements extraction failed; using raw text");
                warnings.push(format!("requirements extraction failed ({e}); using raw text"));
                Ok(text.clone())
            }
        }
    }
}
