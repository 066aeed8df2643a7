//! End-to-end pipeline scenarios on the scripted inference mock.

use archpilot_core::{
    ArchError, ArtifactKind, Inference, PipelineRequest, TEMPLATE_COMPARE, TEMPLATE_DESIGN,
    TEMPLATE_DIAGRAM,
};
use archpilot_gateway::{GatewayClient, GatewayTransport, StaticTokenProvider, TransportError};
use archpilot_model::ScriptedInference;
use archpilot_rag::{ContextRetriever, InMemoryKnowledgeSource};
use archpilot_runner::{CancelToken, Orchestrator};
use archpilot_session::{InMemorySessionStore, STATE_REQUIREMENTS_PROFILE, SessionStore};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

fn design_reply(name: &str, compute: &str, storage: &str, networking: &str) -> String {
    json!({
        "name": name,
        "description": format!("{name} architecture"),
        "compute_services": [compute],
        "storage_services": [storage],
        "database_services": ["RDS"],
        "networking_services": [networking],
        "security_services": [],
        "monitoring_services": [],
        "other_services": [],
        "data_flow": "client -> api -> db",
        "estimated_monthly_cost": "$800",
        "pros": ["simple"],
        "cons": ["single region"]
    })
    .to_string()
}

fn comparison_reply() -> String {
    let criteria = ["operational-excellence", "security", "reliability", "performance", "cost"];
    let scores: Vec<Value> = criteria
        .iter()
        .map(|c| json!({"criterion": c, "score": 75, "notes": ""}))
        .collect();
    json!({
        "entries": [
            {
                "design_name": "Serverless",
                "design_version": 1,
                "overall_score": 80,
                "scores": scores,
                "strengths": ["low idle cost"],
                "weaknesses": ["cold starts"]
            },
            {
                "design_name": "Containerized",
                "design_version": 2,
                "overall_score": 74,
                "scores": scores,
                "strengths": ["portable"],
                "weaknesses": ["cluster overhead"]
            }
        ],
        "recommended": "Serverless",
        "rationale": "lowest operational burden for a stateless API"
    })
    .to_string()
}

fn build_orchestrator(inference: Arc<dyn Inference>) -> (Orchestrator, Arc<InMemorySessionStore>) {
    let store = Arc::new(InMemorySessionStore::new());
    (Orchestrator::new(Arc::clone(&store) as Arc<dyn SessionStore>, inference), store)
}

#[tokio::test]
async fn test_two_designs_and_comparison() {
    let inference = Arc::new(
        ScriptedInference::new("mock")
            .with_replies(
                TEMPLATE_DESIGN,
                [
                    design_reply("Serverless", "Lambda", "S3", "API Gateway"),
                    design_reply("Containerized", "ECS", "EFS", "ALB"),
                ],
            )
            .with_reply(TEMPLATE_COMPARE, comparison_reply()),
    );
    let (orchestrator, store) = build_orchestrator(inference);

    let request = PipelineRequest::designs(2)
        .with_requirements("stateless web API with a relational store")
        .with_comparison();
    let bundle = orchestrator.run("s1", request).await.unwrap();

    assert!(bundle.is_fully_accepted());
    let design = bundle.entry(ArtifactKind::Design).unwrap();
    assert_eq!(design.artifact.version, 2);
    let comparison = bundle.entry(ArtifactKind::Comparison).unwrap();
    assert_eq!(comparison.artifact.version, 1);

    let session = store.get("s1").await.unwrap();
    let designs = session.history(ArtifactKind::Design);
    assert_eq!(designs.len(), 2);
    assert!(designs.iter().all(|a| a.accepted));
    assert_eq!(designs[0].version, 1);
    assert_eq!(designs[1].version, 2);

    // The comparison references both designs by artifact version.
    let payload = comparison.artifact.payload.as_comparison().unwrap();
    let mut versions: Vec<u64> = payload.entries.iter().map(|e| e.design_version).collect();
    versions.sort_unstable();
    assert_eq!(versions, vec![1, 2]);
}

#[tokio::test]
async fn test_diagram_before_design_then_after() {
    let design = design_reply("Serverless", "Lambda", "S3", "API Gateway");
    let inference = Arc::new(
        ScriptedInference::new("mock")
            .with_reply(TEMPLATE_DESIGN, design)
            .with_reply(
                TEMPLATE_DIAGRAM,
                json!({
                    "format": "mermaid",
                    "source": "graph TD; Users-->APIGateway; APIGateway-->Lambda; Lambda-->S3; Lambda-->RDS",
                    "nodes": ["Users", "Lambda", "S3", "RDS", "API Gateway"],
                    "edges": [{"from": "Users", "to": "API Gateway", "label": "https"}]
                })
                .to_string(),
            ),
    );
    let (orchestrator, store) = build_orchestrator(inference);

    let premature = PipelineRequest::designs(0)
        .with_requirements("stateless web API")
        .with_diagram();
    let err = orchestrator.run("s1", premature).await.unwrap_err();
    match err {
        ArchError::Planning { missing, .. } => assert_eq!(missing, "design"),
        other => panic!("expected planning error, got {other}"),
    }

    let request = PipelineRequest::designs(1).with_requirements("stateless web API");
    orchestrator.run("s1", request).await.unwrap();

    let request = PipelineRequest::designs(0).with_diagram();
    let bundle = orchestrator.run("s1", request).await.unwrap();
    let diagram = bundle.entry(ArtifactKind::Diagram).unwrap();
    assert!(diagram.accepted);

    let session = store.get("s1").await.unwrap();
    let design = session.latest(ArtifactKind::Design).unwrap().payload.as_design().unwrap();
    let nodes = &diagram.artifact.payload.as_diagram().unwrap().nodes;
    for component in design.components() {
        assert!(nodes.iter().any(|n| n == component), "missing node {component}");
    }
}

#[tokio::test]
async fn test_mandatory_design_failure_fails_pipeline_and_keeps_best_attempt() {
    // Every design reply lacks storage and networking, so acceptance never
    // passes and the last reply repeats until the budget runs out.
    let invalid = json!({
        "name": "Thin",
        "description": "compute only",
        "compute_services": ["EC2"]
    })
    .to_string();
    let inference = Arc::new(ScriptedInference::new("mock").with_reply(TEMPLATE_DESIGN, invalid));
    let (orchestrator, store) = build_orchestrator(inference);

    let request = PipelineRequest::designs(1).with_requirements("stateless web API");
    let err = orchestrator.run("s1", request).await.unwrap_err();
    match err {
        ArchError::Pipeline(detail) => {
            assert!(detail.contains("design"), "step not named: {detail}");
            assert!(detail.contains("storage_service"), "critique not surfaced: {detail}");
        }
        other => panic!("expected pipeline error, got {other}"),
    }

    // The best attempt is still persisted, explicitly unaccepted.
    let session = store.get("s1").await.unwrap();
    let design = session.latest(ArtifactKind::Design).unwrap();
    assert!(!design.accepted);
    assert_eq!(design.attempts, 3);
}

#[tokio::test]
async fn test_degraded_comparison_continues_with_warning() {
    // The comparison never names a valid recommendation; the design step still succeeds.
    let broken_comparison = json!({
        "entries": [],
        "recommended": "Nothing",
        "rationale": ""
    })
    .to_string();
    let inference = Arc::new(
        ScriptedInference::new("mock")
            .with_replies(
                TEMPLATE_DESIGN,
                [
                    design_reply("Serverless", "Lambda", "S3", "API Gateway"),
                    design_reply("Containerized", "ECS", "EFS", "ALB"),
                ],
            )
            .with_reply(TEMPLATE_COMPARE, broken_comparison),
    );
    let (orchestrator, _store) = build_orchestrator(inference);

    let request = PipelineRequest::designs(2)
        .with_requirements("stateless web API")
        .with_comparison();
    let bundle = orchestrator.run("s1", request).await.unwrap();

    assert!(!bundle.is_fully_accepted());
    assert!(bundle.entry(ArtifactKind::Design).unwrap().accepted);
    assert!(!bundle.entry(ArtifactKind::Comparison).unwrap().accepted);
    assert!(bundle.warnings.iter().any(|w| w.contains("compare")));
}

#[tokio::test]
async fn test_cancellation_between_steps() {
    let inference = Arc::new(ScriptedInference::new("mock"));
    let (orchestrator, _store) = build_orchestrator(inference);

    let cancel = CancelToken::new();
    cancel.cancel();
    let request = PipelineRequest::designs(1).with_requirements("stateless web API");
    let err = orchestrator.run_with_cancel("s1", request, cancel).await.unwrap_err();
    assert!(matches!(err, ArchError::Cancelled));
}

#[tokio::test]
async fn test_retrieved_context_flows_into_the_run() {
    let source = Arc::new(InMemoryKnowledgeSource::new("patterns"));
    source.index_document(
        "Stateless APIs scale horizontally behind a load balancer. \
         Relational stores pair well with managed database services.",
    );
    let retriever = ContextRetriever::new().with_source(source);

    let inference = Arc::new(ScriptedInference::new("mock").with_reply(
        TEMPLATE_DESIGN,
        design_reply("Serverless", "Lambda", "S3", "API Gateway"),
    ));
    let store = Arc::new(InMemorySessionStore::new());
    let orchestrator = Orchestrator::new(Arc::clone(&store) as Arc<dyn SessionStore>, inference)
        .with_retriever(retriever);

    let request = PipelineRequest::designs(1)
        .with_requirements("stateless web API with a relational store");
    let bundle = orchestrator.run("s1", request).await.unwrap();
    assert!(bundle.is_fully_accepted());
}

/// Gateway transport replying with the nested envelope the remote tool uses.
struct ExtractorTransport;

#[async_trait]
impl GatewayTransport for ExtractorTransport {
    async fn call(
        &self,
        _tool_name: &str,
        _invocation_id: &str,
        _args: &Value,
        _token: &str,
    ) -> Result<Value, TransportError> {
        let profile = json!({
            "requirements": {
                "project_summary": "stateless web API",
                "functional_requirements": ["serve JSON over HTTPS"],
                "security_requirements": ["encrypt data at rest"],
                "technical_constraints": [],
                "integration_requirements": [],
                "budget_constraints": "under $1000/month"
            }
        });
        Ok(json!({"content": [{"text": profile.to_string()}]}))
    }
}

#[tokio::test]
async fn test_requirements_extraction_stores_profile() {
    let gateway = Arc::new(GatewayClient::new(
        Arc::new(ExtractorTransport),
        Arc::new(StaticTokenProvider::new("tok")),
    ));

    let inference = Arc::new(ScriptedInference::new("mock").with_reply(
        TEMPLATE_DESIGN,
        design_reply("Serverless", "Lambda", "S3", "API Gateway"),
    ));
    let store = Arc::new(InMemorySessionStore::new());
    let orchestrator = Orchestrator::new(Arc::clone(&store) as Arc<dyn SessionStore>, inference)
        .with_gateway(gateway);

    let request = PipelineRequest::designs(1)
        .with_requirements("We need a stateless web API with a relational store.");
    let bundle = orchestrator.run("s1", request).await.unwrap();
    assert!(bundle.warnings.is_empty());

    let session = store.get("s1").await.unwrap();
    let profile = session.state.get(STATE_REQUIREMENTS_PROFILE).expect("profile stored");
    assert_eq!(profile["project_summary"], "stateless web API");
}

#[tokio::test]
async fn test_gateway_failure_falls_back_to_raw_text() {
    struct FailingTransport;

    #[async_trait]
    impl GatewayTransport for FailingTransport {
        async fn call(
            &self,
            _tool_name: &str,
            _invocation_id: &str,
            _args: &Value,
            _token: &str,
        ) -> Result<Value, TransportError> {
            Err(TransportError::Fatal("extractor unavailable".into()))
        }
    }

    let gateway = Arc::new(GatewayClient::new(
        Arc::new(FailingTransport),
        Arc::new(StaticTokenProvider::new("tok")),
    ));
    let inference = Arc::new(ScriptedInference::new("mock").with_reply(
        TEMPLATE_DESIGN,
        design_reply("Serverless", "Lambda", "S3", "API Gateway"),
    ));
    let store = Arc::new(InMemorySessionStore::new());
    let orchestrator = Orchestrator::new(Arc::clone(&store) as Arc<dyn SessionStore>, inference)
        .with_gateway(gateway);

    let request = PipelineRequest::designs(1).with_requirements("stateless web API");
    let bundle = orchestrator.run("s1", request).await.unwrap();
    assert!(bundle.is_fully_accepted());
    assert!(bundle.warnings.iter().any(|w| w.contains("requirements extraction failed")));
}
