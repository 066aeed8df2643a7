use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Architectural layer a service or role belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceLayer {
    Compute,
    Storage,
    Database,
    Networking,
    Security,
    Monitoring,
    Other,
}

impl ServiceLayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceLayer::Compute => "compute",
            ServiceLayer::Storage => "storage",
            ServiceLayer::Database => "database",
            ServiceLayer::Networking => "networking",
            ServiceLayer::Security => "security",
            ServiceLayer::Monitoring => "monitoring",
            ServiceLayer::Other => "other",
        }
    }
}

impl std::fmt::Display for ServiceLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One candidate cloud architecture produced by the design agent.
///
/// Services are grouped by layer so acceptance checks and the staffing agent can
/// reason about layer coverage without re-classifying service names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignCandidate {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub compute_services: Vec<String>,
    #[serde(default)]
    pub storage_services: Vec<String>,
    #[serde(default)]
    pub database_services: Vec<String>,
    #[serde(default)]
    pub networking_services: Vec<String>,
    #[serde(default)]
    pub security_services: Vec<String>,
    #[serde(default)]
    pub monitoring_services: Vec<String>,
    #[serde(default)]
    pub other_services: Vec<String>,
    #[serde(default)]
    pub data_flow: String,
    #[serde(default)]
    pub estimated_monthly_cost: String,
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub cons: Vec<String>,
}

impl DesignCandidate {
    fn groups(&self) -> [(ServiceLayer, &Vec<String>); 7] {
        [
            (ServiceLayer::Compute, &self.compute_services),
            (ServiceLayer::Storage, &self.storage_services),
            (ServiceLayer::Database, &self.database_services),
            (ServiceLayer::Networking, &self.networking_services),
            (ServiceLayer::Security, &self.security_services),
            (ServiceLayer::Monitoring, &self.monitoring_services),
            (ServiceLayer::Other, &self.other_services),
        ]
    }

    /// Every service name referenced by the candidate, in declaration order.
    pub fn components(&self) -> Vec<&str> {
        self.groups().into_iter().flat_map(|(_, g)| g.iter().map(String::as_str)).collect()
    }

    /// Layers with at least one service declared.
    pub fn layers(&self) -> Vec<ServiceLayer> {
        self.groups()
            .into_iter()
            .filter(|(_, g)| !g.is_empty())
            .map(|(layer, _)| layer)
            .collect()
    }

    /// Set of service names, used to judge structural distinctness between candidates.
    pub fn service_set(&self) -> BTreeSet<String> {
        self.components().into_iter().map(|s| s.to_string()).collect()
    }
}

/// Score of one design against one evaluation criterion (0-100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub criterion: String,
    pub score: u8,
    #[serde(default)]
    pub notes: String,
}

/// Comparison row for one input design, referencing it by artifact version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    pub design_name: String,
    pub design_version: u64,
    pub overall_score: u8,
    pub scores: Vec<CriterionScore>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
}

impl ComparisonEntry {
    pub fn score_for(&self, criterion: &str) -> Option<u8> {
        self.scores.iter().find(|s| s.criterion == criterion).map(|s| s.score)
    }
}

/// Per-criterion scored comparison across all accepted designs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub entries: Vec<ComparisonEntry>,
    pub recommended: String,
    #[serde(default)]
    pub rationale: String,
}

impl Comparison {
    /// Artifact version of the recommended design, if the recommendation
    /// names one of the compared designs.
    pub fn recommended_version(&self) -> Option<u64> {
        self.entries.iter().find(|e| e.design_name == self.recommended).map(|e| e.design_version)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramEdge {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub label: String,
}

/// Diagram source description for one selected design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramSource {
    pub format: String,
    pub source: String,
    pub nodes: Vec<String>,
    #[serde(default)]
    pub edges: Vec<DiagramEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub title: String,
    pub layer: ServiceLayer,
    pub count: u32,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhasePlan {
    pub name: String,
    pub duration_weeks: u32,
    #[serde(default)]
    pub activities: Vec<String>,
}

/// Role and timeline plan for delivering one selected design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffingPlan {
    pub roles: Vec<RoleAssignment>,
    #[serde(default)]
    pub phases: Vec<PhasePlan>,
    #[serde(default)]
    pub total_duration_weeks: u32,
}

impl StaffingPlan {
    pub fn covers_layer(&self, layer: ServiceLayer) -> bool {
        self.roles.iter().any(|r| r.layer == layer && r.count > 0)
    }
}

/// Structured requirements profile returned by the gateway's
/// `requirements_extractor` tool. Stored in session state, not as an artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementsProfile {
    #[serde(default)]
    pub project_summary: String,
    #[serde(default)]
    pub functional_requirements: Vec<String>,
    #[serde(default)]
    pub security_requirements: Vec<String>,
    #[serde(default)]
    pub technical_constraints: Vec<String>,
    #[serde(default)]
    pub integration_requirements: Vec<String>,
    #[serde(default)]
    pub budget_constraints: Option<String>,
}

impl RequirementsProfile {
    /// Flatten the profile back into prompt-ready text.
    pub fn to_prompt_text(&self) -> String {
        let mut out = String::new();
        if !self.project_summary.is_empty() {
            out.push_str(&format!("Summary: {}\n", self.project_summary));
        }
        for (heading, items) in [
            ("Functional requirements", &self.functional_requirements),
            ("Security requirements", &self.security_requirements),
            ("Technical constraints", &self.technical_constraints),
            ("Integration requirements", &self.integration_requirements),
        ] {
            if !items.is_empty() {
                out.push_str(&format!("{heading}:\n"));
                for item in items {
                    out.push_str(&format!("- {item}\n"));
                }
            }
        }
        if let Some(budget) = &self.budget_constraints {
            out.push_str(&format!("Budget: {budget}\n"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_design() -> DesignCandidate {
        DesignCandidate {
            name: "Balanced".into(),
            description: "Balanced cost and performance".into(),
            compute_services: vec!["Lambda".into(), "Fargate".into()],
            storage_services: vec!["S3".into()],
            database_services: vec!["DynamoDB".into()],
            networking_services: vec!["API Gateway".into()],
            security_services: vec![],
            monitoring_services: vec![],
            other_services: vec![],
            data_flow: String::new(),
            estimated_monthly_cost: "$500-1000".into(),
            pros: vec![],
            cons: vec![],
        }
    }

    #[test]
    fn test_components_in_declaration_order() {
        let design = sample_design();
        assert_eq!(design.components(), vec!["Lambda", "Fargate", "S3", "DynamoDB", "API Gateway"]);
    }

    #[test]
    fn test_layers_skips_empty_groups() {
        let design = sample_design();
        let layers = design.layers();
        assert!(layers.contains(&ServiceLayer::Compute));
        assert!(layers.contains(&ServiceLayer::Networking));
        assert!(!layers.contains(&ServiceLayer::Security));
    }

    #[test]
    fn test_recommended_version() {
        let comparison = Comparison {
            entries: vec![
                ComparisonEntry {
                    design_name: "Balanced".into(),
                    design_version: 1,
                    overall_score: 80,
                    scores: vec![],
                    strengths: vec![],
                    weaknesses: vec![],
                },
                ComparisonEntry {
                    design_name: "Cost-Optimized".into(),
                    design_version: 2,
                    overall_score: 70,
                    scores: vec![],
                    strengths: vec![],
                    weaknesses: vec![],
                },
            ],
            recommended: "Cost-Optimized".into(),
            rationale: String::new(),
        };
        assert_eq!(comparison.recommended_version(), Some(2));
    }

    #[test]
    fn test_design_roundtrip_with_missing_optionals() {
        let json = r#"{"name":"Minimal","description":"d","compute_services":["EC2"]}"#;
        let design: DesignCandidate = serde_json::from_str(json).unwrap();
        assert_eq!(design.components(), vec!["EC2"]);
        assert!(design.pros.is_empty());
    }
}
