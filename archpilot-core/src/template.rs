use crate::{ArchError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Regex pattern matching template placeholders like {requirements} or {critique?}
static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_placeholder_regex() -> &'static Regex {
    PLACEHOLDER_REGEX.get_or_init(|| Regex::new(r"\{+[^{}]*\}+").expect("Invalid regex pattern"))
}

/// Checks if a string is a valid identifier: starts with a letter or underscore,
/// followed by letters, digits, or underscores.
fn is_identifier(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }

    let mut chars = s.chars();
    let first = chars.next().unwrap();

    if !first.is_alphabetic() && first != '_' {
        return false;
    }

    chars.all(|c| c.is_alphanumeric() || c == '_')
}

pub const TEMPLATE_DESIGN: &str = "design_candidate";
pub const TEMPLATE_COMPARE: &str = "compare_designs";
pub const TEMPLATE_DIAGRAM: &str = "diagram_source";
pub const TEMPLATE_STAFFING: &str = "staffing_plan";

const DESIGN_TEMPLATE: &str = r#"You are an expert cloud solutions architect.

Generate ONE architecture design candidate for the requirements below. The
candidate must be structurally distinct from any previously generated candidate.

REQUIREMENTS:
{requirements}

GROUNDING CONTEXT:
{context?}

PREVIOUS CANDIDATES (produce a different service mix):
{priors?}

{critique?}

Respond with exactly one JSON object:
{
  "name": "...",
  "description": "...",
  "compute_services": ["..."],
  "storage_services": ["..."],
  "database_services": ["..."],
  "networking_services": ["..."],
  "security_services": ["..."],
  "monitoring_services": ["..."],
  "other_services": [],
  "data_flow": "...",
  "estimated_monthly_cost": "...",
  "pros": ["..."],
  "cons": ["..."]
}"#;

const COMPARE_TEMPLATE: &str = r#"You are a cloud architecture evaluation expert.

Score every design below on every criterion (0-100) and recommend one.

CRITERIA: {criteria}

DESIGNS:
{priors}

GROUNDING CONTEXT:
{context?}

{critique?}

Respond with exactly one JSON object:
{
  "entries": [
    {
      "design_name": "...",
      "design_version": 1,
      "overall_score": 0,
      "scores": [{"criterion": "...", "score": 0, "notes": "..."}],
      "strengths": ["..."],
      "weaknesses": ["..."]
    }
  ],
  "recommended": "...",
  "rationale": "..."
}"#;

const DIAGRAM_TEMPLATE: &str = r#"You are a cloud architecture diagram expert.

Produce a mermaid diagram description for the selected design. Every service
named in the design must appear as a node.

SELECTED DESIGN:
{design}

GROUNDING CONTEXT:
{context?}

{critique?}

Respond with exactly one JSON object:
{
  "format": "mermaid",
  "source": "graph TD\n ...",
  "nodes": ["..."],
  "edges": [{"from": "...", "to": "...", "label": "..."}]
}"#;

const STAFFING_TEMPLATE: &str = r#"You are a delivery planning expert.

Produce a staffing and timeline plan for the selected design. Cover every
architectural layer the design uses with at least one role.

SELECTED DESIGN:
{design}

GROUNDING CONTEXT:
{context?}

{critique?}

Respond with exactly one JSON object:
{
  "roles": [{"title": "...", "layer": "compute", "count": 1, "skills": ["..."]}],
  "phases": [{"name": "...", "duration_weeks": 4, "activities": ["..."]}],
  "total_duration_weeks": 12
}"#;

/// Registry of prompt templates keyed by template id.
///
/// Placeholder syntax follows `{var}` for required variables (render errors if
/// missing) and `{var?}` for optional ones (replaced by the empty string).
/// Anything that is not a valid identifier, such as the JSON schema braces in
/// the built-in templates, passes through as a literal.
pub struct PromptLibrary {
    templates: HashMap<String, String>,
}

impl PromptLibrary {
    pub fn new() -> Self {
        let mut library = Self { templates: HashMap::new() };
        library.register(TEMPLATE_DESIGN, DESIGN_TEMPLATE);
        library.register(TEMPLATE_COMPARE, COMPARE_TEMPLATE);
        library.register(TEMPLATE_DIAGRAM, DIAGRAM_TEMPLATE);
        library.register(TEMPLATE_STAFFING, STAFFING_TEMPLATE);
        library
    }

    pub fn register(&mut self, id: impl Into<String>, template: impl Into<String>) {
        self.templates.insert(id.into(), template.into());
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.templates.get(id).map(String::as_str)
    }

    /// Renders a template, substituting `{var}` placeholders from `variables`.
    pub fn render(&self, id: &str, variables: &HashMap<String, String>) -> Result<String> {
        let template = self
            .templates
            .get(id)
            .ok_or_else(|| ArchError::Config(format!("unknown prompt template '{id}'")))?;
        render_template(template, variables)
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Substitutes placeholders in a raw template string.
pub fn render_template(template: &str, variables: &HashMap<String, String>) -> Result<String> {
    let regex = get_placeholder_regex();
    let mut result = String::with_capacity(template.len());
    let mut last_end = 0;

    for found in regex.find_iter(template) {
        let range = found.range();
        result.push_str(&template[last_end..range.start]);

        let match_str = found.as_str();
        result.push_str(&replace_match(match_str, variables)?);

        last_end = range.end;
    }

    result.push_str(&template[last_end..]);
    Ok(result)
}

fn replace_match(match_str: &str, variables: &HashMap<String, String>) -> Result<String> {
    let var_name = match_str.trim_matches(|c| c == '{' || c == '}').trim();

    let (var_name, optional) = match var_name.strip_suffix('?') {
        Some(name) => (name, true),
        None => (var_name, false),
    };

    if !is_identifier(var_name) {
        // Not a variable name, e.g. JSON braces inside a schema block.
        return Ok(match_str.to_string());
    }

    match variables.get(var_name) {
        Some(value) => Ok(value.clone()),
        None if optional => Ok(String::new()),
        None => Err(ArchError::Config(format!("template variable '{var_name}' not provided"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("valid_name"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("name123"));
        assert!(!is_identifier("123invalid"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("with-dash"));
    }

    #[test]
    fn test_render_required_and_optional() {
        let vars =
            HashMap::from([("requirements".to_string(), "stateless web API".to_string())]);
        let out = render_template("REQ: {requirements}\nCRIT: {critique?}", &vars).unwrap();
        assert_eq!(out, "REQ: stateless web API\nCRIT: ");
    }

    #[test]
    fn test_render_missing_required_errors() {
        let err = render_template("{requirements}", &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("requirements"));
    }

    #[test]
    fn test_json_schema_braces_pass_through() {
        let vars = HashMap::from([("name".to_string(), "x".to_string())]);
        let out = render_template("{name} -> {\"score\": 0}", &vars).unwrap();
        assert!(out.contains("{\"score\": 0}"));
    }

    #[test]
    fn test_builtin_templates_registered() {
        let library = PromptLibrary::new();
        for id in [TEMPLATE_DESIGN, TEMPLATE_COMPARE, TEMPLATE_DIAGRAM, TEMPLATE_STAFFING] {
            assert!(library.get(id).is_some(), "missing template {id}");
        }
    }

    #[test]
    fn test_builtin_design_template_renders() {
        let library = PromptLibrary::new();
        let vars =
            HashMap::from([("requirements".to_string(), "relational store".to_string())]);
        let out = library.render(TEMPLATE_DESIGN, &vars).unwrap();
        assert!(out.contains("relational store"));
        assert!(out.contains("compute_services"));
    }
}
