use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// One request to the hosted inference capability.
///
/// The caller names a prompt template and supplies the variables it needs; the
/// implementation decides how the rendered prompt reaches the model.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub template_id: String,
    pub variables: HashMap<String, String>,
    pub temperature: Option<f32>,
}

impl InferenceRequest {
    pub fn new(template_id: impl Into<String>) -> Self {
        Self { template_id: template_id.into(), variables: HashMap::new(), temperature: None }
    }

    #[must_use]
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Hosted text-generation capability.
///
/// Treated as a black box that may be slow, rate-limited, or occasionally
/// malformed; callers validate its output and retry through the refinement
/// engine rather than trusting a single reply.
#[async_trait]
pub trait Inference: Send + Sync {
    fn name(&self) -> &str;
    async fn generate(&self, req: InferenceRequest) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = InferenceRequest::new("design_candidate")
            .with_variable("requirements", "stateless web API")
            .with_temperature(0.3);
        assert_eq!(req.template_id, "design_candidate");
        assert_eq!(req.variables.get("requirements").unwrap(), "stateless web API");
        assert_eq!(req.temperature, Some(0.3));
    }
}
