use archpilot_core::{ArchError, Inference, InferenceRequest, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Inference client that replays canned replies per template id.
///
/// Replies for a template are consumed in order; the last one repeats once the
/// script runs out, so refinement loops can keep iterating in tests.
pub struct ScriptedInference {
    name: String,
    scripts: Mutex<HashMap<String, Vec<String>>>,
}

impl ScriptedInference {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), scripts: Mutex::new(HashMap::new()) }
    }

    #[must_use]
    pub fn with_reply(self, template_id: impl Into<String>, reply: impl Into<String>) -> Self {
        self.scripts.lock().unwrap().entry(template_id.into()).or_default().push(reply.into());
        self
    }

    #[must_use]
    pub fn with_replies<I, S>(self, template_id: impl Into<String>, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let template_id = template_id.into();
        {
            let mut scripts = self.scripts.lock().unwrap();
            let entry = scripts.entry(template_id).or_default();
            entry.extend(replies.into_iter().map(Into::into));
        }
        self
    }
}

#[async_trait]
impl Inference for ScriptedInference {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, req: InferenceRequest) -> Result<String> {
        let mut scripts = self.scripts.lock().unwrap();
        let replies = scripts.get_mut(&req.template_id).ok_or_else(|| {
            ArchError::Inference(format!("no scripted reply for template '{}'", req.template_id))
        })?;

        if replies.len() > 1 {
            Ok(replies.remove(0))
        } else {
            replies
                .first()
                .cloned()
                .ok_or_else(|| ArchError::Inference("scripted reply list empty".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_consumed_in_order_then_repeat() {
        let mock = ScriptedInference::new("mock")
            .with_replies("design_candidate", ["first", "second"]);

        let req = || InferenceRequest::new("design_candidate");
        assert_eq!(mock.generate(req()).await.unwrap(), "first");
        assert_eq!(mock.generate(req()).await.unwrap(), "second");
        assert_eq!(mock.generate(req()).await.unwrap(), "second");
    }

    #[tokio::test]
    async fn test_unknown_template_errors() {
        let mock = ScriptedInference::new("mock");
        let err = mock.generate(InferenceRequest::new("missing")).await.unwrap_err();
        assert!(matches!(err, ArchError::Inference(_)));
    }
}
