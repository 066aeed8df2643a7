use archpilot_core::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One ranked snippet returned by a knowledge source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub source_id: String,
    pub text: String,
    pub score: f32,
    /// Character span of the snippet within its source document, used to
    /// detect near-identical snippets during the merge.
    pub span: (usize, usize),
}

impl Snippet {
    pub fn overlaps(&self, other: &Snippet) -> bool {
        self.source_id == other.source_id
            && self.span.0 < other.span.1
            && other.span.0 < self.span.1
    }
}

/// One logical knowledge base (design patterns, architecture references,
/// diagram vocabulary). Implementations issue a similarity query and return
/// ranked snippets, highest score first.
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    fn id(&self) -> &str;
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<Snippet>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet(source_id: &str, span: (usize, usize)) -> Snippet {
        Snippet { source_id: source_id.into(), text: String::new(), score: 1.0, span }
    }

    #[test]
    fn test_overlap_same_source() {
        assert!(snippet("a", (0, 100)).overlaps(&snippet("a", (50, 150))));
        assert!(!snippet("a", (0, 100)).overlaps(&snippet("a", (100, 200))));
    }

    #[test]
    fn test_no_overlap_across_sources() {
        assert!(!snippet("a", (0, 100)).overlaps(&snippet("b", (0, 100))));
    }
}
