use crate::source::{KnowledgeSource, Snippet};
use archpilot_core::{ArchError, Result};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

/// Ranked, bounded grounding context assembled for one agent invocation.
///
/// Ephemeral: built fresh per invocation and never cached beyond it.
#[derive(Debug, Clone, Default)]
pub struct RetrievalContext {
    pub snippets: Vec<Snippet>,
    pub total_chars: usize,
    pub warnings: Vec<String>,
}

impl RetrievalContext {
    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    /// Renders the context as a prompt block, one snippet per paragraph with
    /// its source attribution.
    pub fn to_prompt_block(&self) -> String {
        let mut block = String::new();
        for snippet in &self.snippets {
            block.push_str(&format!("[{}] {}\n", snippet.source_id, snippet.text));
        }
        block
    }
}

/// Merges ranked snippets from several knowledge sources into one bounded,
/// deterministically ordered context.
///
/// Source priority is registration order. A source that errors or times out is
/// skipped with a warning; retrieval fails only when every source does.
pub struct ContextRetriever {
    sources: Vec<Arc<dyn KnowledgeSource>>,
    top_k: usize,
    source_timeout: Duration,
}

impl ContextRetriever {
    pub fn new() -> Self {
        Self { sources: Vec::new(), top_k: 5, source_timeout: Duration::from_secs(10) }
    }

    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn KnowledgeSource>) -> Self {
        self.sources.push(source);
        self
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Retrieves and merges grounding context for `query`, truncating once the
    /// cumulative snippet size would exceed `budget_chars`.
    pub async fn retrieve(&self, query: &str, budget_chars: usize) -> Result<RetrievalContext> {
        if self.sources.is_empty() {
            return Ok(RetrievalContext::default());
        }

        let queries = self.sources.iter().map(|source| {
            let source = Arc::clone(source);
            let query = query.to_string();
            let timeout = self.source_timeout;
            async move {
                match tokio::time::timeout(timeout, source.query(&query, self.top_k)).await {
                    Ok(Ok(snippets)) => Ok(snippets),
                    Ok(Err(e)) => Err(format!("source '{}' failed: {e}", source.id())),
                    Err(_) => Err(format!("source '{}' timed out", source.id())),
                }
            }
        });

        let results = join_all(queries).await;

        let mut warnings = Vec::new();
        let mut ranked: Vec<(Snippet, usize, usize)> = Vec::new();
        let mut live_sources = 0usize;

        for (priority, result) in results.into_iter().enumerate() {
            match result {
                Ok(snippets) => {
                    live_sources += 1;
                    for (rank, snippet) in snippets.into_iter().enumerate() {
                        ranked.push((snippet, priority, rank));
                    }
                }
                Err(warning) => {
                    tracing::warn!(warning = %warning, "knowledge source skipped");
                    warnings.push(warning);
                }
            }
        }

        if live_sources == 0 {
            return Err(ArchError::Retrieval(format!(
                "all {} knowledge sources unavailable: {}",
                self.sources.len(),
                warnings.join("; ")
            )));
        }

        // Stable merge order: score desc, then source priority, then original
        // rank within the source. Identical inputs produce identical output.
        ranked.sort_by(|(a, a_priority, a_rank), (b, b_priority, b_rank)| {
            b.score
                .total_cmp(&a.score)
                .then(a_priority.cmp(b_priority))
                .then(a_rank.cmp(b_rank))
        });

        let mut context = RetrievalContext { warnings, ..Default::default() };
        for (snippet, _, _) in ranked {
            if context.snippets.iter().any(|kept| kept.overlaps(&snippet)) {
                continue;
            }
            if context.total_chars + snippet.text.len() > budget_chars {
                break;
            }
            context.total_chars += snippet.text.len();
            context.snippets.push(snippet);
        }

        tracing::debug!(
            snippets = context.snippets.len(),
            total_chars = context.total_chars,
            "grounding context assembled"
        );
        Ok(context)
    }
}

impl Default for ContextRetriever {
    fn default() -> Self {
        Self::new()
    }
}
