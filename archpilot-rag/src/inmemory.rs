use crate::source::{KnowledgeSource, Snippet};
use archpilot_core::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::RwLock;

#[derive(Debug, Clone)]
struct Chunk {
    text: String,
    span: (usize, usize),
}

/// Keyword-scored in-memory knowledge source.
///
/// Documents are split into overlapping chunks broken at sentence boundaries;
/// queries score chunks by keyword hits with a bonus for an exact phrase
/// match. Good enough for tests and small corpora; a vector store sits behind
/// the same trait in production.
pub struct InMemoryKnowledgeSource {
    id: String,
    chunk_size: usize,
    chunk_overlap: usize,
    chunks: RwLock<Vec<Chunk>>,
}

impl InMemoryKnowledgeSource {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), chunk_size: 1000, chunk_overlap: 200, chunks: RwLock::new(Vec::new()) }
    }

    #[must_use]
    pub fn with_chunking(mut self, chunk_size: usize, chunk_overlap: usize) -> Self {
        assert!(chunk_overlap < chunk_size, "overlap must be smaller than chunk size");
        self.chunk_size = chunk_size;
        self.chunk_overlap = chunk_overlap;
        self
    }

    /// Indexes a document, replacing nothing: chunks accumulate across calls.
    pub fn index_document(&self, text: &str) {
        let new_chunks = self.chunk_text(text);
        let count = new_chunks.len();
        self.chunks.write().unwrap().extend(new_chunks);
        tracing::debug!(source_id = %self.id, chunks = count, "document indexed");
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.read().unwrap().len()
    }

    fn chunk_text(&self, text: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let bytes = text.as_bytes();
        let mut start = 0;

        while start < bytes.len() {
            let mut end = (start + self.chunk_size).min(bytes.len());

            // Never split a UTF-8 code point; the slice below needs a valid
            // boundary.
            while end < bytes.len() && !text.is_char_boundary(end) {
                end += 1;
            }

            // Prefer to break at a sentence boundary. '.' is ASCII, so the
            // adjusted end stays on a char boundary.
            if end < bytes.len() {
                if let Some(dot) = text[start..end].rfind('.') {
                    if dot > 0 {
                        end = start + dot + 1;
                    }
                }
            }

            let chunk_text = text[start..end].trim();
            if !chunk_text.is_empty() {
                chunks.push(Chunk { text: chunk_text.to_string(), span: (start, end) });
            }

            if end >= bytes.len() {
                break;
            }
            // Step back by the overlap, but always make forward progress even
            // when a sentence break produced a chunk shorter than the overlap.
            let mut next = end.saturating_sub(self.chunk_overlap);
            while next > 0 && !text.is_char_boundary(next) {
                next -= 1;
            }
            start = if next > start { next } else { end };
        }

        chunks
    }

    fn keywords(text: &str) -> HashSet<String> {
        text.split_whitespace().filter(|s| !s.is_empty()).map(|s| s.to_lowercase()).collect()
    }

    fn score_chunk(chunk: &Chunk, query_lower: &str, keywords: &HashSet<String>) -> f32 {
        let chunk_lower = chunk.text.to_lowercase();
        let mut score =
            keywords.iter().filter(|keyword| chunk_lower.contains(keyword.as_str())).count() as f32;
        if chunk_lower.contains(query_lower) {
            score += 10.0;
        }
        score
    }
}

#[async_trait]
impl KnowledgeSource for InMemoryKnowledgeSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<Snippet>> {
        let query_lower = text.to_lowercase();
        let keywords = Self::keywords(&query_lower);

        let chunks = self.chunks.read().unwrap();
        let mut scored: Vec<(f32, usize)> = chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| (Self::score_chunk(chunk, &query_lower, &keywords), i))
            .collect();

        // Score desc, then chunk order for a deterministic result.
        scored.sort_by(|(a_score, a_idx), (b_score, b_idx)| {
            b_score.total_cmp(a_score).then(a_idx.cmp(b_idx))
        });

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(score, idx)| Snippet {
                source_id: self.id.clone(),
                text: chunks[idx].text.clone(),
                score,
                span: chunks[idx].span,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_query_ranks_matching_chunk_first() {
        let source = InMemoryKnowledgeSource::new("patterns").with_chunking(60, 10);
        source.index_document(
            "Relational databases suit transactional workloads. \
             Object storage is the default for static assets. \
             Content delivery networks cache at the edge.",
        );

        let snippets = source.query("relational databases", 2).await.unwrap();
        assert!(!snippets.is_empty());
        assert!(snippets[0].text.to_lowercase().contains("relational"));
        assert!(snippets[0].score >= snippets.last().unwrap().score);
    }

    #[tokio::test]
    async fn test_query_is_deterministic() {
        let source = InMemoryKnowledgeSource::new("patterns").with_chunking(40, 5);
        source.index_document("Alpha beta gamma. Delta epsilon zeta. Eta theta iota kappa.");

        let first = source.query("gamma delta", 3).await.unwrap();
        let second = source.query("gamma delta", 3).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_chunks_carry_spans() {
        let source = InMemoryKnowledgeSource::new("s").with_chunking(30, 5);
        source.index_document("One sentence here. Another sentence follows. And a third one.");
        assert!(source.chunk_count() >= 2);

        let snippets = source.query("sentence", 5).await.unwrap();
        for snippet in &snippets {
            assert!(snippet.span.1 > snippet.span.0);
        }
    }

    #[tokio::test]
    async fn test_chunking_handles_multibyte_text() {
        // Chunk size landing inside a two-byte code point must widen to the
        // next boundary instead of panicking on the slice.
        let source = InMemoryKnowledgeSource::new("s").with_chunking(5, 1);
        source.index_document("ααααααα");
        assert!(source.chunk_count() >= 1);

        let source = InMemoryKnowledgeSource::new("s").with_chunking(12, 3);
        source.index_document("Zwölf Größen. Straße überquert. Füße gemessen.");
        let snippets = source.query("Größen", 5).await.unwrap();
        assert!(snippets.iter().any(|s| s.text.contains("Größen")));
        for snippet in &snippets {
            assert!(snippet.span.1 > snippet.span.0);
        }
    }

    #[test]
    fn test_chunking_terminates_on_short_text() {
        let source = InMemoryKnowledgeSource::new("s").with_chunking(1000, 200);
        source.index_document("tiny");
        assert_eq!(source.chunk_count(), 1);
    }
}
