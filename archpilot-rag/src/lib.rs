//! # archpilot-rag
//!
//! Bounded, deterministic grounding-context retrieval for the archpilot
//! pipeline.
//!
//! A [`ContextRetriever`] fans a query out to registered [`KnowledgeSource`]s,
//! merges the ranked snippets deterministically (score, then source priority,
//! then original rank), deduplicates overlapping spans, and truncates at the
//! caller's size budget. A failed source is a warning; all sources failing is
//! an error.

pub mod inmemory;
pub mod retriever;
pub mod source;

pub use inmemory::InMemoryKnowledgeSource;
pub use retriever::{ContextRetriever, RetrievalContext};
pub use source::{KnowledgeSource, Snippet};
