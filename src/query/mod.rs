//! Query engine
//!
//! A [`Session`] owns one loaded model state and answers questions against
//! it. Chunks and commands are ranked by cosine similarity, computed as a dot
//! product of unit-norm embeddings.

mod ranking;
mod session;

pub use ranking::top_k;
pub use session::Session;

use crate::config::QueryConfig;
use serde::Serialize;

/// Answer used when no chunk was selected
pub const FALLBACK_ANSWER: &str = "No relevant passage was found in the indexed corpus.";

/// Result counts for one query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub top_k_chunks: usize,
    pub top_k_commands: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            top_k_chunks: 3,
            top_k_commands: 3,
        }
    }
}

impl From<&QueryConfig> for QueryOptions {
    fn from(config: &QueryConfig) -> Self {
        Self {
            top_k_chunks: config.top_k_chunks,
            top_k_commands: config.top_k_commands,
        }
    }
}

/// Assistant answer for one question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub answer: String,
    pub supporting_chunks: Vec<SupportingChunk>,
    pub command_suggestions: Vec<CommandSuggestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupportingChunk {
    /// Source path and formatted score, e.g. `docs/a.md (relevance 0.83)`
    pub label: String,
    pub snippet: String,
    pub source_path: String,
    pub chunk_index: usize,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandSuggestion {
    pub name: String,
    /// Formatted score, e.g. `match 0.71`
    pub label: String,
    pub score: f32,
}
