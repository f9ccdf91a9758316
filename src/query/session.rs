use super::ranking::top_k;
use super::{CommandSuggestion, QueryOptions, Reply, SupportingChunk, FALLBACK_ANSWER};
use crate::commands::CommandRecord;
use crate::error::{AssistError, Result};
use crate::linalg::{dot, BackendKind, LinAlg, Matrix};
use crate::model::Encoder;
use crate::store::{ModelState, ModelStore};
use crate::text::tokenize;
use crate::vocab::{is_zero, Vocabulary};
use std::fmt;

/// Handle on a loaded model.
///
/// Built once by [`Session::open`] and then queried any number of times.
/// Queries never mutate the session, so it can be shared across threads.
pub struct Session {
    vocabulary: Vocabulary,
    encoder: Encoder,
    chunk_texts: Vec<String>,
    chunk_sources: Vec<(String, String)>,
    chunk_embeddings: Matrix,
    backend: &'static dyn LinAlg,
}

impl Session {
    /// Load the artifact behind `store`
    pub fn open(store: &ModelStore, backend: BackendKind) -> Result<Self> {
        let state = store.load()?;
        Self::from_state(state, backend)
    }

    /// Wrap an in-memory state; fails when its dimensions disagree
    pub fn from_state(state: ModelState, backend: BackendKind) -> Result<Self> {
        state.validate()?;
        let encoder = Encoder::new(state.encoder_weights, state.encoder_bias)?;
        Ok(Self {
            vocabulary: state.vocabulary,
            encoder,
            chunk_texts: state.chunk_texts,
            chunk_sources: state.chunk_sources,
            chunk_embeddings: state.chunk_embeddings,
            backend: backend.backend(),
        })
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn num_chunks(&self) -> usize {
        self.chunk_texts.len()
    }

    pub fn hidden_size(&self) -> usize {
        self.encoder.hidden_size()
    }

    /// Answer `question` and rank `commands` against it.
    ///
    /// Fails with [`AssistError::UnknownVocabularyQuery`] when the question
    /// shares no token with the trained vocabulary.
    pub fn ask(
        &self,
        question: &str,
        commands: &[CommandRecord],
        options: &QueryOptions,
    ) -> Result<Reply> {
        let query = self.embed_question(question)?;

        let supporting_chunks = self.rank_chunks(&query, options.top_k_chunks)?;
        let command_suggestions = self.rank_commands(&query, commands, options.top_k_commands)?;

        let answer = supporting_chunks
            .first()
            .map(|chunk| chunk.snippet.clone())
            .unwrap_or_else(|| FALLBACK_ANSWER.to_string());

        tracing::debug!(
            "Answered with {} chunks and {} command suggestions",
            supporting_chunks.len(),
            command_suggestions.len()
        );
        Ok(Reply {
            answer,
            supporting_chunks,
            command_suggestions,
        })
    }

    fn embed_question(&self, question: &str) -> Result<Vec<f32>> {
        let vector = self.vocabulary.vectorize(tokenize(question));
        if is_zero(&vector) {
            return Err(AssistError::UnknownVocabularyQuery {
                question: question.to_string(),
            });
        }
        self.encoder.encode(self.backend, &vector)
    }

    fn rank_chunks(&self, query: &[f32], k: usize) -> Result<Vec<SupportingChunk>> {
        let scores = self
            .backend
            .matmul_nt(&self.chunk_embeddings, &Matrix::row_vector(query))?;
        let scores = scores.as_slice();

        Ok(top_k(scores, k)
            .into_iter()
            .map(|idx| {
                let score = scores[idx];
                let (source_path, _) = &self.chunk_sources[idx];
                SupportingChunk {
                    label: format!("{} (relevance {:.2})", source_path, score),
                    snippet: self.chunk_texts[idx].trim().to_string(),
                    source_path: source_path.clone(),
                    chunk_index: idx,
                    score,
                }
            })
            .collect())
    }

    fn rank_commands(
        &self,
        query: &[f32],
        commands: &[CommandRecord],
        k: usize,
    ) -> Result<Vec<CommandSuggestion>> {
        let mut names = Vec::new();
        let mut vectors = Vec::new();
        for command in commands {
            let vector = self.vocabulary.vectorize_text(&command.search_text());
            if is_zero(&vector) {
                continue;
            }
            names.push(command.name.as_str());
            vectors.push(vector);
        }
        if vectors.is_empty() {
            return Ok(Vec::new());
        }

        let inputs = Matrix::from_rows(&vectors, self.vocabulary.len())?;
        let embeddings = self.encoder.encode_batch(self.backend, &inputs)?;
        let scores: Vec<f32> = embeddings.iter_rows().map(|row| dot(row, query)).collect();

        Ok(top_k(&scores, k)
            .into_iter()
            .map(|idx| CommandSuggestion {
                name: names[idx].to_string(),
                label: format!("match {:.2}", scores[idx]),
                score: scores[idx],
            })
            .collect())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("vocab_size", &self.vocabulary.len())
            .field("hidden_size", &self.hidden_size())
            .field("num_chunks", &self.num_chunks())
            .field("backend", &self.backend.name())
            .finish()
    }
}
