//! End-to-end training run
//!
//! scan corpus -> build vocabulary -> vectorize -> train -> persist

use crate::config::{CorpusConfig, TrainingConfig};
use crate::corpus::{CorpusScanner, ScanOptions};
use crate::error::Result;
use crate::linalg::Matrix;
use crate::model::{Hyperparameters, Trainer};
use crate::store::{ModelState, ModelStore};
use crate::vocab::Vocabulary;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// What a finished training run produced
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary {
    pub artifact: PathBuf,
    pub artifact_bytes: u64,
    pub chunks: usize,
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub epochs: usize,
    pub final_loss: Option<f32>,
    pub duration_ms: u64,
}

/// Train a fresh model over the corpus at `root` and publish it through `store`.
///
/// The previous artifact, if any, is replaced only after the whole run
/// succeeded; on error nothing is written.
pub fn train_knowledge_base(
    root: &Path,
    corpus: &CorpusConfig,
    training: &TrainingConfig,
    store: &ModelStore,
) -> Result<TrainingSummary> {
    let start = Instant::now();

    let scanner = CorpusScanner::new(
        root.to_path_buf(),
        ScanOptions {
            extensions: corpus.extensions.clone(),
            excluded_dirs: corpus.excluded_dirs.clone(),
            max_chars: training.max_chars,
            max_chunks: training.max_chunks,
        },
    );
    let scanned = scanner.scan()?;
    info!("Collected {} chunks", scanned.len());

    let vocabulary = Vocabulary::build(&scanned.tokens, training.min_frequency)?;
    info!(
        "Vocabulary has {} tokens (min_frequency = {})",
        vocabulary.len(),
        training.min_frequency
    );

    let vectors: Vec<Vec<f32>> = scanned
        .tokens
        .iter()
        .map(|tokens| vocabulary.vectorize(tokens))
        .collect();
    let vectors = Matrix::from_rows(&vectors, vocabulary.len())?;

    let trainer = Trainer::new(Hyperparameters::from(training), training.backend.backend());
    let trained = trainer.fit(&vectors)?;

    let vocab_size = vocabulary.len();
    let chunks = scanned.len();
    let state = ModelState::new(vocabulary, trained.encoder, scanned.chunks, trained.embeddings)?;
    let artifact_bytes = store.save(&state)?;

    Ok(TrainingSummary {
        artifact: store.path().to_path_buf(),
        artifact_bytes,
        chunks,
        vocab_size,
        hidden_size: training.hidden_size,
        epochs: training.epochs,
        final_loss: trained.report.final_loss(),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}
