//! Model persistence
//!
//! The trained state is written as one artifact:
//!
//! ```text
//! magic "AKMS" | schema version (u32 LE) | BLAKE3(payload) (32 bytes) | payload
//! payload = zstd(bincode(ModelState))
//! ```
//!
//! Writes go to a sibling `.tmp` file that is synced and then renamed over
//! the final path, so readers only ever see a complete artifact.

use crate::corpus::Chunk;
use crate::error::{AssistError, Result};
use crate::linalg::Matrix;
use crate::model::Encoder;
use crate::vocab::Vocabulary;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const MAGIC: &[u8; 4] = b"AKMS";
const DIGEST_LEN: usize = 32;
const HEADER_LEN: usize = MAGIC.len() + 4 + DIGEST_LEN;
const COMPRESSION_LEVEL: i32 = 3;

/// Which artifact schema versions can be loaded.
///
/// Only the current version is accepted; older or newer artifacts must be
/// retrained rather than migrated.
pub struct SchemaPolicy;

impl SchemaPolicy {
    pub const CURRENT: u32 = 3;

    pub fn check(path: &Path, found: u32) -> Result<()> {
        if found == Self::CURRENT {
            return Ok(());
        }
        Err(AssistError::IncompatibleModel {
            path: path.to_path_buf(),
            reason: format!(
                "schema version {} is not supported, expected {}",
                found,
                Self::CURRENT
            ),
        })
    }
}

/// Everything inference needs, produced once per training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelState {
    pub version: u32,
    pub vocabulary: Vocabulary,
    pub hidden_size: usize,
    /// `vocab_size × hidden_size`
    pub encoder_weights: Matrix,
    pub encoder_bias: Vec<f32>,
    pub chunk_texts: Vec<String>,
    /// `(source_path, snippet)` per chunk
    pub chunk_sources: Vec<(String, String)>,
    /// `num_chunks × hidden_size`, one unit-norm row per chunk
    pub chunk_embeddings: Matrix,
}

impl ModelState {
    pub fn new(
        vocabulary: Vocabulary,
        encoder: Encoder,
        chunks: Vec<Chunk>,
        chunk_embeddings: Matrix,
    ) -> Result<Self> {
        let hidden_size = encoder.hidden_size();
        let (chunk_texts, chunk_sources): (Vec<String>, Vec<(String, String)>) = chunks
            .into_iter()
            .map(|c| (c.text, (c.source_path, c.snippet)))
            .unzip();

        let state = Self {
            version: SchemaPolicy::CURRENT,
            vocabulary,
            hidden_size,
            encoder_weights: encoder.weights,
            encoder_bias: encoder.bias,
            chunk_texts,
            chunk_sources,
            chunk_embeddings,
        };
        state.validate()?;
        Ok(state)
    }

    /// Fail when the dimensions of the fields disagree
    pub fn validate(&self) -> Result<()> {
        self.check_consistency().map_err(|reason| {
            AssistError::Other(anyhow::anyhow!("inconsistent model state: {}", reason))
        })
    }

    pub fn num_chunks(&self) -> usize {
        self.chunk_texts.len()
    }

    /// Dimensions must agree across all fields
    fn check_consistency(&self) -> std::result::Result<(), String> {
        let vocab_size = self.vocabulary.len();
        if self.encoder_weights.shape() != (vocab_size, self.hidden_size) {
            return Err(format!(
                "encoder weights are {:?}, expected ({}, {})",
                self.encoder_weights.shape(),
                vocab_size,
                self.hidden_size
            ));
        }
        if self.encoder_bias.len() != self.hidden_size {
            return Err(format!(
                "encoder bias has {} entries, expected {}",
                self.encoder_bias.len(),
                self.hidden_size
            ));
        }
        if self.chunk_sources.len() != self.chunk_texts.len() {
            return Err(format!(
                "{} chunk sources for {} chunks",
                self.chunk_sources.len(),
                self.chunk_texts.len()
            ));
        }
        if self.chunk_embeddings.shape() != (self.chunk_texts.len(), self.hidden_size) {
            return Err(format!(
                "chunk embeddings are {:?}, expected ({}, {})",
                self.chunk_embeddings.shape(),
                self.chunk_texts.len(),
                self.hidden_size
            ));
        }
        Ok(())
    }
}

/// Artifact location plus the read and atomic-write logic
#[derive(Debug, Clone)]
pub struct ModelStore {
    path: PathBuf,
}

impl ModelStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Serialize and atomically publish `state`; returns the artifact size in bytes
    pub fn save(&self, state: &ModelState) -> Result<u64> {
        let encoded = bincode::serialize(state).map_err(|e| AssistError::Encoding {
            source: e,
            context: "Failed to encode model state".to_string(),
        })?;
        let payload = zstd::encode_all(&encoded[..], COMPRESSION_LEVEL).map_err(|e| {
            AssistError::io(e, "Failed to compress model state")
        })?;
        let digest = blake3::hash(&payload);

        let mut artifact = Vec::with_capacity(HEADER_LEN + payload.len());
        artifact.extend_from_slice(MAGIC);
        artifact.extend_from_slice(&state.version.to_le_bytes());
        artifact.extend_from_slice(digest.as_bytes());
        artifact.extend_from_slice(&payload);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| AssistError::Io {
                source: e,
                context: format!("Failed to create model directory: {}", parent.display()),
            })?;
        }

        let temp_path = self.temp_path();
        if let Err(e) = self.write_staging(&temp_path, &artifact) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            AssistError::Io {
                source: e,
                context: format!(
                    "Failed to publish model: {} -> {}",
                    temp_path.display(),
                    self.path.display()
                ),
            }
        })?;

        tracing::info!(
            "Model written to {} ({} bytes)",
            self.path.display(),
            artifact.len()
        );
        Ok(artifact.len() as u64)
    }

    /// Read, verify and decode the artifact.
    ///
    /// A missing file yields [`AssistError::ModelNotFound`]; any other
    /// problem (schema version, checksum, truncated or garbled data) yields
    /// [`AssistError::IncompatibleModel`].
    pub fn load(&self) -> Result<ModelState> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AssistError::ModelNotFound {
                    path: self.path.clone(),
                })
            }
            Err(e) => return Err(self.corrupted(format!("unreadable: {}", e))),
        };

        if bytes.len() < HEADER_LEN || &bytes[..MAGIC.len()] != MAGIC {
            return Err(self.corrupted("missing artifact header"));
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[MAGIC.len()..MAGIC.len() + 4]);
        SchemaPolicy::check(&self.path, u32::from_le_bytes(version))?;

        let digest = &bytes[MAGIC.len() + 4..HEADER_LEN];
        let payload = &bytes[HEADER_LEN..];
        if blake3::hash(payload).as_bytes()[..] != digest[..] {
            return Err(self.corrupted("checksum mismatch"));
        }

        let encoded = zstd::decode_all(payload)
            .map_err(|e| self.corrupted(format!("decompression failed: {}", e)))?;
        let state: ModelState = bincode::deserialize(&encoded)
            .map_err(|e| self.corrupted(format!("decoding failed: {}", e)))?;

        SchemaPolicy::check(&self.path, state.version)?;
        state.check_consistency().map_err(|reason| self.corrupted(reason))?;

        tracing::debug!(
            "Loaded model from {}: {} chunks, vocab {}",
            self.path.display(),
            state.num_chunks(),
            state.vocabulary.len()
        );
        Ok(state)
    }

    fn write_staging(&self, temp_path: &Path, artifact: &[u8]) -> Result<()> {
        let mut file = fs::File::create(temp_path).map_err(|e| AssistError::Io {
            source: e,
            context: format!("Failed to create staging file: {}", temp_path.display()),
        })?;
        file.write_all(artifact).map_err(|e| AssistError::Io {
            source: e,
            context: format!("Failed to write staging file: {}", temp_path.display()),
        })?;
        file.sync_all().map_err(|e| AssistError::Io {
            source: e,
            context: format!("Failed to sync staging file: {}", temp_path.display()),
        })?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn corrupted(&self, reason: impl std::fmt::Display) -> AssistError {
        AssistError::IncompatibleModel {
            path: self.path.clone(),
            reason: format!("corrupted artifact: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_state() -> ModelState {
        let vocabulary = Vocabulary::from(vec!["cluster".to_string(), "apply".to_string()]);
        let weights = Matrix::from_vec(2, 3, vec![0.1, -0.2, 0.3, 0.4, 0.5, -0.6]).unwrap();
        let encoder = Encoder::new(weights, vec![0.0, 0.01, -0.01]).unwrap();
        let chunks = vec![
            Chunk::new("cluster apply".to_string(), "docs/a.md".to_string()),
            Chunk::new("apply".to_string(), "docs/b.md".to_string()),
        ];
        let embeddings = Matrix::from_vec(2, 3, vec![1.0, 0.0, 0.0, 0.0, 0.6, 0.8]).unwrap();
        ModelState::new(vocabulary, encoder, chunks, embeddings).unwrap()
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = ModelStore::new(temp.path().join("nested/dir/model.bin"));
        let state = sample_state();

        let size = store.save(&state).unwrap();
        assert!(size > HEADER_LEN as u64);
        assert!(store.exists());
        assert!(!temp.path().join("nested/dir/model.bin.tmp").exists());

        let loaded = store.load().unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.vocabulary.index_of("apply"), Some(1));
        assert_eq!(loaded.chunk_sources[1], ("docs/b.md".to_string(), "apply".to_string()));
    }

    #[test]
    fn test_missing_artifact() {
        let temp = TempDir::new().unwrap();
        let store = ModelStore::new(temp.path().join("model.bin"));
        assert!(matches!(
            store.load().unwrap_err(),
            AssistError::ModelNotFound { .. }
        ));
    }

    #[test]
    fn test_version_mismatch_is_incompatible() {
        let temp = TempDir::new().unwrap();
        let store = ModelStore::new(temp.path().join("model.bin"));
        store.save(&sample_state()).unwrap();

        let mut bytes = fs::read(store.path()).unwrap();
        bytes[4..8].copy_from_slice(&2u32.to_le_bytes());
        fs::write(store.path(), &bytes).unwrap();

        match store.load().unwrap_err() {
            AssistError::IncompatibleModel { reason, .. } => {
                assert!(reason.contains("schema version 2"), "{}", reason)
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_payload_version_is_checked() {
        let temp = TempDir::new().unwrap();
        let store = ModelStore::new(temp.path().join("model.bin"));
        let mut state = sample_state();
        state.version = 99;

        // Header carries 99 as well, so the header check rejects it first
        store.save(&state).unwrap();
        assert!(matches!(
            store.load().unwrap_err(),
            AssistError::IncompatibleModel { .. }
        ));
    }

    #[test]
    fn test_corrupted_payload_is_incompatible() {
        let temp = TempDir::new().unwrap();
        let store = ModelStore::new(temp.path().join("model.bin"));
        store.save(&sample_state()).unwrap();

        let mut bytes = fs::read(store.path()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        fs::write(store.path(), &bytes).unwrap();
        assert!(matches!(
            store.load().unwrap_err(),
            AssistError::IncompatibleModel { .. }
        ));

        fs::write(store.path(), b"garbage").unwrap();
        assert!(matches!(
            store.load().unwrap_err(),
            AssistError::IncompatibleModel { .. }
        ));
    }

    #[test]
    fn test_save_replaces_previous_artifact() {
        let temp = TempDir::new().unwrap();
        let store = ModelStore::new(temp.path().join("model.bin"));
        store.save(&sample_state()).unwrap();

        let mut state = sample_state();
        state.chunk_texts[0] = "replaced".to_string();
        store.save(&state).unwrap();

        assert_eq!(store.load().unwrap().chunk_texts[0], "replaced");
    }
}
