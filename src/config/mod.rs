//! Configuration management for arkassist
//!
//! Configuration is read from a TOML file, then environment overrides and an
//! optional named profile are applied, and the result is validated.

use crate::error::{AssistError, Result};
use crate::linalg::BackendKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

pub const SCHEMA_VERSION: &str = "1.0.0";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub corpus: CorpusConfig,
    pub training: TrainingConfig,
    pub model: ModelConfig,
    pub query: QueryConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Which files are indexed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    pub root: PathBuf,
    /// Allowed extensions, without the dot
    pub extensions: Vec<String>,
    /// Directory names never scanned (generated or temporary artifacts)
    pub excluded_dirs: Vec<String>,
}

/// Training hyperparameters and dataset limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub hidden_size: usize,
    pub batch_size: usize,
    pub max_chars: usize,
    pub min_frequency: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_chunks: Option<usize>,
    pub learning_rate: f32,
    pub seed: u64,
    pub init_std: f32,
    #[serde(default)]
    pub backend: BackendKind,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 6,
            hidden_size: 128,
            batch_size: 16,
            max_chars: 1200,
            min_frequency: 2,
            max_chunks: None,
            learning_rate: 0.01,
            seed: 42,
            init_std: 0.1,
            backend: BackendKind::default(),
        }
    }
}

/// Location of the trained artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Relative paths are resolved against the corpus root
    pub path: PathBuf,
}

/// Result counts for queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub top_k_chunks: usize,
    pub top_k_commands: usize,
}

/// External command catalog used for suggestions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_file: Option<PathBuf>,
}

/// Profile-specific training overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epochs: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_chunks: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_rate: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendKind>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AssistError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| AssistError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| AssistError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load configuration with a specific profile applied
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_profile(profile)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Apply a profile's overrides to the training section
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self
            .profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| AssistError::Config(format!("Unknown profile: {}", profile)))?;

        if let Some(epochs) = overrides.epochs {
            self.training.epochs = epochs;
        }
        if let Some(hidden_size) = overrides.hidden_size {
            self.training.hidden_size = hidden_size;
        }
        if let Some(max_chunks) = overrides.max_chunks {
            self.training.max_chunks = Some(max_chunks);
        }
        if let Some(learning_rate) = overrides.learning_rate {
            self.training.learning_rate = learning_rate;
        }
        if let Some(backend) = overrides.backend {
            self.training.backend = backend;
        }
        tracing::debug!("Applied profile '{}'", profile);
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: ARKASSIST_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("ARKASSIST_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "CORPUS__ROOT" => self.corpus.root = PathBuf::from(value),
            "MODEL__PATH" => self.model.path = PathBuf::from(value),
            "TRAINING__EPOCHS" => self.training.epochs = parse_env(path, value)?,
            "TRAINING__HIDDEN_SIZE" => self.training.hidden_size = parse_env(path, value)?,
            "TRAINING__BATCH_SIZE" => self.training.batch_size = parse_env(path, value)?,
            "TRAINING__LEARNING_RATE" => self.training.learning_rate = parse_env(path, value)?,
            "TRAINING__SEED" => self.training.seed = parse_env(path, value)?,
            "TRAINING__BACKEND" => {
                self.training.backend =
                    value
                        .parse()
                        .map_err(|message| AssistError::InvalidConfigValue {
                            path: path.to_string(),
                            message,
                        })?;
            }
            "QUERY__TOP_K_CHUNKS" => self.query.top_k_chunks = parse_env(path, value)?,
            "QUERY__TOP_K_COMMANDS" => self.query.top_k_commands = parse_env(path, value)?,
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AssistError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("arkassist").join("config.toml"))
    }

    /// Corpus root with `~/` expanded
    pub fn corpus_root(&self) -> Result<PathBuf> {
        expand_path(&self.corpus.root)
    }

    /// Artifact path; relative paths live under the corpus root
    pub fn model_path(&self) -> Result<PathBuf> {
        let path = expand_path(&self.model.path)?;
        if path.is_relative() {
            Ok(self.corpus_root()?.join(path))
        } else {
            Ok(path)
        }
    }
}

fn parse_env<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| AssistError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}'", value),
    })
}

/// Expand a leading `~/` to the home directory
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| AssistError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| AssistError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut profiles = HashMap::new();
        profiles.insert(
            "quick".to_string(),
            ProfileOverrides {
                epochs: Some(2),
                max_chunks: Some(200),
                ..ProfileOverrides::default()
            },
        );

        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            corpus: CorpusConfig {
                root: PathBuf::from("."),
                extensions: ["md", "rst", "txt", "py", "yaml", "yml"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                excluded_dirs: ["tmp", ".git", "target"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            },
            training: TrainingConfig::default(),
            model: ModelConfig {
                path: PathBuf::from("tmp").join("assistant_model.bin"),
            },
            query: QueryConfig {
                top_k_chunks: 3,
                top_k_commands: 3,
            },
            commands: CommandsConfig::default(),
            profiles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let mut config = Config::default();
        config.training.max_chunks = Some(50);
        config.training.backend = BackendKind::Naive;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.training.max_chunks, Some(50));
        assert_eq!(loaded.training.backend, BackendKind::Naive);
        assert_eq!(loaded.corpus.extensions, config.corpus.extensions);
        assert!(loaded.profiles.contains_key("quick"));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/nonexistent/arkassist.toml")).unwrap_err();
        assert!(matches!(err, AssistError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_apply_profile() {
        let mut config = Config::default();
        config.apply_profile("quick").unwrap();
        assert_eq!(config.training.epochs, 2);
        assert_eq!(config.training.max_chunks, Some(200));
        assert_eq!(config.training.hidden_size, 128);

        assert!(config.apply_profile("missing").is_err());
    }

    #[test]
    fn test_env_value_parsing() {
        let mut config = Config::default();
        config.set_value_from_env("TRAINING__EPOCHS", "9").unwrap();
        config.set_value_from_env("TRAINING__BACKEND", "naive").unwrap();
        assert_eq!(config.training.epochs, 9);
        assert_eq!(config.training.backend, BackendKind::Naive);

        assert!(config.set_value_from_env("TRAINING__SEED", "abc").is_err());
    }

    #[test]
    fn test_relative_model_path_resolves_against_corpus() {
        let mut config = Config::default();
        config.corpus.root = PathBuf::from("/srv/repo");
        assert_eq!(
            config.model_path().unwrap(),
            PathBuf::from("/srv/repo/tmp/assistant_model.bin")
        );

        config.model.path = PathBuf::from("/var/lib/model.bin");
        assert_eq!(config.model_path().unwrap(), PathBuf::from("/var/lib/model.bin"));
    }
}
