use crate::linalg::LinalgError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for arkassist
#[derive(Error, Debug)]
pub enum AssistError {
    /// No eligible files or chunks were found under the corpus root
    #[error("No text chunks found in {location}; check the corpus path and extension allow-list")]
    EmptyCorpus { location: String },

    /// The minimum-frequency filter removed every token
    #[error("min_frequency = {min_frequency} removed the whole vocabulary; use a lower threshold")]
    EmptyVocabulary { min_frequency: usize },

    /// Loss became NaN or infinite; nothing was persisted
    #[error("Training diverged at epoch {epoch}, batch {batch} (loss = {loss}); rerun with different hyperparameters")]
    TrainingDiverged { epoch: usize, batch: usize, loss: f32 },

    /// No trained artifact at the expected location
    #[error("No trained model found at {path}; run `arkassist train` first")]
    ModelNotFound { path: PathBuf },

    /// Artifact has another schema version or could not be decoded
    #[error("Model at {path} cannot be loaded ({reason}); retrain the assistant")]
    IncompatibleModel { path: PathBuf, reason: String },

    /// Question shares no token with the trained vocabulary
    #[error("The question {question:?} contains no vocabulary known to the assistant")]
    UnknownVocabularyQuery { question: String },

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Binary encoding errors for the model artifact
    #[error("Encoding error: {context}: {source}")]
    Encoding {
        source: bincode::Error,
        context: String,
    },

    /// Matrix shape errors from the linear algebra backend
    #[error(transparent)]
    Linalg(#[from] LinalgError),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AssistError {
    /// Shorthand for wrapping an IO error with context
    pub fn io(source: std::io::Error, context: impl Into<String>) -> Self {
        Self::Io {
            source,
            context: context.into(),
        }
    }
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for arkassist operations
pub type Result<T> = std::result::Result<T, AssistError>;
