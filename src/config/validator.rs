use crate::config::{Config, SCHEMA_VERSION};
use crate::error::{AssistError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_corpus(config, &mut errors);
        Self::validate_training(config, &mut errors);
        Self::validate_model(config, &mut errors);
        Self::validate_query(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AssistError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_corpus(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.corpus.root.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "corpus.root",
                "Corpus root cannot be empty",
            ));
        }

        if config.corpus.extensions.is_empty() {
            errors.push(ValidationError::new(
                "corpus.extensions",
                "At least one file extension must be allowed",
            ));
        }

        if config.corpus.extensions.iter().any(|e| e.trim().is_empty()) {
            errors.push(ValidationError::new(
                "corpus.extensions",
                "Extensions cannot be empty strings",
            ));
        }
    }

    fn validate_training(config: &Config, errors: &mut Vec<ValidationError>) {
        let training = &config.training;

        let positive = [
            ("training.epochs", training.epochs),
            ("training.hidden_size", training.hidden_size),
            ("training.batch_size", training.batch_size),
            ("training.max_chars", training.max_chars),
            ("training.min_frequency", training.min_frequency),
        ];
        for (path, value) in positive {
            if value == 0 {
                errors.push(ValidationError::new(path, "Value must be greater than 0"));
            }
        }

        if training.max_chunks == Some(0) {
            errors.push(ValidationError::new(
                "training.max_chunks",
                "max_chunks must be greater than 0 when set",
            ));
        }

        let lr = training.learning_rate;
        if !lr.is_finite() || lr <= 0.0 {
            errors.push(ValidationError::new(
                "training.learning_rate",
                format!("Learning rate must be a positive number, got {}", lr),
            ));
        }

        let std = training.init_std;
        if !std.is_finite() || std <= 0.0 {
            errors.push(ValidationError::new(
                "training.init_std",
                format!("Initialization std must be a positive number, got {}", std),
            ));
        }
    }

    fn validate_model(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.model.path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "model.path",
                "Model path cannot be empty",
            ));
        }
    }

    fn validate_query(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.query.top_k_chunks == 0 {
            errors.push(ValidationError::new(
                "query.top_k_chunks",
                "top_k_chunks must be greater than 0",
            ));
        }
    }
}
