use super::encoder::Encoder;
use crate::config::TrainingConfig;
use crate::error::{AssistError, Result};
use crate::linalg::{all_finite, descend, LinAlg, LinalgError, Matrix};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use tracing::{debug, info};

/// Optimization settings for one training run
#[derive(Debug, Clone, PartialEq)]
pub struct Hyperparameters {
    pub epochs: usize,
    pub hidden_size: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    /// Seed for weight initialization and per-epoch shuffling
    pub seed: u64,
    /// Standard deviation of the Gaussian weight initialization
    pub init_std: f32,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            epochs: 6,
            hidden_size: 128,
            batch_size: 16,
            learning_rate: 0.01,
            seed: 42,
            init_std: 0.1,
        }
    }
}

impl From<&TrainingConfig> for Hyperparameters {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            epochs: config.epochs,
            hidden_size: config.hidden_size,
            batch_size: config.batch_size,
            learning_rate: config.learning_rate,
            seed: config.seed,
            init_std: config.init_std,
        }
    }
}

/// Loss history of a finished run
#[derive(Debug, Clone, Default)]
pub struct TrainingReport {
    /// Mean batch loss per epoch
    pub epoch_losses: Vec<f32>,
}

impl TrainingReport {
    pub fn final_loss(&self) -> Option<f32> {
        self.epoch_losses.last().copied()
    }
}

/// Output of [`Trainer::fit`]
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub encoder: Encoder,
    /// One unit-norm embedding per input row
    pub embeddings: Matrix,
    pub report: TrainingReport,
}

struct Parameters {
    w1: Matrix,
    b1: Vec<f32>,
    w2: Matrix,
    b2: Vec<f32>,
}

/// Mini-batch gradient descent for the two-layer autoencoder
pub struct Trainer<'a> {
    params: Hyperparameters,
    backend: &'a dyn LinAlg,
}

impl<'a> Trainer<'a> {
    pub fn new(params: Hyperparameters, backend: &'a dyn LinAlg) -> Self {
        Self { params, backend }
    }

    /// Train on `vectors` (one term-frequency vector per row) and embed every row.
    ///
    /// Two runs with equal inputs and hyperparameters produce bit-identical
    /// parameters. A non-finite loss aborts with
    /// [`AssistError::TrainingDiverged`].
    pub fn fit(&self, vectors: &Matrix) -> Result<TrainedModel> {
        self.check_preconditions(vectors)?;

        let vocab_size = vectors.cols();
        let hidden_size = self.params.hidden_size;
        let mut rng = ChaCha8Rng::seed_from_u64(self.params.seed);
        let mut params = self.initialize(&mut rng, vocab_size, hidden_size)?;

        info!(
            "Training autoencoder: {} samples, vocab {}, hidden {}, {} epochs ({} backend)",
            vectors.rows(),
            vocab_size,
            hidden_size,
            self.params.epochs,
            self.backend.name()
        );

        let mut report = TrainingReport::default();
        let mut order: Vec<usize> = (0..vectors.rows()).collect();
        let mut batches = 0usize;
        for epoch in 0..self.params.epochs {
            order.shuffle(&mut rng);

            let mut loss_sum = 0.0f32;
            batches = 0;
            for (batch_idx, indices) in order.chunks(self.params.batch_size).enumerate() {
                let batch = vectors.select_rows(indices);
                loss_sum += self.step(&mut params, &batch, epoch, batch_idx)?;
                batches += 1;
            }

            let mean_loss = loss_sum / batches as f32;
            debug!("Epoch {}/{}: loss {:.6}", epoch + 1, self.params.epochs, mean_loss);
            report.epoch_losses.push(mean_loss);
        }

        if let Some(loss) = report.final_loss() {
            info!("Training finished with loss {:.6}", loss);
        }

        // The loss is checked before each update, so the last update is not
        let diverged = || AssistError::TrainingDiverged {
            epoch: self.params.epochs,
            batch: batches,
            loss: report.final_loss().unwrap_or(f32::NAN),
        };
        if !all_finite(params.w1.as_slice()) || !all_finite(&params.b1) {
            return Err(diverged());
        }

        let encoder = Encoder::new(params.w1, params.b1)?;
        let embeddings = encoder.encode_batch(self.backend, vectors)?;
        if !all_finite(embeddings.as_slice()) {
            return Err(diverged());
        }
        Ok(TrainedModel {
            encoder,
            embeddings,
            report,
        })
    }

    /// Everything checked here fails before any weight is allocated
    fn check_preconditions(&self, vectors: &Matrix) -> Result<()> {
        if vectors.rows() == 0 {
            return Err(AssistError::EmptyCorpus {
                location: "training set".to_string(),
            });
        }
        if vectors.cols() == 0 {
            return Err(LinalgError::InvalidShape {
                rows: vectors.rows(),
                cols: 0,
                len: 0,
            }
            .into());
        }
        if self.params.hidden_size == 0 {
            return Err(invalid("training.hidden_size", "must be greater than 0"));
        }
        if self.params.batch_size == 0 {
            return Err(invalid("training.batch_size", "must be greater than 0"));
        }
        let lr = self.params.learning_rate;
        if !lr.is_finite() || lr <= 0.0 {
            return Err(invalid(
                "training.learning_rate",
                format!("must be a positive finite number, got {}", lr),
            ));
        }
        let std = self.params.init_std;
        if !std.is_finite() || std <= 0.0 {
            return Err(invalid(
                "training.init_std",
                format!("must be a positive finite number, got {}", std),
            ));
        }
        Ok(())
    }

    /// W1 is drawn before W2, both row-major; biases start at zero
    fn initialize(
        &self,
        rng: &mut ChaCha8Rng,
        vocab_size: usize,
        hidden_size: usize,
    ) -> Result<Parameters> {
        let normal = Normal::new(0.0f32, self.params.init_std)
            .map_err(|e| invalid("training.init_std", e.to_string()))?;
        let mut sample = |rows: usize, cols: usize| {
            let data: Vec<f32> = (0..rows * cols).map(|_| normal.sample(&mut *rng)).collect();
            Matrix::from_vec(rows, cols, data)
        };

        let w1 = sample(vocab_size, hidden_size)?;
        let w2 = sample(hidden_size, vocab_size)?;
        Ok(Parameters {
            w1,
            b1: vec![0.0; hidden_size],
            w2,
            b2: vec![0.0; vocab_size],
        })
    }

    /// One forward/backward pass and parameter update; returns the batch loss
    fn step(
        &self,
        params: &mut Parameters,
        batch: &Matrix,
        epoch: usize,
        batch_idx: usize,
    ) -> Result<f32> {
        let backend = self.backend;

        let mut hidden_linear = backend.matmul(batch, &params.w1)?;
        hidden_linear.add_row_vector(&params.b1)?;
        let hidden = hidden_linear.relu();
        let mut reconstruction = backend.matmul(&hidden, &params.w2)?;
        reconstruction.add_row_vector(&params.b2)?;

        let mut grad_reconstruction = reconstruction.sub(batch)?;
        let loss = grad_reconstruction.mean_square();
        if !loss.is_finite() {
            return Err(AssistError::TrainingDiverged {
                epoch: epoch + 1,
                batch: batch_idx + 1,
                loss,
            });
        }

        grad_reconstruction.scale(2.0 / batch.rows() as f32);
        let grad_w2 = backend.matmul_tn(&hidden, &grad_reconstruction)?;
        let grad_b2 = grad_reconstruction.column_sums();

        let mut grad_hidden = backend.matmul_nt(&grad_reconstruction, &params.w2)?;
        grad_hidden.mask_relu_grad(&hidden_linear)?;
        let grad_w1 = backend.matmul_tn(batch, &grad_hidden)?;
        let grad_b1 = grad_hidden.column_sums();

        let lr = self.params.learning_rate;
        params.w2.descend(&grad_w2, lr)?;
        descend(&mut params.b2, &grad_b2, lr);
        params.w1.descend(&grad_w1, lr)?;
        descend(&mut params.b1, &grad_b1, lr);

        Ok(loss)
    }
}

fn invalid(path: &str, message: impl Into<String>) -> AssistError {
    AssistError::InvalidConfigValue {
        path: path.to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::BackendKind;

    fn small_params() -> Hyperparameters {
        Hyperparameters {
            epochs: 4,
            hidden_size: 8,
            batch_size: 2,
            ..Hyperparameters::default()
        }
    }

    fn vectors() -> Matrix {
        Matrix::from_vec(
            3,
            4,
            vec![
                0.5, 0.5, 0.0, 0.0, //
                0.0, 0.25, 0.25, 0.5, //
                0.25, 0.0, 0.5, 0.25,
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_fit_is_deterministic() {
        for kind in [BackendKind::Naive, BackendKind::Ndarray] {
            let first = Trainer::new(small_params(), kind.backend())
                .fit(&vectors())
                .unwrap();
            let second = Trainer::new(small_params(), kind.backend())
                .fit(&vectors())
                .unwrap();

            assert_eq!(first.encoder, second.encoder);
            assert_eq!(first.embeddings, second.embeddings);
            assert_eq!(first.report.epoch_losses, second.report.epoch_losses);
        }
    }

    #[test]
    fn test_seed_changes_initialization() {
        let backend = BackendKind::Naive.backend();
        let first = Trainer::new(small_params(), backend).fit(&vectors()).unwrap();
        let other = Hyperparameters {
            seed: 7,
            ..small_params()
        };
        let second = Trainer::new(other, backend).fit(&vectors()).unwrap();
        assert_ne!(first.encoder, second.encoder);
    }

    #[test]
    fn test_embeddings_are_unit_norm_or_zero() {
        let model = Trainer::new(small_params(), BackendKind::Ndarray.backend())
            .fit(&vectors())
            .unwrap();
        assert_eq!(model.embeddings.shape(), (3, 8));
        for row in model.embeddings.iter_rows() {
            let norm: f32 = row.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!(norm == 0.0 || (norm - 1.0).abs() < 1e-5, "norm {}", norm);
        }
    }

    #[test]
    fn test_loss_decreases() {
        let params = Hyperparameters {
            epochs: 200,
            learning_rate: 0.1,
            ..small_params()
        };
        let model = Trainer::new(params, BackendKind::Ndarray.backend())
            .fit(&vectors())
            .unwrap();
        let losses = &model.report.epoch_losses;
        assert!(losses.last().unwrap() < losses.first().unwrap());
    }

    #[test]
    fn test_last_batch_may_be_smaller() {
        let params = Hyperparameters {
            batch_size: 16,
            ..small_params()
        };
        let model = Trainer::new(params, BackendKind::Naive.backend())
            .fit(&vectors())
            .unwrap();
        assert_eq!(model.report.epoch_losses.len(), 4);
    }

    #[test]
    fn test_divergence_is_reported() {
        let params = Hyperparameters {
            learning_rate: 1e30,
            batch_size: 1,
            ..small_params()
        };
        let err = Trainer::new(params, BackendKind::Naive.backend())
            .fit(&vectors())
            .unwrap_err();
        assert!(matches!(err, AssistError::TrainingDiverged { .. }));
    }

    #[test]
    fn test_blow_up_in_final_update_is_reported() {
        // One epoch, one batch: the only loss is finite, the update is not
        let mut large = vectors().into_rows();
        for row in large.iter_mut() {
            for value in row.iter_mut() {
                *value *= 1e15;
            }
        }
        let large = Matrix::from_rows(&large, 4).unwrap();
        let params = Hyperparameters {
            epochs: 1,
            batch_size: 3,
            learning_rate: 1e20,
            ..small_params()
        };

        let err = Trainer::new(params, BackendKind::Naive.backend())
            .fit(&large)
            .unwrap_err();
        match err {
            AssistError::TrainingDiverged { epoch, batch, loss } => {
                assert_eq!((epoch, batch), (1, 1));
                assert!(loss.is_finite());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_preconditions_fail_fast() {
        let backend = BackendKind::Naive.backend();
        let empty = Matrix::zeros(0, 4);
        assert!(matches!(
            Trainer::new(small_params(), backend).fit(&empty).unwrap_err(),
            AssistError::EmptyCorpus { .. }
        ));

        let zero_hidden = Hyperparameters {
            hidden_size: 0,
            ..small_params()
        };
        assert!(matches!(
            Trainer::new(zero_hidden, backend).fit(&vectors()).unwrap_err(),
            AssistError::InvalidConfigValue { .. }
        ));

        let bad_lr = Hyperparameters {
            learning_rate: f32::NAN,
            ..small_params()
        };
        assert!(Trainer::new(bad_lr, backend).fit(&vectors()).is_err());
    }
}
