//! Autoencoder model: training and the persisted encoder
//!
//! Architecture:
//! - `Trainer` fits `W1, b1, W2, b2` by mini-batch gradient descent on
//!   term-frequency vectors, minimizing reconstruction error
//! - `Encoder` keeps only `W1, b1` and maps vectors to unit-norm embeddings
//! - All randomness comes from one seeded `ChaCha8Rng` owned by the run

mod encoder;
mod trainer;

pub use encoder::Encoder;
pub use trainer::{Hyperparameters, TrainedModel, Trainer, TrainingReport};
