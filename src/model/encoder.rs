use crate::error::Result;
use crate::linalg::{normalize, LinAlg, LinalgError, Matrix};
use serde::{Deserialize, Serialize};

/// Encoder half of the autoencoder: `ReLU(x · W1 + b1)`, L2-normalized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encoder {
    /// `vocab_size × hidden_size`
    pub weights: Matrix,
    /// `hidden_size`
    pub bias: Vec<f32>,
}

impl Encoder {
    pub fn new(weights: Matrix, bias: Vec<f32>) -> Result<Self> {
        if weights.cols() != bias.len() {
            return Err(LinalgError::ShapeMismatch {
                op: "encoder",
                left: weights.shape(),
                right: (1, bias.len()),
            }
            .into());
        }
        Ok(Self { weights, bias })
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows()
    }

    pub fn hidden_size(&self) -> usize {
        self.weights.cols()
    }

    /// Raw activations `ReLU(x · W1 + b1)` for every row of `inputs`
    pub fn activations(&self, backend: &dyn LinAlg, inputs: &Matrix) -> Result<Matrix> {
        let mut linear = backend.matmul(inputs, &self.weights)?;
        linear.add_row_vector(&self.bias)?;
        Ok(linear.relu())
    }

    /// Unit-norm embeddings for every row; all-zero activations stay zero
    pub fn encode_batch(&self, backend: &dyn LinAlg, inputs: &Matrix) -> Result<Matrix> {
        let mut embeddings = self.activations(backend, inputs)?;
        embeddings.normalize_rows();
        Ok(embeddings)
    }

    /// Unit-norm embedding of a single vector
    pub fn encode(&self, backend: &dyn LinAlg, vector: &[f32]) -> Result<Vec<f32>> {
        let activations = self.activations(backend, &Matrix::row_vector(vector))?;
        let mut embedding = activations.row(0).to_vec();
        normalize(&mut embedding);
        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::BackendKind;

    fn encoder() -> Encoder {
        // 3 inputs -> 2 hidden
        let weights = Matrix::from_vec(3, 2, vec![1.0, -1.0, 2.0, 0.0, 0.0, 1.0]).unwrap();
        Encoder::new(weights, vec![0.0, 0.0]).unwrap()
    }

    #[test]
    fn test_encode_is_unit_norm() {
        let enc = encoder();
        let backend = BackendKind::Naive.backend();
        let embedding = enc.encode(backend, &[0.5, 0.5, 0.0]).unwrap();
        // linear = [1.5, -0.5] -> relu [1.5, 0] -> [1, 0]
        assert_eq!(embedding, vec![1.0, 0.0]);
    }

    #[test]
    fn test_zero_activation_stays_zero() {
        let weights = Matrix::from_vec(1, 2, vec![-1.0, -1.0]).unwrap();
        let enc = Encoder::new(weights, vec![0.0, 0.0]).unwrap();
        let embedding = enc.encode(BackendKind::Ndarray.backend(), &[1.0]).unwrap();
        assert_eq!(embedding, vec![0.0, 0.0]);
    }

    #[test]
    fn test_batch_matches_single() {
        let enc = encoder();
        let backend = BackendKind::Ndarray.backend();
        let inputs = Matrix::from_vec(2, 3, vec![0.0, 0.5, 0.5, 1.0, 0.0, 0.0]).unwrap();
        let batch = enc.encode_batch(backend, &inputs).unwrap();
        for i in 0..2 {
            let single = enc.encode(backend, inputs.row(i)).unwrap();
            for (a, b) in batch.row(i).iter().zip(&single) {
                assert!((a - b).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_bias_width_checked() {
        let weights = Matrix::zeros(3, 2);
        assert!(Encoder::new(weights, vec![0.0; 3]).is_err());
    }
}
