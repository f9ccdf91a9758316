//! Dense linear algebra used by training and inference.
//!
//! [`Matrix`] is a row-major `f32` matrix with the elementwise operations the
//! autoencoder needs. Matrix products go through the [`LinAlg`] trait so the
//! nested-loop backend can be swapped for the `ndarray` one without touching
//! training or query code.

mod naive;
mod ndarray_backend;

pub use naive::NaiveBackend;
pub use ndarray_backend::NdarrayBackend;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinalgError {
    #[error("Shape mismatch in {op}: {left:?} vs {right:?}")]
    ShapeMismatch {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("Buffer of length {len} cannot hold a {rows}x{cols} matrix")]
    InvalidShape { rows: usize, cols: usize, len: usize },
}

/// Matrix products, the only operations with a backend-specific implementation
pub trait LinAlg: Send + Sync {
    fn name(&self) -> &'static str;

    /// `a · b`
    fn matmul(&self, a: &Matrix, b: &Matrix) -> Result<Matrix, LinalgError>;

    /// `aᵗ · b`
    fn matmul_tn(&self, a: &Matrix, b: &Matrix) -> Result<Matrix, LinalgError>;

    /// `a · bᵗ`
    fn matmul_nt(&self, a: &Matrix, b: &Matrix) -> Result<Matrix, LinalgError>;
}

/// Selectable backend, as named in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Naive,
    #[default]
    Ndarray,
}

impl BackendKind {
    pub fn backend(self) -> &'static dyn LinAlg {
        match self {
            BackendKind::Naive => &NaiveBackend,
            BackendKind::Ndarray => &NdarrayBackend,
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "naive" => Ok(BackendKind::Naive),
            "ndarray" => Ok(BackendKind::Ndarray),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// Row-major dense matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self, LinalgError> {
        if data.len() != rows * cols {
            return Err(LinalgError::InvalidShape {
                rows,
                cols,
                len: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Stack equally long rows; `cols` is used when `rows` is empty
    pub fn from_rows(rows: &[Vec<f32>], cols: usize) -> Result<Self, LinalgError> {
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(LinalgError::ShapeMismatch {
                    op: "from_rows",
                    left: (1, row.len()),
                    right: (1, cols),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Single-row matrix
    pub fn row_vector(values: &[f32]) -> Self {
        Self {
            rows: 1,
            cols: values.len(),
            data: values.to_vec(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.cols + col]
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        // chunks_exact panics on 0
        self.data.chunks_exact(self.cols.max(1)).take(self.rows)
    }

    pub fn into_rows(self) -> Vec<Vec<f32>> {
        self.iter_rows().map(<[f32]>::to_vec).collect()
    }

    /// New matrix made of the given rows, in order
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        Self {
            rows: indices.len(),
            cols: self.cols,
            data,
        }
    }

    /// Add `bias` to every row
    pub fn add_row_vector(&mut self, bias: &[f32]) -> Result<(), LinalgError> {
        if bias.len() != self.cols {
            return Err(LinalgError::ShapeMismatch {
                op: "add_row_vector",
                left: self.shape(),
                right: (1, bias.len()),
            });
        }
        for row in self.data.chunks_exact_mut(self.cols.max(1)) {
            for (value, b) in row.iter_mut().zip(bias) {
                *value += b;
            }
        }
        Ok(())
    }

    pub fn relu(&self) -> Self {
        self.map(|v| v.max(0.0))
    }

    /// Zero every entry whose counterpart in `linear` is not positive
    pub fn mask_relu_grad(&mut self, linear: &Matrix) -> Result<(), LinalgError> {
        self.check_same_shape("mask_relu_grad", linear)?;
        for (value, pre) in self.data.iter_mut().zip(&linear.data) {
            if *pre <= 0.0 {
                *value = 0.0;
            }
        }
        Ok(())
    }

    /// `self - other`
    pub fn sub(&self, other: &Matrix) -> Result<Matrix, LinalgError> {
        self.check_same_shape("sub", other)?;
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| a - b)
            .collect();
        Ok(Self {
            rows: self.rows,
            cols: self.cols,
            data,
        })
    }

    pub fn scale(&mut self, factor: f32) {
        for value in self.data.iter_mut() {
            *value *= factor;
        }
    }

    pub fn column_sums(&self) -> Vec<f32> {
        let mut totals = vec![0.0f32; self.cols];
        for row in self.iter_rows() {
            for (total, value) in totals.iter_mut().zip(row) {
                *total += value;
            }
        }
        totals
    }

    /// Mean of squared entries; zero for an empty matrix
    pub fn mean_square(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.data.iter().map(|v| v * v).sum();
        sum / self.data.len() as f32
    }

    /// Gradient descent step: `self -= learning_rate * grad`
    pub fn descend(&mut self, grad: &Matrix, learning_rate: f32) -> Result<(), LinalgError> {
        self.check_same_shape("descend", grad)?;
        descend(&mut self.data, &grad.data, learning_rate);
        Ok(())
    }

    /// Divide each row by its L2 norm; all-zero rows stay zero
    pub fn normalize_rows(&mut self) {
        for row in self.data.chunks_exact_mut(self.cols.max(1)) {
            normalize(row);
        }
    }

    fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|v| f(*v)).collect(),
        }
    }

    fn check_same_shape(&self, op: &'static str, other: &Matrix) -> Result<(), LinalgError> {
        if self.shape() != other.shape() {
            return Err(LinalgError::ShapeMismatch {
                op,
                left: self.shape(),
                right: other.shape(),
            });
        }
        Ok(())
    }
}

/// `values -= learning_rate * grad`, elementwise
pub fn descend(values: &mut [f32], grad: &[f32], learning_rate: f32) {
    for (value, g) in values.iter_mut().zip(grad) {
        *value -= learning_rate * g;
    }
}

/// Scale to unit L2 norm in place; leaves a zero vector unchanged.
///
/// Entries are divided by the largest magnitude first so the sum of squares
/// cannot overflow. Vectors holding a non-finite entry are left as they are.
pub fn normalize(vector: &mut [f32]) {
    let scale = vector.iter().fold(0.0f32, |max, v| max.max(v.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return;
    }
    let norm = vector
        .iter()
        .map(|v| {
            let scaled = v / scale;
            scaled * scaled
        })
        .sum::<f32>()
        .sqrt();
    for value in vector.iter_mut() {
        *value = (*value / scale) / norm;
    }
}

/// True when every entry is a finite number
pub fn all_finite(values: &[f32]) -> bool {
    values.iter().all(|v| v.is_finite())
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub(crate) fn check_inner(
    op: &'static str,
    left: (usize, usize),
    right: (usize, usize),
    left_inner: usize,
    right_inner: usize,
) -> Result<(), LinalgError> {
    if left_inner != right_inner {
        return Err(LinalgError::ShapeMismatch { op, left, right });
    }
    Ok(())
}
