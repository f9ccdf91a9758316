use super::{check_inner, LinAlg, LinalgError, Matrix};
use ndarray::{Array2, ArrayView2};

/// Matrix products delegated to `ndarray`
#[derive(Debug, Clone, Copy, Default)]
pub struct NdarrayBackend;

fn view(m: &Matrix) -> Result<ArrayView2<'_, f32>, LinalgError> {
    ArrayView2::from_shape(m.shape(), m.as_slice()).map_err(|_| LinalgError::InvalidShape {
        rows: m.rows(),
        cols: m.cols(),
        len: m.as_slice().len(),
    })
}

fn to_matrix(array: Array2<f32>) -> Result<Matrix, LinalgError> {
    let (rows, cols) = array.dim();
    // iter() walks in logical row-major order whatever the memory layout
    Matrix::from_vec(rows, cols, array.iter().copied().collect())
}

impl LinAlg for NdarrayBackend {
    fn name(&self) -> &'static str {
        "ndarray"
    }

    fn matmul(&self, a: &Matrix, b: &Matrix) -> Result<Matrix, LinalgError> {
        check_inner("matmul", a.shape(), b.shape(), a.cols(), b.rows())?;
        to_matrix(view(a)?.dot(&view(b)?))
    }

    fn matmul_tn(&self, a: &Matrix, b: &Matrix) -> Result<Matrix, LinalgError> {
        check_inner("matmul_tn", a.shape(), b.shape(), a.rows(), b.rows())?;
        to_matrix(view(a)?.t().dot(&view(b)?))
    }

    fn matmul_nt(&self, a: &Matrix, b: &Matrix) -> Result<Matrix, LinalgError> {
        check_inner("matmul_nt", a.shape(), b.shape(), a.cols(), b.cols())?;
        to_matrix(view(a)?.dot(&view(b)?.t()))
    }
}
