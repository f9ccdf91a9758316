use super::{check_inner, LinAlg, LinalgError, Matrix};

/// Plain nested loops over row-major buffers.
///
/// Zero entries on the left are skipped, which pays off on the sparse
/// term-frequency batches.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveBackend;

impl LinAlg for NaiveBackend {
    fn name(&self) -> &'static str {
        "naive"
    }

    fn matmul(&self, a: &Matrix, b: &Matrix) -> Result<Matrix, LinalgError> {
        check_inner("matmul", a.shape(), b.shape(), a.cols(), b.rows())?;
        let mut out = vec![0.0f32; a.rows() * b.cols()];
        for i in 0..a.rows() {
            let target = &mut out[i * b.cols()..(i + 1) * b.cols()];
            for (k, &left) in a.row(i).iter().enumerate() {
                if left == 0.0 {
                    continue;
                }
                for (t, right) in target.iter_mut().zip(b.row(k)) {
                    *t += left * right;
                }
            }
        }
        Matrix::from_vec(a.rows(), b.cols(), out)
    }

    fn matmul_tn(&self, a: &Matrix, b: &Matrix) -> Result<Matrix, LinalgError> {
        check_inner("matmul_tn", a.shape(), b.shape(), a.rows(), b.rows())?;
        let mut out = vec![0.0f32; a.cols() * b.cols()];
        for i in 0..a.rows() {
            let b_row = b.row(i);
            for (k, &left) in a.row(i).iter().enumerate() {
                if left == 0.0 {
                    continue;
                }
                let target = &mut out[k * b.cols()..(k + 1) * b.cols()];
                for (t, right) in target.iter_mut().zip(b_row) {
                    *t += left * right;
                }
            }
        }
        Matrix::from_vec(a.cols(), b.cols(), out)
    }

    fn matmul_nt(&self, a: &Matrix, b: &Matrix) -> Result<Matrix, LinalgError> {
        check_inner("matmul_nt", a.shape(), b.shape(), a.cols(), b.cols())?;
        let mut out = Vec::with_capacity(a.rows() * b.rows());
        for i in 0..a.rows() {
            let a_row = a.row(i);
            for j in 0..b.rows() {
                out.push(super::dot(a_row, b.row(j)));
            }
        }
        Matrix::from_vec(a.rows(), b.rows(), out)
    }
}
