//! Small helpers for assembling sparse operators.
//!
//! All operators are assembled in coordinate form and converted to CSR, which
//! is the format used for the matrix-vector products.

use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CsrMatrix};

/// Sparse diagonal matrix with given diagonal.
pub fn diagonal(values: &DVector<f64>) -> CsrMatrix<f64> {
    let n = values.len();
    let mut coo = CooMatrix::new(n, n);

    for (i, &v) in values.iter().enumerate() {
        coo.push(i, i, v);
    }

    CsrMatrix::from(&coo)
}

/// Kronecker product of two sparse matrices.
pub fn kron(a: &CsrMatrix<f64>, b: &CsrMatrix<f64>) -> CsrMatrix<f64> {
    let mut coo = CooMatrix::new(a.nrows() * b.nrows(), a.ncols() * b.ncols());

    for (ia, ja, &va) in a.triplet_iter() {
        for (ib, jb, &vb) in b.triplet_iter() {
            coo.push(ia * b.nrows() + ib, ja * b.ncols() + jb, va * vb);
        }
    }

    CsrMatrix::from(&coo)
}

/// Stacks matrices with the same number of columns on top of each other.
pub fn vstack(blocks: &[CsrMatrix<f64>]) -> CsrMatrix<f64> {
    let ncols = blocks.first().map(|b| b.ncols()).unwrap_or(0);
    let nrows = blocks.iter().map(|b| b.nrows()).sum();
    let mut coo = CooMatrix::new(nrows, ncols);
    let mut offset = 0;

    for block in blocks {
        assert_eq!(block.ncols(), ncols, "blocks have different number of columns");

        for (i, j, &v) in block.triplet_iter() {
            coo.push(offset + i, j, v);
        }

        offset += block.nrows();
    }

    CsrMatrix::from(&coo)
}

/// Multiplies every row of the matrix by the corresponding factor.
pub fn scale_rows(a: &CsrMatrix<f64>, factors: &DVector<f64>) -> CsrMatrix<f64> {
    let mut scaled = a.clone();

    for (i, mut row) in scaled.row_iter_mut().enumerate() {
        for v in row.values_mut() {
            *v *= factors[i];
        }
    }

    scaled
}

#[cfg(test)]
mod tests {
    use super::*;

    use nalgebra::{dmatrix, dvector, DMatrix};

    #[test]
    fn kron_matches_dense() {
        let a = dmatrix![1.0, 2.0; 0.0, 3.0];
        let b = dmatrix![0.0, 1.0, 4.0];

        let sa = CsrMatrix::from(&CooMatrix::from(&a));
        let sb = CsrMatrix::from(&CooMatrix::from(&b));

        let expected = a.kronecker(&b);
        assert_eq!(DMatrix::from(&kron(&sa, &sb)), expected);
    }

    #[test]
    fn stacked_and_scaled() {
        let top = diagonal(&dvector![1.0, 2.0]);
        let bottom = diagonal(&dvector![3.0, 4.0]);
        let stacked = scale_rows(&vstack(&[top, bottom]), &dvector![1.0, 1.0, 2.0, 0.5]);

        assert_eq!(
            DMatrix::from(&stacked),
            dmatrix![1.0, 0.0; 0.0, 2.0; 6.0, 0.0; 0.0, 2.0]
        );
    }
}
