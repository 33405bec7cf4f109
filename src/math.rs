// src/math.rs

//! Dense linear algebra helpers.
//!
//! Matrices are held as `ndarray` arrays throughout the crate; the symmetric
//! eigendecomposition and the Cholesky factorization are delegated to `faer`.

use crate::error::{BssError, Result};
use faer::{Mat, Side};
use ndarray::{Array1, Array2};

fn to_faer(a: &Array2<f64>) -> Mat<f64> {
    Mat::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

fn check_square(a: &Array2<f64>, what: &str) -> Result<usize> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(BssError::InvalidDimensions {
            message: format!("{} requires a square matrix, got {:?}", what, a.dim()),
        });
    }
    Ok(n)
}

/// Eigendecomposition of a symmetric matrix: `A = U · diag(λ) · Uᵗ`.
///
/// Eigenvalues are returned in descending order, eigenvectors as the
/// matching columns of `U`.
pub fn symmetric_eigen(a: &Array2<f64>) -> Result<(Array1<f64>, Array2<f64>)> {
    let n = check_square(a, "eigendecomposition")?;

    let evd = to_faer(a)
        .self_adjoint_eigen(Side::Lower)
        .map_err(|e| BssError::ComputationError {
            message: format!("symmetric eigendecomposition failed: {:?}", e),
        })?;
    let u = evd.U();
    let s = evd.S().column_vector();

    // faer sorts ascending
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| s[j].total_cmp(&s[i]));

    let values = Array1::from_shape_fn(n, |k| s[order[k]]);
    let vectors = Array2::from_shape_fn((n, n), |(i, k)| u[(i, order[k])]);

    Ok((values, vectors))
}

/// Lower Cholesky factor `L` of a symmetric positive definite matrix, `A = L · Lᵗ`.
pub fn cholesky_lower(a: &Array2<f64>) -> Result<Array2<f64>> {
    let n = check_square(a, "Cholesky factorization")?;

    let llt = to_faer(a)
        .llt(Side::Lower)
        .map_err(|e| BssError::ComputationError {
            message: format!("Cholesky factorization failed: {:?}", e),
        })?;
    let l = llt.L();

    Ok(Array2::from_shape_fn((n, n), |(i, j)| {
        if j <= i {
            l[(i, j)]
        } else {
            0.0
        }
    }))
}

/// Matrix inverse by Gauss-Jordan elimination with partial pivoting.
///
/// Intended for the small n×n unmixing matrices.
pub fn invert(m: &Array2<f64>) -> Result<Array2<f64>> {
    let n = check_square(m, "inversion")?;

    let mut aug = Array2::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = m[[i, j]];
        }
        aug[[i, n + i]] = 1.0;
    }

    for i in 0..n {
        // Find pivot
        let mut max_row = i;
        for k in (i + 1)..n {
            if aug[[k, i]].abs() > aug[[max_row, i]].abs() {
                max_row = k;
            }
        }

        if max_row != i {
            for j in 0..(2 * n) {
                aug.swap([i, j], [max_row, j]);
            }
        }

        if aug[[i, i]].abs() < 1e-15 {
            return Err(BssError::ComputationError {
                message: "matrix is singular and cannot be inverted".into(),
            });
        }

        let pivot = aug[[i, i]];
        for j in 0..(2 * n) {
            aug[[i, j]] /= pivot;
        }

        for k in 0..n {
            if k != i {
                let factor = aug[[k, i]];
                if factor != 0.0 {
                    for j in 0..(2 * n) {
                        aug[[k, j]] -= factor * aug[[i, j]];
                    }
                }
            }
        }
    }

    Ok(aug.slice(ndarray::s![.., n..]).to_owned())
}

/// Frobenius norm `sqrt(Σ aᵢⱼ²)`.
pub fn frobenius_norm(a: &Array2<f64>) -> f64 {
    a.iter().map(|&v| v * v).sum::<f64>().sqrt()
}

/// True when every entry is finite.
pub fn all_finite(a: &Array2<f64>) -> bool {
    a.iter().all(|v| v.is_finite())
}
