// src/whitening.rs

//! Data preprocessing: centering and whitening.
//!
//! All matrices are laid out channels × samples. A whitened matrix is
//! `W · (X − mean)`, whose empirical covariance is the identity up to the
//! fixed regularizer [`WHITENING_EPSILON`].

use crate::error::{BssError, Result};
use crate::math::{cholesky_lower, symmetric_eigen};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Regularizer added to eigenvalues before taking inverse square roots.
pub const WHITENING_EPSILON: f64 = 1e-5;

/// Relative eigenvalue floor below which a covariance is treated as singular.
const SINGULAR_THRESHOLD: f64 = 1e-10;

/// Whitening transform selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhiteningMethod {
    /// Zero-phase (Mahalanobis) whitening, the transform closest to identity.
    #[default]
    Zca,
    /// Principal-axis whitening.
    Pca,
    /// Upper Cholesky factor of the inverse covariance.
    Cholesky,
    /// ZCA on the correlation matrix.
    ZcaCor,
    /// PCA on the correlation matrix.
    PcaCor,
}

impl WhiteningMethod {
    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            WhiteningMethod::Zca => "zca",
            WhiteningMethod::Pca => "pca",
            WhiteningMethod::Cholesky => "cholesky",
            WhiteningMethod::ZcaCor => "zca_cor",
            WhiteningMethod::PcaCor => "pca_cor",
        }
    }
}

impl fmt::Display for WhiteningMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WhiteningMethod {
    type Err = BssError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zca" => Ok(WhiteningMethod::Zca),
            "pca" => Ok(WhiteningMethod::Pca),
            "cholesky" => Ok(WhiteningMethod::Cholesky),
            "zca_cor" => Ok(WhiteningMethod::ZcaCor),
            "pca_cor" => Ok(WhiteningMethod::PcaCor),
            _ => Err(BssError::UnsupportedMethod { method: s.into() }),
        }
    }
}

/// Result of whitening transformation.
#[derive(Debug, Clone)]
pub struct WhiteningResult {
    /// Whitened data matrix (n_channels × n_samples).
    pub data: Array2<f64>,
    /// Whitening matrix W (n_channels × n_channels).
    pub whitening_matrix: Array2<f64>,
    /// Per-channel mean removed before whitening.
    pub mean: Array1<f64>,
}

/// Center the data by subtracting the mean of each row.
///
/// # Arguments
/// * `x` - Data matrix of shape (n_channels, n_samples)
///
/// # Returns
/// * Tuple of (centered_data, mean_vector)
pub fn center(x: &Array2<f64>) -> (Array2<f64>, Array1<f64>) {
    let mean = x
        .mean_axis(Axis(1))
        .unwrap_or_else(|| Array1::zeros(x.nrows()));
    let centered = x - &mean.view().insert_axis(Axis(1));
    (centered, mean)
}

/// Empirical covariance `X · Xᵗ / T` of already centered data.
pub fn covariance(centered: &Array2<f64>) -> Array2<f64> {
    let t = centered.ncols().max(1) as f64;
    centered.dot(&centered.t()) / t
}

/// Whiten using a method given by name.
///
/// The name is parsed before anything is computed, so an unknown method
/// fails with [`BssError::UnsupportedMethod`] and nothing else.
pub fn whiten_by_name(x: &Array2<f64>, method: &str) -> Result<WhiteningResult> {
    let method: WhiteningMethod = method.parse()?;
    whiten(x, method)
}

/// Center and whiten the data.
///
/// # Arguments
/// * `x` - Raw data matrix of shape (n_channels, n_samples)
/// * `method` - Whitening transform to compute
///
/// # Returns
/// * `WhiteningResult` containing whitened data, whitening matrix and mean
pub fn whiten(x: &Array2<f64>, method: WhiteningMethod) -> Result<WhiteningResult> {
    let (n, t) = x.dim();

    if n == 0 || t == 0 {
        return Err(BssError::InvalidDimensions {
            message: "Input matrix cannot be empty".into(),
        });
    }
    if t < n {
        // Covariance of fewer samples than channels is rank deficient
        return Err(BssError::SingularCovariance { min_eigenvalue: 0.0 });
    }

    let (centered, mean) = center(x);
    let sigma = covariance(&centered);

    let w = match method {
        WhiteningMethod::Zca | WhiteningMethod::Pca | WhiteningMethod::Cholesky => {
            let (lambda, u) = symmetric_eigen(&sigma)?;
            check_rank(&lambda)?;

            match method {
                WhiteningMethod::Zca => u.dot(&inv_sqrt_diag(&lambda)).dot(&u.t()),
                WhiteningMethod::Pca => inv_sqrt_diag(&lambda).dot(&u.t()),
                _ => {
                    let inv_diag =
                        Array2::from_diag(&lambda.mapv(|l| 1.0 / (l + WHITENING_EPSILON)));
                    let precision = u.dot(&inv_diag).dot(&u.t());
                    // Symmetrize against rounding before factorizing
                    let precision = (&precision + &precision.t()) / 2.0;
                    cholesky_lower(&precision)?.reversed_axes()
                }
            }
        }
        WhiteningMethod::ZcaCor | WhiteningMethod::PcaCor => {
            let std = centered
                .mapv(|v| v * v)
                .mean_axis(Axis(1))
                .unwrap_or_else(|| Array1::zeros(n))
                .mapv(f64::sqrt);

            let min_std = std.iter().cloned().fold(f64::INFINITY, f64::min);
            if !(min_std > 0.0) {
                return Err(BssError::SingularCovariance {
                    min_eigenvalue: min_std * min_std,
                });
            }

            let v_inv = Array2::from_diag(&std.mapv(|s| 1.0 / s));
            let correlation = v_inv.dot(&sigma).dot(&v_inv);
            let (theta, g) = symmetric_eigen(&correlation)?;
            check_rank(&theta)?;

            match method {
                WhiteningMethod::ZcaCor => g.dot(&inv_sqrt_diag(&theta)).dot(&g.t()).dot(&v_inv),
                _ => inv_sqrt_diag(&theta).dot(&g.t()).dot(&v_inv),
            }
        }
    };

    let data = w.dot(&centered);

    log::debug!("whitened {} channels x {} samples with {}", n, t, method);

    Ok(WhiteningResult {
        data,
        whitening_matrix: w,
        mean,
    })
}

fn inv_sqrt_diag(lambda: &Array1<f64>) -> Array2<f64> {
    Array2::from_diag(&lambda.mapv(|l| 1.0 / (l + WHITENING_EPSILON).sqrt()))
}

fn check_rank(lambda: &Array1<f64>) -> Result<()> {
    let max = lambda.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min = lambda.iter().cloned().fold(f64::INFINITY, f64::min);

    if !min.is_finite() || !max.is_finite() || max <= 0.0 || min <= SINGULAR_THRESHOLD * max {
        return Err(BssError::SingularCovariance { min_eigenvalue: min });
    }
    Ok(())
}
