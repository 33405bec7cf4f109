// src/error.rs

//! Error types for the separation crate.

use ndarray::Array2;
use thiserror::Error;

/// Errors that can occur during whitening, separation or audio I/O.
#[derive(Debug, Clone, Error)]
pub enum BssError {
    /// Unknown whitening method name.
    #[error("Unsupported whitening method '{method}' (expected one of zca, pca, cholesky, zca_cor, pca_cor)")]
    UnsupportedMethod {
        /// The name that failed to parse.
        method: String,
    },

    /// Covariance or correlation matrix is not invertible.
    #[error("Singular covariance matrix (smallest eigenvalue {min_eigenvalue:.4e})")]
    SingularCovariance {
        /// Smallest eigenvalue (or variance) found.
        min_eigenvalue: f64,
    },

    /// The contrast matrix or the source estimate became non-finite.
    #[error("Numerical divergence at iteration {iteration}: non-finite values in the contrast or estimate")]
    NumericalDivergence {
        /// Iteration at which the non-finite value appeared.
        iteration: usize,
        /// Last source estimate that was entirely finite.
        last_finite: Box<Array2<f64>>,
    },

    /// Separation stopped before the contrast fell below the tolerance.
    ///
    /// The solvers never return this themselves; it is produced by
    /// [`crate::BssResult::into_converged`].
    #[error(
        "Separation did not converge after {iterations} iterations. \
         Final contrast norm: {contrast_norm:.4e}, requested tolerance: {tolerance:.4e}. \
         Consider a smaller learning rate or more iterations."
    )]
    NonConvergence {
        /// Number of iterations performed.
        iterations: usize,
        /// Frobenius norm of the last contrast matrix.
        contrast_norm: f64,
        /// Requested tolerance.
        tolerance: f64,
    },

    /// Input dimensions are invalid.
    #[error("Invalid dimensions: {message}")]
    InvalidDimensions {
        /// Description of the dimension error.
        message: String,
    },

    /// Invalid configuration parameter.
    #[error("Invalid configuration for '{parameter}': {message}")]
    InvalidConfig {
        /// Name of the invalid parameter.
        parameter: String,
        /// Description of why it's invalid.
        message: String,
    },

    /// A decomposition failed.
    #[error("Computation error: {message}")]
    ComputationError {
        /// Description of what went wrong.
        message: String,
    },

    /// Reading or writing audio failed.
    #[error("Audio error: {message}")]
    Audio {
        /// Description of the I/O or codec failure.
        message: String,
    },
}

impl From<hound::Error> for BssError {
    fn from(err: hound::Error) -> Self {
        BssError::Audio {
            message: err.to_string(),
        }
    }
}

/// Convenience type alias for Results with BssError.
pub type Result<T> = std::result::Result<T, BssError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = BssError::UnsupportedMethod {
            method: "bogus".into(),
        };
        assert!(err.to_string().contains("'bogus'"));

        let err = BssError::InvalidConfig {
            parameter: "epsilon".into(),
            message: "must be positive".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid configuration for 'epsilon': must be positive"
        );

        let err = BssError::NonConvergence {
            iterations: 200,
            contrast_norm: 0.5,
            tolerance: 1e-3,
        };
        assert!(err.to_string().starts_with("Separation did not converge after 200"));
    }

    #[test]
    fn test_divergence_keeps_last_estimate() {
        let err = BssError::NumericalDivergence {
            iteration: 7,
            last_finite: Box::new(Array2::ones((2, 3))),
        };
        match err {
            BssError::NumericalDivergence {
                iteration,
                last_finite,
            } => {
                assert_eq!(iteration, 7);
                assert_eq!(last_finite.dim(), (2, 3));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
