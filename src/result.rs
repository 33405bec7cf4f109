//! Result types for the separation solvers.

use crate::error::{BssError, Result};
use crate::math::{frobenius_norm, invert};
use ndarray::{Array1, Array2};

/// Why a solver stopped without meeting its tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The iteration (or epoch) budget was exhausted.
    MaxIterations,
    /// The loss history increased between the last two iterations.
    LossIncrease,
    /// The next estimate or its contrast was not finite.
    Diverged,
    /// Packaged before the solver reached a terminal state.
    Interrupted,
}

/// Terminal state of a solver run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The contrast norm fell below the tolerance.
    Converged,
    /// Best-effort estimate; not a guaranteed fixed point.
    Aborted(AbortReason),
    /// Fixed number of epochs completed (online solver).
    Completed,
}

/// Result of running a separation solver.
#[derive(Debug, Clone)]
pub struct BssResult {
    /// Estimated sources (n_channels × n_samples).
    pub sources: Array2<f64>,

    /// Unmixing matrix B acting on the (whitened) centered mixture.
    pub unmixing: Array2<f64>,

    /// Whitening matrix W. None if whitening was disabled.
    pub whitening: Option<Array2<f64>>,

    /// Per-channel mean removed from the input. None if centering was disabled.
    pub mean: Option<Array1<f64>>,

    /// Kurtosis of each estimated source.
    pub kurtosis: Array1<f64>,

    /// Last contrast matrix evaluated.
    pub contrast: Array2<f64>,

    /// One scalar summary of the contrast per iteration.
    pub loss_history: Vec<f64>,

    /// Number of iterations (or epochs) performed.
    pub n_iterations: usize,

    /// Tolerance the contrast norm was compared against, if any.
    pub tolerance: Option<f64>,

    /// How the run ended.
    pub termination: Termination,
}

impl BssResult {
    /// Whether the run met its tolerance.
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }

    /// Frobenius norm of the last contrast matrix.
    pub fn contrast_norm(&self) -> f64 {
        frobenius_norm(&self.contrast)
    }

    /// Get the full unmixing matrix that transforms centered data to sources.
    ///
    /// This is `B · W` if whitening was used, otherwise just `B`.
    pub fn full_unmixing(&self) -> Array2<f64> {
        match &self.whitening {
            Some(w) => self.unmixing.dot(w),
            None => self.unmixing.clone(),
        }
    }

    /// Get the estimated mixing matrix (inverse of the full unmixing).
    ///
    /// This maps sources back to the mixture channels.
    pub fn mixing(&self) -> Result<Array2<f64>> {
        invert(&self.full_unmixing())
    }

    /// Turn an aborted run into [`BssError::NonConvergence`].
    pub fn into_converged(self) -> Result<Self> {
        match self.termination {
            Termination::Aborted(_) => Err(BssError::NonConvergence {
                iterations: self.n_iterations,
                contrast_norm: self.contrast_norm(),
                tolerance: self.tolerance.unwrap_or(0.0),
            }),
            _ => Ok(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn result_with(termination: Termination) -> BssResult {
        BssResult {
            sources: Array2::zeros((2, 4)),
            unmixing: array![[2.0, 0.0], [0.0, 1.0]],
            whitening: Some(array![[1.0, 1.0], [0.0, 1.0]]),
            mean: None,
            kurtosis: Array1::zeros(2),
            contrast: array![[0.3, 0.0], [0.0, 0.4]],
            loss_history: vec![1.0, 0.5],
            n_iterations: 2,
            tolerance: Some(1e-3),
            termination,
        }
    }

    #[test]
    fn test_full_unmixing_and_mixing() {
        let result = result_with(Termination::Converged);
        let full = result.full_unmixing();
        assert_eq!(full, array![[2.0, 2.0], [0.0, 1.0]]);

        let a = result.mixing().unwrap();
        let id = full.dot(&a);
        assert!((id[[0, 0]] - 1.0).abs() < 1e-12);
        assert!((id[[1, 1]] - 1.0).abs() < 1e-12);
        assert!(id[[0, 1]].abs() < 1e-12);
    }

    #[test]
    fn test_into_converged() {
        assert!(result_with(Termination::Converged).into_converged().is_ok());
        assert!(result_with(Termination::Completed).into_converged().is_ok());

        match result_with(Termination::Aborted(AbortReason::MaxIterations)).into_converged() {
            Err(BssError::NonConvergence {
                iterations,
                contrast_norm,
                ..
            }) => {
                assert_eq!(iterations, 2);
                assert!((contrast_norm - 0.5).abs() < 1e-12);
            }
            other => panic!("expected NonConvergence, got {:?}", other.map(|r| r.termination)),
        }
    }
}
