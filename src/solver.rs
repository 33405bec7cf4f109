// src/solver.rs

//! Main separation interface.

use crate::config::{BssConfig, OnlineConfig};
use crate::core::OfflineSolver;
use crate::error::{BssError, Result};
use crate::online::OnlineSolver;
use crate::result::BssResult;

use ndarray::{Array2, Axis};

/// Blind source separation entry points.
///
/// This struct provides static methods for fitting and applying separations.
pub struct Bss;

impl Bss {
    /// Fit with the default offline configuration.
    ///
    /// # Arguments
    /// * `x` - Mixture of shape (n_channels, n_samples)
    ///
    /// # Returns
    /// * `BssResult` containing sources, unmixing matrix, loss history, etc.
    pub fn fit(x: &Array2<f64>) -> Result<BssResult> {
        Self::fit_with_config(x, &BssConfig::default())
    }

    /// Fit with the offline relative-gradient solver.
    ///
    /// An aborted run is still returned as `Ok`; use
    /// [`BssResult::into_converged`] to treat it as an error.
    ///
    /// # Arguments
    /// * `x` - Mixture of shape (n_channels, n_samples)
    /// * `config` - Algorithm configuration
    pub fn fit_with_config(x: &Array2<f64>, config: &BssConfig) -> Result<BssResult> {
        OfflineSolver::new(x, config)?.run()
    }

    /// Fit with the online Adam-driven solver.
    ///
    /// # Arguments
    /// * `x` - Mixture of shape (n_channels, n_samples)
    /// * `config` - Online configuration
    pub fn fit_online(x: &Array2<f64>, config: &OnlineConfig) -> Result<BssResult> {
        OnlineSolver::new(x, config)?.run()
    }

    /// Apply a fitted separation to new data.
    ///
    /// # Arguments
    /// * `x` - New mixture (n_channels, n_samples)
    /// * `result` - Result from a previous fit
    ///
    /// # Returns
    /// * Separated signals (n_channels, n_samples)
    pub fn transform(x: &Array2<f64>, result: &BssResult) -> Result<Array2<f64>> {
        let w = result.full_unmixing();
        if x.nrows() != w.ncols() {
            return Err(BssError::InvalidDimensions {
                message: format!("expected {} channels, got {}", w.ncols(), x.nrows()),
            });
        }

        let centered = match &result.mean {
            Some(mean) => x - &mean.view().insert_axis(Axis(1)),
            None => x.clone(),
        };

        Ok(w.dot(&centered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::Termination;
    use crate::utils::synthetic_mixture;
    use crate::whitening::WhiteningMethod;

    #[test]
    fn test_fit_default() {
        let (_, _, x) = synthetic_mixture(1000, 42);

        let result = Bss::fit(&x).unwrap();

        assert_eq!(result.sources.dim(), (2, 1000));
        assert_eq!(result.unmixing.dim(), (2, 2));
        assert!(result.whitening.is_some());
        assert!(result.n_iterations <= 200);
        assert!(!result.loss_history.is_empty() || result.converged());
    }

    #[test]
    fn test_fit_with_config() {
        let (_, _, x) = synthetic_mixture(1000, 42);

        let config = BssConfig::builder()
            .method(WhiteningMethod::Pca)
            .max_iterations(50)
            .early_stop(false)
            .build();

        let result = Bss::fit_with_config(&x, &config).unwrap();

        assert!(result.n_iterations <= 50);
        assert_eq!(result.tolerance, Some(config.epsilon));
    }

    #[test]
    fn test_transform() {
        let (_, _, x) = synthetic_mixture(1000, 42);

        let config = BssConfig::builder().max_iterations(30).build();
        let result = Bss::fit_with_config(&x, &config).unwrap();

        // Transform the same data
        let transformed = Bss::transform(&x, &result).unwrap();

        assert_eq!(transformed.dim(), result.sources.dim());
        for (a, b) in transformed.iter().zip(result.sources.iter()) {
            assert!((a - b).abs() < 1e-8, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_transform_online() {
        let (_, _, x) = synthetic_mixture(500, 43);

        let config = OnlineConfig::builder().epochs(5).build();
        let result = Bss::fit_online(&x, &config).unwrap();
        assert_eq!(result.termination, Termination::Completed);

        let transformed = Bss::transform(&x, &result).unwrap();
        for (a, b) in transformed.iter().zip(result.sources.iter()) {
            assert!((a - b).abs() < 1e-8);
        }
    }

    #[test]
    fn test_transform_wrong_channels() {
        let (_, _, x) = synthetic_mixture(300, 44);
        let config = BssConfig::builder().max_iterations(2).build();
        let result = Bss::fit_with_config(&x, &config).unwrap();

        let other = Array2::zeros((3, 10));
        assert!(matches!(
            Bss::transform(&other, &result),
            Err(BssError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_no_whiten() {
        let (_, _, x) = synthetic_mixture(1000, 42);

        let config = BssConfig::builder()
            .whiten(false)
            .max_iterations(20)
            .build();

        let result = Bss::fit_with_config(&x, &config).unwrap();

        assert!(result.whitening.is_none());
        assert!(result.mean.is_some());
    }

    #[test]
    fn test_no_centering() {
        let (_, _, x) = synthetic_mixture(500, 45);

        let config = BssConfig::builder()
            .whiten(false)
            .centering(false)
            .max_iterations(5)
            .build();

        let result = Bss::fit_with_config(&x, &config).unwrap();
        assert!(result.mean.is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let (_, _, x) = synthetic_mixture(100, 46);
        let config = BssConfig::builder().learning_rate(-1.0).build();
        assert!(matches!(
            Bss::fit_with_config(&x, &config),
            Err(BssError::InvalidConfig { .. })
        ));
    }
}
