// src/online.rs

//! Online adaptive solver.
//!
//! Trains an n×n unmixing map on successive fixed-length blocks of the raw
//! mixture. Each epoch evaluates the contrast of the current block, records
//! its scalar reduction as the loss and takes one Adam step along the
//! relative gradient `H·B`. There is no adaptive stopping: the solver runs
//! for exactly the configured number of epochs.

use crate::adam::{Adam, AdamConfig};
use crate::config::OnlineConfig;
use crate::contrast::ContrastEstimator;
use crate::error::{BssError, Result};
use crate::math::all_finite;
use crate::result::{BssResult, Termination};
use crate::whitening::center;
use ndarray::{s, Array1, Array2, ArrayView2};

/// Caller-owned state of one online separation run.
#[derive(Debug, Clone)]
pub struct OnlineSolver {
    config: OnlineConfig,
    estimator: ContrastEstimator,
    optimizer: Adam,
    mixture: Array2<f64>,
    mean: Option<Array1<f64>>,
    unmixing: Array2<f64>,
    block_len: usize,
    n_blocks: usize,
    kurtosis: Array1<f64>,
    contrast: Array2<f64>,
    loss_history: Vec<f64>,
    epoch: usize,
}

impl OnlineSolver {
    /// Prepare the mixture and the trainable map.
    ///
    /// # Arguments
    /// * `x` - Mixture of shape (n_channels, n_samples)
    /// * `config` - Solver configuration
    pub fn new(x: &Array2<f64>, config: &OnlineConfig) -> Result<Self> {
        config.validate()?;

        let (n, t) = x.dim();
        if n == 0 || t < 2 {
            return Err(BssError::InvalidDimensions {
                message: format!("need at least one channel and two samples, got {:?}", x.dim()),
            });
        }

        let unmixing = match &config.init {
            Some(b) => {
                if b.dim() != (n, n) {
                    return Err(BssError::InvalidDimensions {
                        message: format!(
                            "init shape {:?} doesn't match expected ({}, {})",
                            b.dim(),
                            n,
                            n
                        ),
                    });
                }
                b.clone()
            }
            None => Array2::eye(n),
        };

        let (mixture, mean) = if config.centering {
            let (centered, mean) = center(x);
            (centered, Some(mean))
        } else {
            (x.clone(), None)
        };

        // A trailing partial block is dropped unless it is the only one
        let block_len = config.block_len.unwrap_or(t).min(t);
        let n_blocks = (t / block_len).max(1);

        let optimizer = Adam::new(
            (n, n),
            AdamConfig {
                learning_rate: config.learning_rate,
                beta1: config.beta1,
                beta2: config.beta2,
                eps: config.adam_epsilon,
                weight_decay: config.weight_decay,
                decay_mode: config.weight_decay_mode,
            },
        );

        log::debug!(
            "online solver initialized: {} channels, {} blocks of {} samples",
            n,
            n_blocks,
            block_len
        );

        Ok(Self {
            estimator: ContrastEstimator::new(
                config.score_variant,
                config.contrast_form,
                config.kurtosis,
            ),
            config: config.clone(),
            optimizer,
            mixture,
            mean,
            unmixing,
            block_len,
            n_blocks,
            kurtosis: Array1::zeros(n),
            contrast: Array2::zeros((n, n)),
            loss_history: Vec::with_capacity(config.epochs),
            epoch: 0,
        })
    }

    /// Block of the mixture visited at `epoch`.
    fn block(&self, epoch: usize) -> ArrayView2<'_, f64> {
        let start = (epoch % self.n_blocks) * self.block_len;
        self.mixture.slice(s![.., start..start + self.block_len])
    }

    /// Run one epoch. Returns the recorded loss.
    pub fn step(&mut self) -> Result<f64> {
        let y = self.unmixing.dot(&self.block(self.epoch));
        let contrast = self.estimator.estimate(y.view());
        if !contrast.is_finite() {
            return Err(BssError::NumericalDivergence {
                iteration: self.epoch,
                last_finite: Box::new(y),
            });
        }

        let loss = self.config.loss_reduction.reduce(&contrast.matrix);
        let grad = contrast.matrix.dot(&self.unmixing);

        let mut next = self.unmixing.clone();
        self.optimizer.step(&mut next, &grad);
        if !all_finite(&next) {
            return Err(BssError::NumericalDivergence {
                iteration: self.epoch,
                last_finite: Box::new(y),
            });
        }

        self.unmixing = next;
        self.kurtosis = contrast.kurtosis;
        self.contrast = contrast.matrix;
        self.loss_history.push(loss);
        self.epoch += 1;

        log::debug!("epoch {}, loss = {:.4e}", self.epoch, loss);

        Ok(loss)
    }

    /// Run all epochs and apply the final map to the whole mixture.
    pub fn run(mut self) -> Result<BssResult> {
        while self.epoch < self.config.epochs {
            self.step()?;
        }

        log::info!(
            "online solver finished {} epochs, last loss = {:.4e}",
            self.epoch,
            self.loss_history.last().copied().unwrap_or(f64::NAN)
        );

        Ok(self.into_result())
    }

    /// Apply the current map to the whole mixture and package the state.
    ///
    /// Kurtosis and contrast are re-evaluated on the returned sources, so they
    /// describe the final map over the whole signal rather than the last block.
    pub fn into_result(self) -> BssResult {
        let sources = self.unmixing.dot(&self.mixture);
        let contrast = self.estimator.estimate(sources.view());
        BssResult {
            sources,
            unmixing: self.unmixing,
            whitening: None,
            mean: self.mean,
            kurtosis: contrast.kurtosis,
            contrast: contrast.matrix,
            loss_history: self.loss_history,
            n_iterations: self.epoch,
            tolerance: None,
            termination: Termination::Completed,
        }
    }

    /// Current unmixing map.
    pub fn unmixing(&self) -> &Array2<f64> {
        &self.unmixing
    }

    /// Kurtosis of the last block visited.
    pub fn kurtosis(&self) -> &Array1<f64> {
        &self.kurtosis
    }

    /// Contrast of the last block visited.
    pub fn contrast(&self) -> &Array2<f64> {
        &self.contrast
    }

    /// Losses recorded so far.
    pub fn loss_history(&self) -> &[f64] {
        &self.loss_history
    }

    /// Epochs performed so far.
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// Number of distinct blocks the epochs cycle through.
    pub fn n_blocks(&self) -> usize {
        self.n_blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contrast::LossReduction;
    use crate::utils::{amari_distance, synthetic_mixture};
    use ndarray::array;

    #[test]
    fn test_runs_exact_number_of_epochs() {
        let (_, _, x) = synthetic_mixture(1000, 21);
        let config = OnlineConfig::builder().epochs(17).build();
        let result = OnlineSolver::new(&x, &config).unwrap().run().unwrap();

        assert_eq!(result.n_iterations, 17);
        assert_eq!(result.loss_history.len(), 17);
        assert_eq!(result.termination, Termination::Completed);
        assert_eq!(result.sources.dim(), (2, 1000));
        assert!(result.whitening.is_none());
        assert!(result.sources.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_result_statistics_describe_final_sources() {
        let (_, _, x) = synthetic_mixture(1200, 27);
        let config = OnlineConfig::builder().epochs(4).block_len(300).build();
        let result = OnlineSolver::new(&x, &config).unwrap().run().unwrap();

        let expected = ContrastEstimator::new(
            config.score_variant,
            config.contrast_form,
            config.kurtosis,
        )
        .estimate(result.sources.view());
        assert_eq!(result.kurtosis, expected.kurtosis);
        assert_eq!(result.contrast, expected.matrix);
    }

    #[test]
    fn test_blocks() {
        let (_, _, x) = synthetic_mixture(1050, 22);
        let config = OnlineConfig::builder().epochs(3).block_len(250).build();
        let solver = OnlineSolver::new(&x, &config).unwrap();

        assert_eq!(solver.n_blocks(), 4);
        assert_eq!(solver.block(0).dim(), (2, 250));
        // Epochs cycle back to the first block
        assert_eq!(solver.block(4), solver.block(0));
        assert_eq!(solver.block(5)[[0, 0]], solver.mixture[[0, 250]]);
    }

    #[test]
    fn test_block_longer_than_signal() {
        let (_, _, x) = synthetic_mixture(100, 23);
        let config = OnlineConfig::builder().epochs(2).block_len(400).build();
        let solver = OnlineSolver::new(&x, &config).unwrap();
        assert_eq!(solver.n_blocks(), 1);
        assert_eq!(solver.block(1).dim(), (2, 100));
    }

    #[test]
    fn test_separation_improves() {
        let (_, a, x) = synthetic_mixture(4000, 24);
        let config = OnlineConfig::builder()
            .epochs(600)
            .learning_rate(5e-3)
            .loss_reduction(LossReduction::Frobenius)
            .build();
        let result = OnlineSolver::new(&x, &config).unwrap().run().unwrap();

        let before = amari_distance(&Array2::eye(2), &a);
        let after = amari_distance(&result.unmixing, &a);
        assert!(after < before, "amari {} -> {}", before, after);

        let first = result.loss_history[0];
        let last = *result.loss_history.last().unwrap();
        assert!(last < first, "loss {} -> {}", first, last);
    }

    #[test]
    fn test_init_shape_checked() {
        let (_, _, x) = synthetic_mixture(100, 25);
        let config = OnlineConfig::builder().init(Array2::eye(3)).build();
        assert!(matches!(
            OnlineSolver::new(&x, &config),
            Err(BssError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_custom_init_is_used() {
        let (_, _, x) = synthetic_mixture(200, 26);
        let init = array![[2.0, 0.0], [0.0, 0.5]];
        let config = OnlineConfig::builder().init(init.clone()).epochs(1).build();
        let solver = OnlineSolver::new(&x, &config).unwrap();
        assert_eq!(solver.unmixing(), &init);
    }

    #[test]
    fn test_constant_channel_diverges() {
        let x = array![[1.0, 1.0, 1.0, 1.0], [0.5, -0.5, 1.5, -1.5]];
        let config = OnlineConfig::builder().epochs(3).build();
        let mut solver = OnlineSolver::new(&x, &config).unwrap();
        assert!(matches!(
            solver.step(),
            Err(BssError::NumericalDivergence { iteration: 0, .. })
        ));
    }
}
