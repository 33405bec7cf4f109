// src/core.rs

//! Offline relative-gradient solver.
//!
//! The solver owns the source estimate `Y` and drives the contrast matrix
//! `H(Y)` toward zero with the equivariant update `Y ← Y − η·H·Y`. The
//! unmixing matrix is carried alongside with the same update, so that
//! `Y = B · W · (X − mean)` holds at every iteration.

use crate::config::BssConfig;
use crate::contrast::ContrastEstimator;
use crate::error::{BssError, Result};
use crate::math::{all_finite, frobenius_norm};
use crate::result::{AbortReason, BssResult, Termination};
use crate::whitening::{center, whiten};
use ndarray::{Array1, Array2};

/// Lifecycle of an offline solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    /// Preprocessing and first contrast evaluation.
    Initializing,
    /// Iterations remain.
    Iterating,
    /// The contrast norm fell below `epsilon`.
    Converged,
    /// Stopped by the iteration cap or the early-stop heuristic.
    Aborted(AbortReason),
}

impl SolverState {
    /// True for `Converged` and `Aborted`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SolverState::Converged | SolverState::Aborted(_))
    }
}

/// Caller-owned state of one offline separation run.
#[derive(Debug, Clone)]
pub struct OfflineSolver {
    config: BssConfig,
    estimator: ContrastEstimator,
    state: SolverState,
    y: Array2<f64>,
    unmixing: Array2<f64>,
    whitening: Option<Array2<f64>>,
    mean: Option<Array1<f64>>,
    kurtosis: Array1<f64>,
    contrast: Array2<f64>,
    loss_history: Vec<f64>,
    iteration: usize,
}

impl OfflineSolver {
    /// Preprocess the mixture and evaluate the first contrast.
    ///
    /// # Arguments
    /// * `x` - Mixture of shape (n_channels, n_samples)
    /// * `config` - Solver configuration
    pub fn new(x: &Array2<f64>, config: &BssConfig) -> Result<Self> {
        config.validate()?;

        let (n, t) = x.dim();
        if n == 0 || t == 0 {
            return Err(BssError::InvalidDimensions {
                message: "Input matrix cannot be empty".into(),
            });
        }

        let (y, whitening, mean) = if config.whiten {
            let result = whiten(x, config.method)?;
            (result.data, Some(result.whitening_matrix), Some(result.mean))
        } else if config.centering {
            let (centered, mean) = center(x);
            (centered, None, Some(mean))
        } else {
            (x.clone(), None, None)
        };

        let estimator = ContrastEstimator::new(
            config.score_variant,
            config.contrast_form,
            config.kurtosis,
        );

        let mut solver = Self {
            config: config.clone(),
            estimator,
            state: SolverState::Initializing,
            kurtosis: Array1::zeros(n),
            contrast: Array2::zeros((n, n)),
            y,
            unmixing: Array2::eye(n),
            whitening,
            mean,
            loss_history: Vec::with_capacity(config.max_iterations),
            iteration: 0,
        };

        let (k, h) = solver
            .evaluate(&solver.y)
            .ok_or_else(|| BssError::NumericalDivergence {
                iteration: 0,
                last_finite: Box::new(solver.y.clone()),
            })?;
        solver.kurtosis = k;
        solver.contrast = h;
        solver.state = if frobenius_norm(&solver.contrast) < config.epsilon {
            SolverState::Converged
        } else {
            SolverState::Iterating
        };

        log::debug!(
            "offline solver initialized: {} channels x {} samples, contrast norm = {:.4e}",
            n,
            t,
            frobenius_norm(&solver.contrast)
        );

        Ok(solver)
    }

    /// Kurtosis and contrast of `y`, or None if the contrast is not finite.
    fn evaluate(&self, y: &Array2<f64>) -> Option<(Array1<f64>, Array2<f64>)> {
        let k = self.estimator.kurtosis(y.view());
        let h = self.estimator.contrast_with(y.view(), &k);
        all_finite(&h).then_some((k, h))
    }

    /// Enter the terminal diverged state and report the last finite estimate.
    fn diverge(&mut self) -> BssError {
        self.state = SolverState::Aborted(AbortReason::Diverged);
        log::warn!("diverged at iteration {}", self.iteration + 1);
        BssError::NumericalDivergence {
            iteration: self.iteration + 1,
            last_finite: Box::new(self.y.clone()),
        }
    }

    /// Perform one relative-gradient iteration and apply the stopping policy.
    ///
    /// Returns the state after the iteration. Calling `step` on a terminal
    /// solver is a no-op. On `NumericalDivergence` the solver keeps the last
    /// finite estimate and becomes `Aborted(Diverged)`.
    pub fn step(&mut self) -> Result<SolverState> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }

        let eta = self.config.learning_rate;
        let h = &self.contrast;

        let y_next = &self.y - &(h.dot(&self.y) * eta);
        let unmixing_next = &self.unmixing - &(h.dot(&self.unmixing) * eta);
        if !all_finite(&y_next) || !all_finite(&unmixing_next) {
            return Err(self.diverge());
        }
        let Some((k_next, h_next)) = self.evaluate(&y_next) else {
            return Err(self.diverge());
        };

        let loss = self.config.loss_reduction.reduce(h);
        self.loss_history.push(loss);
        self.y = y_next;
        self.unmixing = unmixing_next;
        self.kurtosis = k_next;
        self.contrast = h_next;
        self.iteration += 1;

        let norm = frobenius_norm(&self.contrast);

        log::debug!(
            "iteration {}, contrast norm = {:.4e}, loss = {:.4e}",
            self.iteration,
            norm,
            loss
        );

        self.state = if norm < self.config.epsilon {
            SolverState::Converged
        } else if self.loss_increased() {
            SolverState::Aborted(AbortReason::LossIncrease)
        } else if self.iteration >= self.config.max_iterations {
            SolverState::Aborted(AbortReason::MaxIterations)
        } else {
            SolverState::Iterating
        };

        Ok(self.state)
    }

    fn loss_increased(&self) -> bool {
        let history = &self.loss_history;
        self.config.early_stop
            && history.len() > self.config.warmup_iterations
            && history.len() >= 2
            && history[history.len() - 1] > history[history.len() - 2]
    }

    /// Iterate until a terminal state and return the estimate.
    pub fn run(mut self) -> Result<BssResult> {
        while !self.step()?.is_terminal() {}

        match self.state {
            SolverState::Converged => log::info!(
                "converged after {} iterations, contrast norm = {:.4e}",
                self.iteration,
                frobenius_norm(&self.contrast)
            ),
            SolverState::Aborted(reason) => log::warn!(
                "stopped after {} iterations ({:?}), contrast norm = {:.4e}, tolerance = {:.4e}",
                self.iteration,
                reason,
                frobenius_norm(&self.contrast),
                self.config.epsilon
            ),
            _ => {}
        }

        Ok(self.into_result())
    }

    /// Package the current state, whatever it is, as a result.
    ///
    /// A solver that has not reached a terminal state reports
    /// `Aborted(Interrupted)`.
    pub fn into_result(self) -> BssResult {
        let termination = match self.state {
            SolverState::Converged => Termination::Converged,
            SolverState::Aborted(reason) => Termination::Aborted(reason),
            SolverState::Initializing | SolverState::Iterating => {
                Termination::Aborted(AbortReason::Interrupted)
            }
        };

        BssResult {
            sources: self.y,
            unmixing: self.unmixing,
            whitening: self.whitening,
            mean: self.mean,
            kurtosis: self.kurtosis,
            contrast: self.contrast,
            loss_history: self.loss_history,
            n_iterations: self.iteration,
            tolerance: Some(self.config.epsilon),
            termination,
        }
    }

    /// Current state.
    pub fn state(&self) -> SolverState {
        self.state
    }

    /// Current source estimate.
    pub fn sources(&self) -> &Array2<f64> {
        &self.y
    }

    /// Current unmixing matrix (acting on the whitened mixture).
    pub fn unmixing(&self) -> &Array2<f64> {
        &self.unmixing
    }

    /// Kurtosis of the current estimate.
    pub fn kurtosis(&self) -> &Array1<f64> {
        &self.kurtosis
    }

    /// Contrast of the current estimate.
    pub fn contrast(&self) -> &Array2<f64> {
        &self.contrast
    }

    /// Losses recorded so far.
    pub fn loss_history(&self) -> &[f64] {
        &self.loss_history
    }

    /// Iterations performed so far.
    pub fn iteration(&self) -> usize {
        self.iteration
    }
}
