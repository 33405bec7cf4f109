// src/config.rs

//! Configuration for the offline and online separation solvers.

use crate::adam::WeightDecay;
use crate::contrast::{ContrastForm, KurtosisConvention, LossReduction};
use crate::error::{BssError, Result};
use crate::score::ScoreVariant;
use crate::whitening::WhiteningMethod;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

fn positive(parameter: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(BssError::InvalidConfig {
            parameter: parameter.into(),
            message: format!("must be positive and finite, got {}", value),
        });
    }
    Ok(())
}

fn non_zero(parameter: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(BssError::InvalidConfig {
            parameter: parameter.into(),
            message: "must be greater than 0".into(),
        });
    }
    Ok(())
}

/// Configuration parameters for the offline relative-gradient solver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BssConfig {
    /// Whitening transform applied before iterating (if `whiten`).
    pub method: WhiteningMethod,

    /// Convergence threshold on the Frobenius norm of the contrast matrix.
    pub epsilon: f64,

    /// Relative-gradient step size η.
    pub learning_rate: f64,

    /// Maximum number of iterations.
    pub max_iterations: usize,

    /// Score function.
    pub score_variant: ScoreVariant,

    /// Estimating-equation form.
    pub contrast_form: ContrastForm,

    /// If true, whiten the mixture before iterating.
    pub whiten: bool,

    /// If true, center the data when whitening is disabled.
    pub centering: bool,

    /// Kurtosis normalization fed to the score.
    pub kurtosis: KurtosisConvention,

    /// Scalar summary recorded in the loss history.
    pub loss_reduction: LossReduction,

    /// If true, abort as soon as the loss stops decreasing.
    pub early_stop: bool,

    /// Number of recorded losses before the early-stop check is armed.
    pub warmup_iterations: usize,
}

impl Default for BssConfig {
    fn default() -> Self {
        Self {
            method: WhiteningMethod::Zca,
            epsilon: 1e-3,
            learning_rate: 5e-3,
            max_iterations: 200,
            score_variant: ScoreVariant::Cubic,
            contrast_form: ContrastForm::Symmetric,
            whiten: true,
            centering: true,
            kurtosis: KurtosisConvention::Fisher,
            loss_reduction: LossReduction::Frobenius,
            early_stop: true,
            warmup_iterations: 3,
        }
    }
}

impl BssConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for constructing a configuration.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Whitened asymmetric contrast with the Edgeworth score.
    ///
    /// Stable for sub-Gaussian sources; super-Gaussian channels make the
    /// diagonal of this contrast grow without bound and usually end in an
    /// early stop.
    pub fn edgeworth() -> Self {
        Self {
            score_variant: ScoreVariant::Edgeworth,
            contrast_form: ContrastForm::Asymmetric,
            ..Self::default()
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        positive("epsilon", self.epsilon)?;
        positive("learning_rate", self.learning_rate)?;
        non_zero("max_iterations", self.max_iterations)?;
        Ok(())
    }
}

/// Builder for constructing `BssConfig` with a fluent API.
#[derive(Default)]
pub struct ConfigBuilder {
    config: BssConfig,
}

impl ConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self {
            config: BssConfig::default(),
        }
    }

    /// Start from an existing configuration.
    pub fn from_config(config: BssConfig) -> Self {
        Self { config }
    }

    /// Set the whitening method.
    pub fn method(mut self, method: WhiteningMethod) -> Self {
        self.config.method = method;
        self
    }

    /// Set the convergence threshold.
    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.config.epsilon = epsilon;
        self
    }

    /// Set the learning rate.
    pub fn learning_rate(mut self, learning_rate: f64) -> Self {
        self.config.learning_rate = learning_rate;
        self
    }

    /// Set the maximum number of iterations.
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set the score function.
    pub fn score_variant(mut self, score_variant: ScoreVariant) -> Self {
        self.config.score_variant = score_variant;
        self
    }

    /// Set the contrast form.
    pub fn contrast_form(mut self, contrast_form: ContrastForm) -> Self {
        self.config.contrast_form = contrast_form;
        self
    }

    /// Enable or disable whitening.
    pub fn whiten(mut self, whiten: bool) -> Self {
        self.config.whiten = whiten;
        self
    }

    /// Enable or disable centering.
    pub fn centering(mut self, centering: bool) -> Self {
        self.config.centering = centering;
        self
    }

    /// Set the kurtosis convention.
    pub fn kurtosis(mut self, kurtosis: KurtosisConvention) -> Self {
        self.config.kurtosis = kurtosis;
        self
    }

    /// Set the loss reduction.
    pub fn loss_reduction(mut self, loss_reduction: LossReduction) -> Self {
        self.config.loss_reduction = loss_reduction;
        self
    }

    /// Enable or disable the early-stop heuristic.
    pub fn early_stop(mut self, early_stop: bool) -> Self {
        self.config.early_stop = early_stop;
        self
    }

    /// Set how many losses are recorded before early stopping can trigger.
    pub fn warmup_iterations(mut self, warmup_iterations: usize) -> Self {
        self.config.warmup_iterations = warmup_iterations;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> BssConfig {
        self.config
    }

    /// Build and validate the configuration.
    pub fn build_validated(self) -> Result<BssConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration parameters for the online adaptive solver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnlineConfig {
    /// Number of optimizer steps; there is no adaptive stopping.
    pub epochs: usize,

    /// Optimizer learning rate.
    pub learning_rate: f64,

    /// Weight decay strength.
    pub weight_decay: f64,

    /// L2 penalty folded into the gradient, or AdamW-style decoupled decay.
    pub weight_decay_mode: WeightDecay,

    /// Exponential decay of the first moment estimate.
    pub beta1: f64,

    /// Exponential decay of the second moment estimate.
    pub beta2: f64,

    /// Denominator regularizer of the optimizer.
    pub adam_epsilon: f64,

    /// Samples per block. If None, every epoch sees the whole signal.
    pub block_len: Option<usize>,

    /// Score function.
    pub score_variant: ScoreVariant,

    /// Estimating-equation form.
    pub contrast_form: ContrastForm,

    /// Kurtosis normalization fed to the score.
    pub kurtosis: KurtosisConvention,

    /// Scalar summary recorded in the loss history.
    pub loss_reduction: LossReduction,

    /// If true, center the data before processing.
    pub centering: bool,

    /// Initial unmixing matrix. If None, starts from the identity.
    pub init: Option<Array2<f64>>,
}

impl Default for OnlineConfig {
    fn default() -> Self {
        Self {
            epochs: 200,
            learning_rate: 2e-3,
            weight_decay: 1e-5,
            weight_decay_mode: WeightDecay::Coupled,
            beta1: 0.9,
            beta2: 0.999,
            adam_epsilon: 1e-8,
            block_len: None,
            score_variant: ScoreVariant::Edgeworth,
            contrast_form: ContrastForm::Symmetric,
            kurtosis: KurtosisConvention::Fisher,
            loss_reduction: LossReduction::Frobenius,
            centering: true,
            init: None,
        }
    }
}

impl OnlineConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for constructing a configuration.
    pub fn builder() -> OnlineConfigBuilder {
        OnlineConfigBuilder::new()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        non_zero("epochs", self.epochs)?;
        positive("learning_rate", self.learning_rate)?;
        positive("adam_epsilon", self.adam_epsilon)?;

        if !(self.weight_decay.is_finite() && self.weight_decay >= 0.0) {
            return Err(BssError::InvalidConfig {
                parameter: "weight_decay".into(),
                message: "must be non-negative and finite".into(),
            });
        }

        for (name, beta) in [("beta1", self.beta1), ("beta2", self.beta2)] {
            if !(0.0..1.0).contains(&beta) {
                return Err(BssError::InvalidConfig {
                    parameter: name.into(),
                    message: format!("must lie in [0, 1), got {}", beta),
                });
            }
        }

        if let Some(block_len) = self.block_len {
            if block_len < 2 {
                return Err(BssError::InvalidConfig {
                    parameter: "block_len".into(),
                    message: "blocks need at least 2 samples".into(),
                });
            }
        }

        Ok(())
    }
}

/// Builder for constructing `OnlineConfig` with a fluent API.
#[derive(Default)]
pub struct OnlineConfigBuilder {
    config: OnlineConfig,
}

impl OnlineConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self {
            config: OnlineConfig::default(),
        }
    }

    /// Set the number of epochs.
    pub fn epochs(mut self, epochs: usize) -> Self {
        self.config.epochs = epochs;
        self
    }

    /// Set the learning rate.
    pub fn learning_rate(mut self, learning_rate: f64) -> Self {
        self.config.learning_rate = learning_rate;
        self
    }

    /// Set the weight decay.
    pub fn weight_decay(mut self, weight_decay: f64) -> Self {
        self.config.weight_decay = weight_decay;
        self
    }

    /// Set where the weight decay is applied.
    pub fn weight_decay_mode(mut self, weight_decay_mode: WeightDecay) -> Self {
        self.config.weight_decay_mode = weight_decay_mode;
        self
    }

    /// Set the moment decay rates.
    pub fn betas(mut self, beta1: f64, beta2: f64) -> Self {
        self.config.beta1 = beta1;
        self.config.beta2 = beta2;
        self
    }

    /// Set the block length in samples.
    pub fn block_len(mut self, block_len: usize) -> Self {
        self.config.block_len = Some(block_len);
        self
    }

    /// Set the score function.
    pub fn score_variant(mut self, score_variant: ScoreVariant) -> Self {
        self.config.score_variant = score_variant;
        self
    }

    /// Set the contrast form.
    pub fn contrast_form(mut self, contrast_form: ContrastForm) -> Self {
        self.config.contrast_form = contrast_form;
        self
    }

    /// Set the kurtosis convention.
    pub fn kurtosis(mut self, kurtosis: KurtosisConvention) -> Self {
        self.config.kurtosis = kurtosis;
        self
    }

    /// Set the loss reduction.
    pub fn loss_reduction(mut self, loss_reduction: LossReduction) -> Self {
        self.config.loss_reduction = loss_reduction;
        self
    }

    /// Enable or disable centering.
    pub fn centering(mut self, centering: bool) -> Self {
        self.config.centering = centering;
        self
    }

    /// Set the initial unmixing matrix.
    pub fn init(mut self, init: Array2<f64>) -> Self {
        self.config.init = Some(init);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> OnlineConfig {
        self.config
    }

    /// Build and validate the configuration.
    pub fn build_validated(self) -> Result<OnlineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
