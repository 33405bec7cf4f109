//! Adam optimizer with L2 or decoupled weight decay for the online solver.

use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

/// How weight decay enters the update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightDecay {
    /// L2 penalty: `weight_decay · p` is added to the gradient before the
    /// moment estimates, so it is rescaled by the adaptive step.
    #[default]
    Coupled,
    /// AdamW: `p` shrinks by `learning_rate · weight_decay · p` outside the
    /// adaptive step.
    Decoupled,
}

/// Adam hyperparameters.
#[derive(Clone, Debug)]
pub struct AdamConfig {
    /// Step size.
    pub learning_rate: f64,
    /// Exponential decay of the first moment estimate.
    pub beta1: f64,
    /// Exponential decay of the second moment estimate.
    pub beta2: f64,
    /// Denominator regularizer.
    pub eps: f64,
    /// Weight decay strength.
    pub weight_decay: f64,
    /// Where the weight decay is applied.
    pub decay_mode: WeightDecay,
}

impl Default for AdamConfig {
    fn default() -> Self {
        AdamConfig {
            learning_rate: 2e-3,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            weight_decay: 1e-5,
            decay_mode: WeightDecay::Coupled,
        }
    }
}

/// Moment buffers and step counter for one matrix parameter.
#[derive(Clone, Debug)]
pub struct Adam {
    pub config: AdamConfig,
    m: Array2<f64>,
    v: Array2<f64>,
    step: u32,
}

impl Adam {
    /// Optimizer state for a parameter of shape `dim`.
    pub fn new(dim: (usize, usize), config: AdamConfig) -> Self {
        Adam {
            config,
            m: Array2::zeros(dim),
            v: Array2::zeros(dim),
            step: 0,
        }
    }

    /// Number of steps taken.
    pub fn steps(&self) -> u32 {
        self.step
    }

    /// One update of `params` along `grads`, in place.
    ///
    /// Bias correction uses the optimizer's own step count.
    pub fn step(&mut self, params: &mut Array2<f64>, grads: &Array2<f64>) {
        debug_assert_eq!(params.dim(), grads.dim());
        let AdamConfig {
            learning_rate: lr,
            beta1,
            beta2,
            eps,
            weight_decay,
            decay_mode,
        } = self.config;

        self.step += 1;
        let bc1_inv = 1.0 / (1.0 - beta1.powi(self.step as i32));
        let bc2_inv = 1.0 / (1.0 - beta2.powi(self.step as i32));

        Zip::from(params)
            .and(grads)
            .and(&mut self.m)
            .and(&mut self.v)
            .for_each(|p, &g, m, v| {
                let g = match decay_mode {
                    WeightDecay::Coupled => g + weight_decay * *p,
                    WeightDecay::Decoupled => g,
                };
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;
                let m_hat = *m * bc1_inv;
                let v_hat = *v * bc2_inv;
                let mut delta = m_hat / (v_hat.sqrt() + eps);
                if decay_mode == WeightDecay::Decoupled {
                    delta += weight_decay * *p;
                }
                *p -= lr * delta;
            });
    }

    /// Reset moments and step counter.
    pub fn reset(&mut self) {
        self.m.fill(0.0);
        self.v.fill(0.0);
        self.step = 0;
    }
}
