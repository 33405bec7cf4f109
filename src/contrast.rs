// src/contrast.rs

//! Contrast matrix (sample-averaged estimating equation).
//!
//! For a channels × samples estimate `Y` with per-channel kurtosis `k`, the
//! contrast measures the residual statistical dependence between channels.
//! It vanishes when the channels are independent and suitably scaled.

use crate::error::{BssError, Result};
use crate::math::frobenius_norm;
use crate::score::{Score, ScoreVariant};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Normalization of the fourth standardized moment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KurtosisConvention {
    /// Excess kurtosis, 0 for a Gaussian.
    #[default]
    Fisher,
    /// Raw fourth standardized moment, 3 for a Gaussian.
    Pearson,
}

/// Which estimating equation to evaluate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContrastForm {
    /// `E[φ(y)·yᵗ] − I`; assumes the input was whitened beforehand.
    Asymmetric,
    /// `E[y·yᵗ] − I + E[φ(y)·yᵗ] − E[y·φ(y)ᵗ]`; decorrelates and separates jointly.
    #[default]
    Symmetric,
}

impl FromStr for ContrastForm {
    type Err = BssError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asymmetric" => Ok(ContrastForm::Asymmetric),
            "symmetric" => Ok(ContrastForm::Symmetric),
            _ => Err(BssError::InvalidConfig {
                parameter: "contrast_form".into(),
                message: format!("unknown form '{}', expected asymmetric or symmetric", s),
            }),
        }
    }
}

impl FromStr for KurtosisConvention {
    type Err = BssError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fisher" => Ok(KurtosisConvention::Fisher),
            "pearson" => Ok(KurtosisConvention::Pearson),
            _ => Err(BssError::InvalidConfig {
                parameter: "kurtosis".into(),
                message: format!("unknown convention '{}', expected fisher or pearson", s),
            }),
        }
    }
}

/// Scalar summary of a contrast matrix, recorded as the loss.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossReduction {
    /// Sum of all entries.
    Sum,
    /// Frobenius norm.
    #[default]
    Frobenius,
}

impl LossReduction {
    /// Reduce a contrast matrix to a scalar.
    pub fn reduce(&self, h: &Array2<f64>) -> f64 {
        match self {
            LossReduction::Sum => h.sum(),
            LossReduction::Frobenius => frobenius_norm(h),
        }
    }
}

impl FromStr for LossReduction {
    type Err = BssError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(LossReduction::Sum),
            "frobenius" => Ok(LossReduction::Frobenius),
            _ => Err(BssError::InvalidConfig {
                parameter: "loss_reduction".into(),
                message: format!("unknown reduction '{}', expected sum or frobenius", s),
            }),
        }
    }
}

/// Per-channel kurtosis of a channels × samples matrix.
///
/// Moments are the biased (divide by T) sample moments around the channel
/// mean. A zero-variance channel yields a non-finite value.
pub fn kurtosis(y: ArrayView2<'_, f64>, convention: KurtosisConvention) -> Array1<f64> {
    let t = y.ncols() as f64;
    let offset = match convention {
        KurtosisConvention::Fisher => 3.0,
        KurtosisConvention::Pearson => 0.0,
    };

    y.map_axis(Axis(1), |row| {
        let mean = row.sum() / t;
        let (m2, m4) = row.iter().fold((0.0, 0.0), |(m2, m4), &v| {
            let d = v - mean;
            let d2 = d * d;
            (m2 + d2, m4 + d2 * d2)
        });
        let (m2, m4) = (m2 / t, m4 / t);
        m4 / (m2 * m2) - offset
    })
}

/// Sample-averaged contrast matrix.
///
/// Accumulates over all `T` columns of `y` and divides by `T`.
pub fn contrast_matrix<S: Score>(
    y: ArrayView2<'_, f64>,
    k: &Array1<f64>,
    score: &S,
    form: ContrastForm,
) -> Array2<f64> {
    let (n, t) = y.dim();
    let t = t as f64;
    let phi = score.score(y, k.view());
    let phi_yt = phi.dot(&y.t());

    let mut h = match form {
        ContrastForm::Asymmetric => phi_yt / t,
        ContrastForm::Symmetric => {
            let y_yt = y.dot(&y.t());
            (y_yt + &phi_yt - &phi_yt.t()) / t
        }
    };

    for i in 0..n {
        h[[i, i]] -= 1.0;
    }
    h
}

/// Norm of the off-diagonal part of a square matrix.
pub fn off_diagonal_norm(h: &Array2<f64>) -> f64 {
    h.indexed_iter()
        .filter(|((i, j), _)| i != j)
        .map(|(_, &v)| v * v)
        .sum::<f64>()
        .sqrt()
}

/// Contrast matrix together with the kurtosis it was computed from.
#[derive(Debug, Clone)]
pub struct Contrast {
    /// n × n contrast matrix H.
    pub matrix: Array2<f64>,
    /// Kurtosis vector k used in the score.
    pub kurtosis: Array1<f64>,
}

impl Contrast {
    /// Frobenius norm of H.
    pub fn norm(&self) -> f64 {
        frobenius_norm(&self.matrix)
    }

    /// True when every entry of H is finite.
    pub fn is_finite(&self) -> bool {
        self.matrix.iter().all(|v| v.is_finite())
    }
}

/// Bundles the score, form and kurtosis convention used by a solver.
#[derive(Clone, Debug, Default)]
pub struct ContrastEstimator {
    /// Score variant.
    pub score: ScoreVariant,
    /// Estimating-equation form.
    pub form: ContrastForm,
    /// Kurtosis normalization.
    pub convention: KurtosisConvention,
}

impl ContrastEstimator {
    /// Create an estimator.
    pub fn new(score: ScoreVariant, form: ContrastForm, convention: KurtosisConvention) -> Self {
        Self {
            score,
            form,
            convention,
        }
    }

    /// Kurtosis of the current estimate.
    pub fn kurtosis(&self, y: ArrayView2<'_, f64>) -> Array1<f64> {
        kurtosis(y, self.convention)
    }

    /// Contrast of `y` for an already computed kurtosis vector.
    pub fn contrast_with(&self, y: ArrayView2<'_, f64>, k: &Array1<f64>) -> Array2<f64> {
        contrast_matrix(y, k, &self.score, self.form)
    }

    /// Recompute kurtosis and contrast from scratch.
    pub fn estimate(&self, y: ArrayView2<'_, f64>) -> Contrast {
        let kurtosis = self.kurtosis(y);
        let matrix = self.contrast_with(y, &kurtosis);
        Contrast { matrix, kurtosis }
    }
}
