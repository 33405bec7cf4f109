// src/lib.rs

//! # EASI
//!
//! Blind source separation with equivariant relative-gradient updates driven
//! by a kurtosis-weighted score contrast.
//!
//! The crate follows the EASI family of algorithms from:
//!
//! > Jean-François Cardoso, Beate Hvam Laheld.
//! > "Equivariant adaptive source separation"
//! > IEEE Transactions on Signal Processing, 1996
//!
//! A mixture is an `n_channels × n_samples` matrix. It is whitened (ZCA, PCA,
//! Cholesky or their correlation variants), then an unmixing matrix is
//! refined until the contrast matrix `H(Y)` of the estimate vanishes. An
//! online variant trains the unmixing matrix with Adam on fixed-length blocks.
//!
//! ## Example
//!
//! ```rust,no_run
//! use easi::{Bss, BssConfig, OnlineConfig, WhiteningMethod};
//!
//! # fn main() -> Result<(), easi::BssError> {
//! let (x, sample_rate) = easi::audio::load("mixture.wav")?;
//!
//! // Offline separation with default settings
//! let result = Bss::fit(&x)?;
//!
//! // Or with custom configuration
//! let config = BssConfig::builder()
//!     .method(WhiteningMethod::Pca)
//!     .learning_rate(1e-2)
//!     .max_iterations(500)
//!     .build();
//! let result = Bss::fit_with_config(&x, &config)?;
//!
//! // Online separation over one-second blocks
//! let online = OnlineConfig::builder()
//!     .block_len(sample_rate as usize)
//!     .epochs(300)
//!     .build();
//! let streamed = Bss::fit_online(&x, &online)?;
//!
//! easi::audio::save("sources.wav", &result.sources, sample_rate)?;
//! # let _ = streamed;
//! # Ok(())
//! # }
//! ```

mod adam;
pub mod audio;
mod config;
mod contrast;
mod core;
mod error;
mod math;
mod online;
mod result;
mod score;
mod solver;
mod whitening;

pub use adam::{Adam, AdamConfig, WeightDecay};
pub use audio::{AudioAdapter, AudioClip, WavAdapter};
pub use config::{BssConfig, ConfigBuilder, OnlineConfig, OnlineConfigBuilder};
pub use contrast::{
    contrast_matrix, kurtosis, off_diagonal_norm, Contrast, ContrastEstimator, ContrastForm,
    KurtosisConvention, LossReduction,
};
pub use self::core::{OfflineSolver, SolverState};
pub use error::{BssError, Result};
pub use online::OnlineSolver;
pub use result::{AbortReason, BssResult, Termination};
pub use score::{Cubic, Edgeworth, Score, ScoreVariant};
pub use solver::Bss;
pub use whitening::{center, covariance, whiten, whiten_by_name, WhiteningMethod, WhiteningResult};

// Utility functions
pub mod utils;

// Re-export ndarray for convenience
pub use ndarray;
