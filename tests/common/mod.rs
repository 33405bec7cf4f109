#![allow(dead_code)]

use easi::ndarray::{array, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Exp1;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Unit-variance uniform and Laplace sources.
pub fn sources(t: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let half_width = 3.0_f64.sqrt();
    let laplace_scale = 1.0 / 2.0_f64.sqrt();

    let mut s = Array2::zeros((2, t));
    for j in 0..t {
        s[[0, j]] = rng.random_range(-half_width..half_width);
        let e: f64 = rng.sample(Exp1);
        let sign = if rng.random::<bool>() { 1.0 } else { -1.0 };
        s[[1, j]] = sign * e * laplace_scale;
    }
    s
}

/// Sources, mixing matrix and mixture.
pub fn mixture(t: usize, seed: u64) -> (Array2<f64>, Array2<f64>, Array2<f64>) {
    let s = sources(t, seed);
    let a = array![[1.0, 0.6], [0.4, 1.0]];
    let x = a.dot(&s);
    (s, a, x)
}
