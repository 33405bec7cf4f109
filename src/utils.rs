//! Utility functions for evaluating and simulating separations.

use crate::error::{BssError, Result};
use ndarray::{array, Array2, ArrayView1, Axis};

/// Reorder the rows of a gain matrix so that its largest entries sit on the
/// diagonal.
///
/// Applied to `B · A` (unmixing times true mixing), a successful separation
/// comes out close to identity once `scale` divides each row by its diagonal.
/// Rows are assigned with the same search as [`match_sources`], maximizing
/// the summed squared diagonal.
pub fn permute(g: &Array2<f64>, scale: bool) -> Array2<f64> {
    // score[[i, r]]: weight of putting row r at position i
    let score = Array2::from_shape_fn(g.dim(), |(i, r)| g[[r, i]].powi(2));
    let order = best_assignment(&score);

    let mut out = g.select(Axis(0), &order);
    if scale {
        for (i, mut row) in out.rows_mut().into_iter().enumerate() {
            let diag = row[i];
            if diag.abs() > 1e-10 {
                row.mapv_inplace(|v| v / diag);
            }
        }
    }
    out
}

/// Compute the Amari distance between an unmixing and a mixing matrix.
///
/// The Amari distance measures how close `B @ A` is to a permutation
/// and scaling matrix. It equals 0 when B perfectly unmixes A.
pub fn amari_distance(b: &Array2<f64>, a: &Array2<f64>) -> f64 {
    let p = b.dot(a);
    let n = p.nrows() as f64;

    let s = |r: &Array2<f64>| -> f64 {
        let mut sum = 0.0;
        for row in r.rows() {
            let row_sum: f64 = row.iter().map(|&x| x * x).sum();
            let row_max: f64 = row.iter().map(|&x| x * x).fold(0.0, f64::max);
            if row_max > 1e-15 {
                sum += row_sum / row_max - 1.0;
            }
        }
        sum
    };

    let p_abs = p.mapv(f64::abs);
    let p_abs_t = p_abs.t().to_owned();

    (s(&p_abs) + s(&p_abs_t)) / (2.0 * n)
}

/// Pearson correlation coefficient of two equally long signals.
///
/// Returns 0 when either signal has zero variance.
pub fn pearson(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let mean_a = a.iter().take(n).sum::<f64>() / n as f64;
    let mean_b = b.iter().take(n).sum::<f64>() / n as f64;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (dx, dy) = (x - mean_a, y - mean_b);
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = (var_a * var_b).sqrt();
    if denom > 0.0 {
        cov / denom
    } else {
        0.0
    }
}

/// Assignment of estimated channels to reference sources.
#[derive(Debug, Clone)]
pub struct SourceMatch {
    /// `permutation[i]` is the estimated channel matched to source `i`.
    pub permutation: Vec<usize>,
    /// Sign that aligns each matched estimate with its source.
    pub signs: Vec<f64>,
    /// Absolute Pearson correlation of each matched pair.
    pub correlations: Vec<f64>,
}

impl SourceMatch {
    /// Smallest correlation over all matched pairs.
    pub fn min_correlation(&self) -> f64 {
        self.correlations.iter().cloned().fold(f64::INFINITY, f64::min)
    }

    /// Reorder, flip and rescale the estimate to unit variance per row.
    pub fn align(&self, estimate: &Array2<f64>) -> Array2<f64> {
        let mut out = Array2::zeros((self.permutation.len(), estimate.ncols()));
        for (i, (&p, &sign)) in self.permutation.iter().zip(&self.signs).enumerate() {
            let row = estimate.row(p);
            let std = row.std(0.0);
            let scale = if std > 0.0 { sign / std } else { sign };
            out.row_mut(i).assign(&row.mapv(|v| v * scale));
        }
        out
    }
}

/// Match estimated rows to reference rows, resolving the permutation and
/// sign ambiguity of blind separation.
///
/// The assignment maximizes the summed absolute correlation; it is exhaustive
/// up to 8 channels and greedy beyond.
pub fn match_sources(estimate: &Array2<f64>, reference: &Array2<f64>) -> Result<SourceMatch> {
    let n = reference.nrows();
    if estimate.nrows() != n || estimate.ncols() != reference.ncols() {
        return Err(BssError::InvalidDimensions {
            message: format!(
                "estimate shape {:?} doesn't match reference shape {:?}",
                estimate.dim(),
                reference.dim()
            ),
        });
    }

    // corr[[i, j]]: reference i against estimate j
    let corr = Array2::from_shape_fn((n, n), |(i, j)| pearson(reference.row(i), estimate.row(j)));
    let score = corr.mapv(f64::abs);

    let permutation = best_assignment(&score);

    let signs = permutation
        .iter()
        .enumerate()
        .map(|(i, &j)| if corr[[i, j]] < 0.0 { -1.0 } else { 1.0 })
        .collect();
    let correlations = permutation
        .iter()
        .enumerate()
        .map(|(i, &j)| score[[i, j]])
        .collect();

    Ok(SourceMatch {
        permutation,
        signs,
        correlations,
    })
}

/// Column chosen for each row maximizing the summed score; exhaustive up to
/// 8 rows, greedy beyond.
fn best_assignment(score: &Array2<f64>) -> Vec<usize> {
    let n = score.nrows();
    if n <= 8 {
        let mut best = (f64::NEG_INFINITY, Vec::new());
        let mut current = Vec::with_capacity(n);
        let mut used = vec![false; n];
        search_assignment(score, 0, 0.0, &mut current, &mut used, &mut best);
        best.1
    } else {
        greedy_assignment(score)
    }
}

fn search_assignment(
    score: &Array2<f64>,
    row: usize,
    total: f64,
    current: &mut Vec<usize>,
    used: &mut [bool],
    best: &mut (f64, Vec<usize>),
) {
    let n = score.nrows();
    if row == n {
        if total > best.0 {
            *best = (total, current.clone());
        }
        return;
    }
    for j in 0..n {
        if !used[j] {
            used[j] = true;
            current.push(j);
            search_assignment(score, row + 1, total + score[[row, j]], current, used, best);
            current.pop();
            used[j] = false;
        }
    }
}

fn greedy_assignment(score: &Array2<f64>) -> Vec<usize> {
    let n = score.nrows();
    let mut pairs: Vec<(usize, usize)> = (0..n).flat_map(|i| (0..n).map(move |j| (i, j))).collect();
    pairs.sort_by(|&(a, b), &(c, d)| score[[c, d]].total_cmp(&score[[a, b]]));

    let mut assignment = vec![usize::MAX; n];
    let mut used = vec![false; n];
    for (i, j) in pairs {
        if assignment[i] == usize::MAX && !used[j] {
            assignment[i] = j;
            used[j] = true;
        }
    }
    assignment
}

/// Pan two sources into a stereo mixture.
///
/// Uses the constant-gain panning matrix `[[a, 1 − a], [1 − a, a]]`, where
/// `a` is the left-channel gain of the first source. `a = 0.5` collapses both
/// channels onto the same signal and cannot be separated.
pub fn spatialize(sources: &Array2<f64>, angle: f64) -> Result<Array2<f64>> {
    if sources.nrows() != 2 {
        return Err(BssError::InvalidDimensions {
            message: format!("spatialize expects 2 sources, got {}", sources.nrows()),
        });
    }
    if !(0.0..=1.0).contains(&angle) {
        return Err(BssError::InvalidConfig {
            parameter: "angle".into(),
            message: format!("must lie in [0, 1], got {}", angle),
        });
    }

    let a = array![[angle, 1.0 - angle], [1.0 - angle, angle]];
    Ok(a.dot(sources))
}

/// Two independent unit-variance sources (uniform, Laplace), a fixed mixing
/// matrix and their mixture.
#[cfg(test)]
pub(crate) fn synthetic_mixture(t: usize, seed: u64) -> (Array2<f64>, Array2<f64>, Array2<f64>) {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rand_distr::Exp1;

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

    let a = array![[1.0, 0.6], [0.4, 1.0]];
    let x = a.dot(&s);
    (s, a, x)
}
