//! # Sample Estimation
//!
//! $$
//! \hat\mu_i = \frac{1}{T}\sum_t R_{t,i},\qquad
//! \hat\Sigma_{ij} = \frac{1}{T_{ij}-1}\sum_{t}(R_{t,i}-\bar R_i)(R_{t,j}-\bar R_j)
//! $$
//!
//! Sample mean and covariance of a training window. Missing returns are skipped:
//! means use the available observations of each asset and covariances use the
//! pairwise-complete observations of each asset pair.

use nalgebra::DMatrix;
use nalgebra::DVector;
use ndarray::ArrayView1;

use crate::error::BacktestError;
use crate::error::Result;
use crate::frame::ReturnMatrix;

/// Smallest window accepted by [`estimate_mean_cov`] unless overridden.
pub const DEFAULT_MIN_OBSERVATIONS: usize = 6;

/// Expected returns and covariance over a labelled asset universe.
#[derive(Clone, Debug, PartialEq)]
pub struct MeanCovEstimate {
  pub assets: Vec<String>,
  pub mean: DVector<f64>,
  pub covariance: DMatrix<f64>,
}

fn nan_mean(xs: ArrayView1<'_, f64>) -> f64 {
  let (sum, count) = xs
    .iter()
    .filter(|v| !v.is_nan())
    .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
  if count == 0 {
    f64::NAN
  } else {
    sum / count as f64
  }
}

fn pairwise_covariance(x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
  let pairs: Vec<(f64, f64)> = x
    .iter()
    .zip(y.iter())
    .filter(|(a, b)| !a.is_nan() && !b.is_nan())
    .map(|(a, b)| (*a, *b))
    .collect();
  if pairs.len() < 2 {
    return f64::NAN;
  }

  let n = pairs.len() as f64;
  let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
  let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
  pairs
    .iter()
    .map(|(a, b)| (a - mx) * (b - my))
    .sum::<f64>()
    / (n - 1.0)
}

/// Sample mean and covariance of `window`.
///
/// Fails when the window holds fewer than `min_observations` rows or when no
/// covariance entry can be estimated. Assets without observations get a zero mean
/// and inestimable covariance entries are set to zero.
pub fn estimate_mean_cov(window: &ReturnMatrix, min_observations: usize) -> Result<MeanCovEstimate> {
  let n_obs = window.n_periods();
  if n_obs < min_observations {
    return Err(BacktestError::insufficient_data(format!(
      "need at least {min_observations} observations, got {n_obs}"
    )));
  }

  let n = window.n_assets();
  let mean = DVector::from_fn(n, |j, _| {
    let m = nan_mean(window.column(j));
    if m.is_nan() {
      0.0
    } else {
      m
    }
  });

  let mut covariance = DMatrix::from_element(n, n, f64::NAN);
  for i in 0..n {
    for j in i..n {
      let c = pairwise_covariance(window.column(i), window.column(j));
      covariance[(i, j)] = c;
      covariance[(j, i)] = c;
    }
  }

  if n > 0 && covariance.iter().all(|v| v.is_nan()) {
    return Err(BacktestError::insufficient_data(
      "covariance matrix is invalid (all NaN)",
    ));
  }
  for v in covariance.iter_mut() {
    if v.is_nan() {
      *v = 0.0;
    }
  }

  Ok(MeanCovEstimate {
    assets: window.assets().to_vec(),
    mean,
    covariance,
  })
}
