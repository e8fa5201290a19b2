//! # Long-Only Mean-Variance
//!
//! $$
//! (\Sigma + \lambda I)\,x = \mu,\qquad w = \frac{\max(x, 0)}{\mathbf 1^\top \max(x, 0)}
//! $$
//!
//! Unconstrained Markowitz direction clipped to the long-only simplex.

use crate::error::BacktestError;
use crate::error::Result;
use crate::linalg::add_ridge;
use crate::linalg::ensure_square;
use crate::linalg::solve;
use crate::models::estimation::MeanCovEstimate;
use crate::weights::WeightVector;

/// Diagonal loading applied to covariance matrices before solving or inverting.
pub const DEFAULT_RIDGE: f64 = 1e-6;

/// Long-only weights from expected returns and covariance.
///
/// Negative components of the solution are clipped to zero. When nothing positive
/// survives the clip the uniform vector is returned.
pub fn long_only_weights(estimate: &MeanCovEstimate, ridge: f64) -> Result<WeightVector> {
  let n = ensure_square(&estimate.covariance, "covariance")?;
  if estimate.mean.len() != n {
    return Err(BacktestError::dimension_mismatch(
      "expected returns",
      n,
      estimate.mean.len(),
    ));
  }
  if estimate.assets.len() != n {
    return Err(BacktestError::dimension_mismatch(
      "asset labels",
      n,
      estimate.assets.len(),
    ));
  }

  let cov_reg = add_ridge(&estimate.covariance, ridge);
  let raw = solve(&cov_reg, &estimate.mean)?;
  let clipped = raw.iter().map(|&x| x.max(0.0)).collect();

  WeightVector::from_raw(estimate.assets.clone(), clipped)
}
