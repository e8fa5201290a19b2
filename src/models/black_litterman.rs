//! # Black-Litterman
//!
//! $$
//! \mu_{BL} = \left[(\tau\Sigma)^{-1} + P^\top\Omega^{-1}P\right]^{-1}
//! \left[(\tau\Sigma)^{-1}\pi + P^\top\Omega^{-1}Q\right]
//! $$
//!
//! Posterior expected returns blending market-implied equilibrium returns with
//! investor views. All inversions are ridge-regularized pseudo-inverses.

use nalgebra::DMatrix;
use nalgebra::DVector;

use crate::error::BacktestError;
use crate::error::Result;
use crate::linalg::add_ridge;
use crate::linalg::ensure_square;
use crate::linalg::pinv;
use crate::models::estimation::MeanCovEstimate;
use crate::weights::WeightVector;

const MIN_CONFIDENCE: f64 = 1e-3;
const MIN_VIEW_VARIANCE: f64 = 1e-8;

/// Posterior mean and covariance.
#[derive(Clone, Debug, PartialEq)]
pub struct Posterior {
  pub mean: DVector<f64>,
  pub covariance: DMatrix<f64>,
}

/// Reverse-optimized returns `pi = risk_aversion * Sigma * w_mkt`.
///
/// `market_weights` is aligned to `assets`; assets it does not hold contribute zero.
pub fn implied_equilibrium_returns(
  assets: &[String],
  covariance: &DMatrix<f64>,
  market_weights: &WeightVector,
  risk_aversion: f64,
) -> Result<DVector<f64>> {
  let n = ensure_square(covariance, "covariance")?;
  if assets.len() != n {
    return Err(BacktestError::dimension_mismatch("asset labels", n, assets.len()));
  }

  let w_mkt = DVector::from_iterator(
    n,
    assets.iter().map(|a| market_weights.get(a).unwrap_or(0.0)),
  );
  Ok(covariance * w_mkt * risk_aversion)
}

/// Diagonal view uncertainty scaled by confidence.
///
/// $$
/// \Omega = \frac{1-c}{c}\,\operatorname{diag}\!\left(P\,\tau\Sigma\,P^\top\right)
/// $$
///
/// `confidence` is clamped into `[1e-3, 1]`; non-positive projected variances are
/// floored at `1e-8`.
pub fn omega_from_confidence(
  covariance: &DMatrix<f64>,
  view_matrix: &DMatrix<f64>,
  tau: f64,
  confidence: f64,
) -> Result<DMatrix<f64>> {
  let n = ensure_square(covariance, "covariance")?;
  if view_matrix.ncols() != n {
    return Err(BacktestError::dimension_mismatch(
      "view matrix columns",
      n,
      view_matrix.ncols(),
    ));
  }

  let c = confidence.clamp(MIN_CONFIDENCE, 1.0);
  let projected = view_matrix * (covariance * tau) * view_matrix.transpose();
  let scale = (1.0 - c) / c;
  let diag = projected.diagonal().map(|v| {
    let v = if v <= 0.0 { MIN_VIEW_VARIANCE } else { v };
    v * scale
  });

  Ok(DMatrix::from_diagonal(&diag))
}

/// Black-Litterman posterior.
///
/// With `omega = None` the view uncertainty is `diag(P tau Sigma_reg P')`.
/// Finiteness of the inputs is not checked; `NaN`s propagate to the output.
pub fn posterior(
  pi: &DVector<f64>,
  covariance: &DMatrix<f64>,
  view_matrix: &DMatrix<f64>,
  view_returns: &DVector<f64>,
  tau: f64,
  omega: Option<&DMatrix<f64>>,
  ridge: f64,
) -> Result<Posterior> {
  let n = ensure_square(covariance, "covariance")?;
  if pi.len() != n {
    return Err(BacktestError::dimension_mismatch(
      "equilibrium returns",
      n,
      pi.len(),
    ));
  }
  if view_matrix.ncols() != n {
    return Err(BacktestError::dimension_mismatch(
      "view matrix columns",
      n,
      view_matrix.ncols(),
    ));
  }
  let k = view_matrix.nrows();
  if view_returns.len() != k {
    return Err(BacktestError::dimension_mismatch(
      "view returns",
      k,
      view_returns.len(),
    ));
  }

  let sigma = add_ridge(covariance, ridge);
  let tau_sigma = &sigma * tau;

  let omega = match omega {
    Some(o) => {
      if o.shape() != (k, k) {
        return Err(BacktestError::dimension_mismatch("omega", k, o.nrows()));
      }
      o.clone()
    }
    None => {
      let projected = view_matrix * &tau_sigma * view_matrix.transpose();
      DMatrix::from_diagonal(&projected.diagonal())
    }
  };
  let omega = add_ridge(&omega, ridge);

  let tau_sigma_inv = pinv(&tau_sigma);
  let omega_inv = pinv(&omega);
  let pt_omega_inv = view_matrix.transpose() * omega_inv;

  let middle = &tau_sigma_inv + &pt_omega_inv * view_matrix;
  let middle_inv = pinv(&middle);

  let mean = &middle_inv * (&tau_sigma_inv * pi + &pt_omega_inv * view_returns);
  let covariance = sigma + middle_inv;

  Ok(Posterior { mean, covariance })
}

/// Posterior for one absolute view per asset.
///
/// `P = I`, `Q` is the sample mean of `prior`, equilibrium returns come from
/// `market_weights`, and `Omega` from `view_confidence`.
pub fn identity_view_posterior(
  prior: &MeanCovEstimate,
  market_weights: &WeightVector,
  risk_aversion: f64,
  tau: f64,
  view_confidence: f64,
  ridge: f64,
) -> Result<MeanCovEstimate> {
  let n = prior.assets.len();
  let pi = implied_equilibrium_returns(
    &prior.assets,
    &prior.covariance,
    market_weights,
    risk_aversion,
  )?;
  let p = DMatrix::<f64>::identity(n, n);
  let omega = omega_from_confidence(&prior.covariance, &p, tau, view_confidence)?;
  let post = posterior(
    &pi,
    &prior.covariance,
    &p,
    &prior.mean,
    tau,
    Some(&omega),
    ridge,
  )?;

  Ok(MeanCovEstimate {
    assets: prior.assets.clone(),
    mean: post.mean,
    covariance: post.covariance,
  })
}
