//! # Linear Algebra
//!
//! $$
//! A^{+} = V\,\Sigma^{+}\,U^\top
//! $$
//!
//! Dense matrix helpers on top of nalgebra used by the optimizers.

use nalgebra::DMatrix;
use nalgebra::DVector;
use tracing::warn;

use crate::error::BacktestError;
use crate::error::Result;

/// Number of rows of a square matrix, or a dimension error.
pub fn ensure_square(a: &DMatrix<f64>, context: &str) -> Result<usize> {
  let (m, n) = a.shape();
  if m != n {
    return Err(BacktestError::dimension_mismatch(context, m, n));
  }
  Ok(m)
}

/// `a + ridge * I`.
pub fn add_ridge(a: &DMatrix<f64>, ridge: f64) -> DMatrix<f64> {
  let mut out = a.clone();
  for i in 0..out.nrows().min(out.ncols()) {
    out[(i, i)] += ridge;
  }
  out
}

/// Moore-Penrose pseudo-inverse.
///
/// Singular values below `max(m, n) * eps * sigma_max` are treated as zero. A matrix
/// with non-finite entries maps to an all-`NaN` result.
pub fn pinv(a: &DMatrix<f64>) -> DMatrix<f64> {
  let (m, n) = a.shape();
  if m == 0 || n == 0 {
    return DMatrix::zeros(n, m);
  }
  if a.iter().any(|v| !v.is_finite()) {
    return DMatrix::from_element(n, m, f64::NAN);
  }

  let svd = a.clone().svd(true, true);
  let sigma_max = svd.singular_values.iter().copied().fold(0.0, f64::max);
  let tol = m.max(n) as f64 * f64::EPSILON * sigma_max;

  svd
    .pseudo_inverse(tol)
    .unwrap_or_else(|_| DMatrix::from_element(n, m, f64::NAN))
}

/// Solve `a x = b` by LU decomposition.
///
/// A singular `a` falls back to the minimum-norm solution `pinv(a) b`.
pub fn solve(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>> {
  let n = ensure_square(a, "linear system")?;
  if b.len() != n {
    return Err(BacktestError::dimension_mismatch(
      "linear system right-hand side",
      n,
      b.len(),
    ));
  }

  match a.clone().lu().solve(b) {
    Some(x) => Ok(x),
    None => {
      warn!(n, "singular system, using pseudo-inverse solution");
      Ok(pinv(a) * b)
    }
  }
}
