//! # Weight Vectors
//!
//! $$
//! w_i \ge 0,\qquad \sum_i w_i = 1
//! $$
//!
//! Long-only portfolio weights keyed by asset identifier. Every constructor
//! renormalizes, so a [`WeightVector`] always sums to one.

use std::collections::HashMap;
use std::collections::HashSet;

use tracing::warn;

use crate::error::BacktestError;
use crate::error::Result;

/// Outcome of [`renormalize`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Normalization {
  /// Raw weights were scaled to sum to one.
  Scaled,
  /// Raw sum was non-positive; weights were replaced by the uniform vector.
  UniformFallback,
}

/// Renormalize `values` in place to sum to one.
///
/// Non-finite and negative entries count as zero. A non-positive total yields the
/// uniform vector.
pub fn renormalize(values: &mut [f64]) -> Normalization {
  for v in values.iter_mut() {
    if !v.is_finite() || *v < 0.0 {
      *v = 0.0;
    }
  }

  let total: f64 = values.iter().sum();
  if total > 0.0 && total.is_finite() {
    for v in values.iter_mut() {
      *v /= total;
    }
    Normalization::Scaled
  } else {
    if !values.is_empty() {
      let u = 1.0 / values.len() as f64;
      values.fill(u);
    }
    Normalization::UniformFallback
  }
}

/// Normalized long-only weights over a set of assets.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightVector {
  assets: Vec<String>,
  values: Vec<f64>,
}

impl WeightVector {
  /// Build from raw, possibly unnormalized weights.
  pub fn from_raw(assets: Vec<String>, mut values: Vec<f64>) -> Result<Self> {
    if assets.len() != values.len() {
      return Err(BacktestError::dimension_mismatch(
        "weight vector",
        assets.len(),
        values.len(),
      ));
    }
    if assets.is_empty() {
      return Err(BacktestError::insufficient_data(
        "weight vector needs at least one asset",
      ));
    }

    let mut seen = HashSet::with_capacity(assets.len());
    for a in &assets {
      if !seen.insert(a.as_str()) {
        return Err(BacktestError::Data(format!(
          "duplicate asset '{a}' in weight vector"
        )));
      }
    }

    if renormalize(&mut values) == Normalization::UniformFallback {
      warn!(
        n_assets = assets.len(),
        "non-positive raw weight sum, falling back to uniform weights"
      );
    }

    Ok(Self { assets, values })
  }

  /// Build from `(asset, raw_weight)` pairs.
  pub fn from_pairs<I, K>(pairs: I) -> Result<Self>
  where
    I: IntoIterator<Item = (K, f64)>,
    K: Into<String>,
  {
    let (assets, values): (Vec<String>, Vec<f64>) =
      pairs.into_iter().map(|(k, v)| (k.into(), v)).unzip();
    Self::from_raw(assets, values)
  }

  /// Equal weights over `assets`.
  pub fn uniform(assets: Vec<String>) -> Result<Self> {
    let n = assets.len();
    Self::from_raw(assets, vec![1.0; n])
  }

  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  pub fn values(&self) -> &[f64] {
    &self.values
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn get(&self, asset: &str) -> Option<f64> {
    self
      .assets
      .iter()
      .position(|a| a == asset)
      .map(|i| self.values[i])
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
    self
      .assets
      .iter()
      .map(String::as_str)
      .zip(self.values.iter().copied())
  }

  /// Align to `universe`: assets absent from `self` get zero, assets outside the
  /// universe are dropped, then the result is renormalized.
  pub fn reindex(&self, universe: &[String]) -> Result<Self> {
    let lookup: HashMap<&str, f64> = self.iter().collect();
    let raw = universe
      .iter()
      .map(|a| lookup.get(a.as_str()).copied().unwrap_or(0.0))
      .collect();
    Self::from_raw(universe.to_vec(), raw)
  }
}
