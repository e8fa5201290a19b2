//! # Weight Strategies
//!
//! $$
//! \mathbf{w}_{t} = f\!\left(R_{t-L:t}\right)
//! $$
//!
//! Rules that turn a trailing window of returns into portfolio weights. The engine
//! only ever shows a strategy the rows strictly before the rebalance date.

use std::fmt::Display;

use chrono::NaiveDate;
use impl_new_derive::ImplNew;

use crate::error::Result;
use crate::frame::ReturnMatrix;
use crate::models::black_litterman::identity_view_posterior;
use crate::models::estimation::estimate_mean_cov;
use crate::models::estimation::DEFAULT_MIN_OBSERVATIONS;
use crate::models::mean_variance::long_only_weights;
use crate::models::mean_variance::DEFAULT_RIDGE;
use crate::weights::WeightVector;

/// Weight function called once per rebalance date.
pub trait WeightStrategy: Send + Sync {
  /// Stable identifier used in reports and log spans.
  fn name(&self) -> &str;

  /// Target weights given the training `window` preceding `date`.
  fn weights(&self, window: &ReturnMatrix, date: NaiveDate) -> Result<WeightVector>;
}

/// Fixed weights, ignoring the window. Used for the disclosed benchmark.
#[derive(Clone, Debug)]
pub struct ConstantWeights {
  name: String,
  weights: WeightVector,
}

impl ConstantWeights {
  pub fn new(name: impl Into<String>, weights: WeightVector) -> Self {
    Self {
      name: name.into(),
      weights,
    }
  }
}

impl WeightStrategy for ConstantWeights {
  fn name(&self) -> &str {
    &self.name
  }

  fn weights(&self, _window: &ReturnMatrix, _date: NaiveDate) -> Result<WeightVector> {
    Ok(self.weights.clone())
  }
}

/// Long-only Markowitz on the sample moments of the window.
#[derive(ImplNew, Clone, Copy, Debug, PartialEq)]
pub struct MeanVarianceStrategy {
  pub min_observations: usize,
  pub ridge: f64,
}

impl Default for MeanVarianceStrategy {
  fn default() -> Self {
    Self {
      min_observations: DEFAULT_MIN_OBSERVATIONS,
      ridge: DEFAULT_RIDGE,
    }
  }
}

impl WeightStrategy for MeanVarianceStrategy {
  fn name(&self) -> &str {
    "mean_variance"
  }

  fn weights(&self, window: &ReturnMatrix, _date: NaiveDate) -> Result<WeightVector> {
    let estimate = estimate_mean_cov(window, self.min_observations)?;
    long_only_weights(&estimate, self.ridge)
  }
}

/// Black-Litterman posterior fed into long-only Markowitz.
///
/// Views are absolute, one per asset, equal to the window's sample mean.
#[derive(ImplNew, Clone, Debug)]
pub struct BlackLittermanStrategy {
  pub market_weights: WeightVector,
  pub risk_aversion: f64,
  pub tau: f64,
  pub view_confidence: f64,
  pub ridge: f64,
  pub min_observations: usize,
}

impl WeightStrategy for BlackLittermanStrategy {
  fn name(&self) -> &str {
    "black_litterman"
  }

  fn weights(&self, window: &ReturnMatrix, _date: NaiveDate) -> Result<WeightVector> {
    let prior = estimate_mean_cov(window, self.min_observations)?;
    let post = identity_view_posterior(
      &prior,
      &self.market_weights,
      self.risk_aversion,
      self.tau,
      self.view_confidence,
      self.ridge,
    )?;
    long_only_weights(&post, self.ridge)
  }
}

/// Closed set of strategies compared by a case study.
#[derive(Clone, Debug)]
pub enum Strategy {
  Disclosed(ConstantWeights),
  MeanVariance(MeanVarianceStrategy),
  BlackLitterman(BlackLittermanStrategy),
}

impl WeightStrategy for Strategy {
  fn name(&self) -> &str {
    match self {
      Strategy::Disclosed(s) => s.name(),
      Strategy::MeanVariance(s) => s.name(),
      Strategy::BlackLitterman(s) => s.name(),
    }
  }

  fn weights(&self, window: &ReturnMatrix, date: NaiveDate) -> Result<WeightVector> {
    match self {
      Strategy::Disclosed(s) => s.weights(window, date),
      Strategy::MeanVariance(s) => s.weights(window, date),
      Strategy::BlackLitterman(s) => s.weights(window, date),
    }
  }
}

impl Display for Strategy {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.name())
  }
}
