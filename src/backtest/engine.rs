//! # Rolling Backtest
//!
//! $$
//! r^p_t = \sum_i w_{\tau(t),i}\,R_{t,i},\qquad
//! \mathrm{NAV}_t = \mathrm{NAV}_{t-1}\,(1 + r^p_t)
//! $$
//!
//! Walk-forward simulation over a return matrix. Weights chosen at a rebalance date
//! `tau` use only the rows strictly before `tau` and are first applied to the period
//! after `tau`.

use chrono::NaiveDate;
use ndarray::ArrayView1;
use tracing::debug;
use tracing::info;
use tracing::info_span;

use super::metrics::summarize;
use super::metrics::StrategySummary;
use crate::error::BacktestError;
use crate::error::Result;
use crate::frame::ReturnMatrix;
use crate::frame::Series;
use crate::frame::WeightHistory;
use crate::strategy::WeightStrategy;
use crate::weights::WeightVector;

/// Output of [`rolling_backtest`].
#[derive(Clone, Debug, PartialEq)]
pub struct BacktestResult {
  /// Portfolio return per held period.
  pub returns: Series,
  /// Net asset value after each held period.
  pub nav: Series,
  /// Weights decided at each rebalance date.
  pub weights: WeightHistory,
}

impl BacktestResult {
  pub fn summary(&self, periods_per_year: usize) -> StrategySummary {
    summarize(self.returns.values(), self.weights.values(), periods_per_year)
  }
}

fn portfolio_return(weights: &WeightVector, row: ArrayView1<'_, f64>) -> f64 {
  weights
    .values()
    .iter()
    .zip(row.iter())
    .map(|(w, r)| if r.is_nan() { 0.0 } else { w * r })
    .sum()
}

/// Rebalance positions that have `lookback_periods` rows before them.
fn eligible_positions(
  returns: &ReturnMatrix,
  rebalance_dates: &[NaiveDate],
  lookback_periods: usize,
) -> Result<Vec<usize>> {
  let mut dates = rebalance_dates.to_vec();
  dates.sort_unstable();
  dates.dedup();

  let positions: Vec<usize> = dates.iter().filter_map(|&d| returns.position(d)).collect();
  if positions.is_empty() {
    return Err(BacktestError::insufficient_data(
      "no rebalance dates intersect with return index",
    ));
  }

  let eligible: Vec<usize> = positions
    .into_iter()
    .filter(|&p| p >= lookback_periods)
    .collect();
  if eligible.is_empty() {
    return Err(BacktestError::insufficient_data(
      "no rebalance date has enough lookback observations",
    ));
  }
  Ok(eligible)
}

/// Simulate `strategy` over `returns`, rebalancing on `rebalance_dates`.
///
/// Rebalance dates outside the return index, and those with fewer than
/// `lookback_periods` rows before them, are ignored. Each weight vector is
/// reindexed onto the full universe and held through the next rebalance date
/// inclusive, or to the end of the series for the last one. Missing returns
/// count as zero. Strategy errors abort the run.
pub fn rolling_backtest<S: WeightStrategy + ?Sized>(
  returns: &ReturnMatrix,
  rebalance_dates: &[NaiveDate],
  lookback_periods: usize,
  strategy: &S,
  initial_nav: f64,
) -> Result<BacktestResult> {
  if returns.is_empty() {
    return Err(BacktestError::insufficient_data("return matrix is empty"));
  }
  if lookback_periods == 0 {
    return Err(BacktestError::invalid_config(
      "lookback_periods must be positive",
    ));
  }

  let eligible = eligible_positions(returns, rebalance_dates, lookback_periods)?;
  let universe = returns.assets();
  let n_periods = returns.n_periods();

  info!(
    strategy = strategy.name(),
    rebalances = eligible.len(),
    lookback_periods,
    "starting rolling backtest"
  );

  let mut weight_rows = Vec::with_capacity(eligible.len());
  let mut out_dates = Vec::with_capacity(n_periods);
  let mut out_returns = Vec::with_capacity(n_periods);
  let mut out_nav = Vec::with_capacity(n_periods);
  let mut nav = initial_nav;

  for (i, &pos) in eligible.iter().enumerate() {
    let date = returns.dates()[pos];
    let span = info_span!("rebalance", %date, strategy = strategy.name());
    let _guard = span.enter();

    let window = returns.slice_rows(pos - lookback_periods..pos);
    let weights = strategy.weights(&window, date)?.reindex(universe)?;
    debug!(?weights, "rebalanced");

    let end = eligible.get(i + 1).map_or(n_periods, |&next| next + 1);
    for t in pos + 1..end {
      let r = portfolio_return(&weights, returns.row(t));
      nav *= 1.0 + r;
      out_dates.push(returns.dates()[t]);
      out_returns.push(r);
      out_nav.push(nav);
    }

    weight_rows.push((date, weights));
  }

  info!(
    strategy = strategy.name(),
    periods = out_returns.len(),
    final_nav = nav,
    "finished rolling backtest"
  );

  Ok(BacktestResult {
    returns: Series::new(out_dates.clone(), out_returns)?,
    nav: Series::new(out_dates, out_nav)?,
    weights: WeightHistory::from_rows(universe.to_vec(), &weight_rows)?,
  })
}
