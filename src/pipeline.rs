//! # Case Study
//!
//! Compares the disclosed portfolio of one person against mean-variance and
//! Black-Litterman portfolios built on the same universe, rebalanced on the same
//! calendar.

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::info;

use crate::backtest::engine::rolling_backtest;
use crate::backtest::engine::BacktestResult;
use crate::backtest::metrics::periods_per_year;
use crate::backtest::metrics::StrategySummary;
use crate::backtest::schedule::rebalance_dates;
use crate::config::validate_view_confidence;
use crate::config::AppConfig;
use crate::config::BacktestSettings;
use crate::data::disclosures::latest_portfolio_for_aliases;
use crate::data::disclosures::load_disclosures_csv;
use crate::data::disclosures::DisclosedPortfolio;
use crate::data::prices::load_prices_csv;
use crate::data::prices::to_return_matrix;
use crate::error::BacktestError;
use crate::error::Result;
use crate::frame::ReturnMatrix;
use crate::models::estimation::DEFAULT_MIN_OBSERVATIONS;
use crate::models::mean_variance::DEFAULT_RIDGE;
use crate::strategy::BlackLittermanStrategy;
use crate::strategy::ConstantWeights;
use crate::strategy::MeanVarianceStrategy;
use crate::strategy::Strategy;
use crate::strategy::WeightStrategy;
use crate::weights::WeightVector;

/// Starting value of every simulated portfolio.
pub const INITIAL_NAV: f64 = 1.0;

/// Per-strategy metrics, in strategy order.
#[derive(Clone, Debug, PartialEq)]
pub struct SummaryTable {
  periods_per_year: usize,
  rows: Vec<(String, StrategySummary)>,
}

impl SummaryTable {
  pub fn new(periods_per_year: usize, rows: Vec<(String, StrategySummary)>) -> Self {
    Self {
      periods_per_year,
      rows,
    }
  }

  pub fn periods_per_year(&self) -> usize {
    self.periods_per_year
  }

  pub fn get(&self, strategy: &str) -> Option<&StrategySummary> {
    self
      .rows
      .iter()
      .find(|(name, _)| name == strategy)
      .map(|(_, s)| s)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &StrategySummary)> + '_ {
    self.rows.iter().map(|(name, s)| (name.as_str(), s))
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }
}

/// Everything produced by one case study run.
#[derive(Clone, Debug)]
pub struct CaseStudyResult {
  pub person_label: String,
  pub as_of_date: NaiveDate,
  pub universe: Vec<String>,
  /// Backtests keyed by strategy name, in run order.
  pub strategy_results: Vec<(String, BacktestResult)>,
  pub summary: SummaryTable,
}

impl CaseStudyResult {
  pub fn strategy(&self, name: &str) -> Option<&BacktestResult> {
    self
      .strategy_results
      .iter()
      .find(|(n, _)| n == name)
      .map(|(_, r)| r)
  }
}

/// The three compared strategies: disclosed, mean-variance, Black-Litterman.
pub fn build_strategies(
  market_weights: &WeightVector,
  settings: &BacktestSettings,
  view_confidence: f64,
) -> Vec<Strategy> {
  vec![
    Strategy::Disclosed(ConstantWeights::new("disclosed", market_weights.clone())),
    Strategy::MeanVariance(MeanVarianceStrategy::new(
      DEFAULT_MIN_OBSERVATIONS,
      DEFAULT_RIDGE,
    )),
    Strategy::BlackLitterman(BlackLittermanStrategy::new(
      market_weights.clone(),
      settings.risk_aversion,
      settings.tau,
      view_confidence,
      DEFAULT_RIDGE,
      DEFAULT_MIN_OBSERVATIONS,
    )),
  ]
}

/// Run the case study `person_key` of `config`, loading data from disk.
///
/// `view_confidence` overrides the configured confidence of the case study.
pub fn run_case_study(
  config: &AppConfig,
  person_key: &str,
  view_confidence: Option<f64>,
) -> Result<CaseStudyResult> {
  let case = config.case_study(person_key)?;
  let view_confidence = view_confidence.unwrap_or(case.view_confidence);

  let disclosures = load_disclosures_csv(&config.disclosures_path)?;
  let disclosed = latest_portfolio_for_aliases(&disclosures, &case.disclosure_aliases)?;
  let prices = load_prices_csv(&config.prices_path)?;
  let returns = to_return_matrix(&prices)?;

  run_case_study_with_data(
    &case.person_label,
    &disclosed,
    &returns,
    &config.backtest,
    view_confidence,
  )
}

/// Run a case study on in-memory inputs.
///
/// The universe is the sorted intersection of disclosed tickers and return columns
/// and must hold at least two assets.
pub fn run_case_study_with_data(
  person_label: &str,
  disclosed: &DisclosedPortfolio,
  returns: &ReturnMatrix,
  settings: &BacktestSettings,
  view_confidence: f64,
) -> Result<CaseStudyResult> {
  settings.validate()?;
  validate_view_confidence(view_confidence)?;

  let mut universe: Vec<String> = disclosed
    .tickers()
    .filter(|t| returns.asset_index(t).is_some())
    .map(str::to_string)
    .collect();
  universe.sort_unstable();
  universe.dedup();
  if universe.len() < 2 {
    return Err(BacktestError::insufficient_data(format!(
      "universe intersection has fewer than 2 assets ({})",
      universe.len()
    )));
  }

  let returns = returns.select_assets(&universe)?;
  let market_weights = disclosed.weights()?.reindex(&universe)?;
  let schedule = rebalance_dates(returns.dates(), settings.rebalance_frequency);

  info!(
    person = person_label,
    assets = universe.len(),
    periods = returns.n_periods(),
    rebalances = schedule.len(),
    "running case study"
  );

  let strategies = build_strategies(&market_weights, settings, view_confidence);
  let strategy_results = strategies
    .par_iter()
    .map(|s| {
      rolling_backtest(
        &returns,
        &schedule,
        settings.lookback_periods,
        s,
        INITIAL_NAV,
      )
      .map(|r| (s.name().to_string(), r))
    })
    .collect::<Result<Vec<_>>>()?;

  let ppy = periods_per_year(returns.dates());
  let summary = SummaryTable::new(
    ppy,
    strategy_results
      .iter()
      .map(|(name, r)| (name.clone(), r.summary(ppy)))
      .collect(),
  );

  Ok(CaseStudyResult {
    person_label: person_label.to_string(),
    as_of_date: disclosed.as_of_date,
    universe,
    strategy_results,
    summary,
  })
}
