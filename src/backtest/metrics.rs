//! # Performance Metrics
//!
//! $$
//! R_{ann} = \Big(\prod_{t=1}^{n}(1+r_t)\Big)^{k/n} - 1,\qquad
//! \mathrm{SR} = \frac{R_{ann} - r_f}{\sigma\sqrt{k}}
//! $$
//!
//! Scalar statistics of a return path and a weight history, with `k` the number of
//! periods per year. Degenerate inputs give `NaN` (or `+inf` for a Sortino ratio
//! without downside) rather than errors.

use chrono::NaiveDate;
use ndarray::Array2;

/// Annualization factor inferred from the median spacing of `dates`.
///
/// Fewer than three dates default to monthly.
pub fn periods_per_year(dates: &[NaiveDate]) -> usize {
  if dates.len() < 3 {
    return 12;
  }

  let mut gaps: Vec<i64> = dates
    .windows(2)
    .map(|w| (w[1] - w[0]).num_days())
    .collect();
  gaps.sort_unstable();
  let mid = gaps.len() / 2;
  let median = if gaps.len() % 2 == 0 {
    (gaps[mid - 1] + gaps[mid]) as f64 / 2.0
  } else {
    gaps[mid] as f64
  };

  if median <= 2.0 {
    252
  } else if median <= 10.0 {
    52
  } else if median <= 40.0 {
    12
  } else {
    4
  }
}

fn sample_std(xs: &[f64]) -> f64 {
  if xs.len() < 2 {
    return f64::NAN;
  }
  let n = xs.len() as f64;
  let mean = xs.iter().sum::<f64>() / n;
  let ss = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>();
  (ss / (n - 1.0)).sqrt()
}

/// Geometric annualized return.
pub fn annualized_return(returns: &[f64], periods_per_year: usize) -> f64 {
  if returns.is_empty() {
    return f64::NAN;
  }
  let growth: f64 = returns.iter().map(|r| 1.0 + r).product();
  growth.powf(periods_per_year as f64 / returns.len() as f64) - 1.0
}

/// Sample standard deviation scaled by `sqrt(periods_per_year)`.
pub fn annualized_volatility(returns: &[f64], periods_per_year: usize) -> f64 {
  sample_std(returns) * (periods_per_year as f64).sqrt()
}

pub fn sharpe_ratio(returns: &[f64], periods_per_year: usize, risk_free_rate: f64) -> f64 {
  let vol = annualized_volatility(returns, periods_per_year);
  if !vol.is_finite() || vol <= 0.0 {
    return f64::NAN;
  }
  (annualized_return(returns, periods_per_year) - risk_free_rate) / vol
}

/// Excess return over annualized downside deviation.
///
/// The downside deviation is the sample standard deviation of the negative returns
/// only. No negative return gives `+inf`.
pub fn sortino_ratio(returns: &[f64], periods_per_year: usize, risk_free_rate: f64) -> f64 {
  if returns.is_empty() {
    return f64::NAN;
  }

  let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
  if downside.is_empty() {
    return f64::INFINITY;
  }

  let downside_vol = sample_std(&downside) * (periods_per_year as f64).sqrt();
  if !downside_vol.is_finite() || downside_vol <= 0.0 {
    return f64::NAN;
  }
  (annualized_return(returns, periods_per_year) - risk_free_rate) / downside_vol
}

/// Deepest peak-to-trough decline of the compounded path, as a non-positive fraction.
///
/// The running peak starts at the first compounded value.
pub fn max_drawdown(returns: &[f64]) -> f64 {
  if returns.is_empty() {
    return f64::NAN;
  }

  let mut nav = 1.0;
  let mut peak = f64::NEG_INFINITY;
  let mut worst = 0.0_f64;
  for r in returns {
    nav *= 1.0 + r;
    peak = peak.max(nav);
    worst = worst.min(nav / peak - 1.0);
  }
  worst
}

/// Mean Herfindahl index of the rows of `weights`.
///
/// Each row is rescaled by its own sum first; a zero-sum row contributes zero.
pub fn concentration_hhi(weights: &Array2<f64>) -> f64 {
  if weights.nrows() == 0 {
    return f64::NAN;
  }

  let total: f64 = weights
    .rows()
    .into_iter()
    .map(|row| {
      let s = row.sum();
      row
        .iter()
        .map(|w| {
          let x = w / s;
          if x.is_nan() {
            0.0
          } else {
            x * x
          }
        })
        .sum::<f64>()
    })
    .sum();
  total / weights.nrows() as f64
}

/// Mean one-way turnover `0.5 * sum |w_t - w_{t-1}|` between consecutive rows.
pub fn average_turnover(weights: &Array2<f64>) -> f64 {
  let n = weights.nrows();
  if n <= 1 {
    return 0.0;
  }

  let total: f64 = (1..n)
    .map(|t| {
      let prev = weights.row(t - 1);
      let cur = weights.row(t);
      0.5 * cur.iter().zip(prev.iter()).map(|(a, b)| (a - b).abs()).sum::<f64>()
    })
    .sum();
  total / (n - 1) as f64
}

/// The seven headline statistics of one strategy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrategySummary {
  pub annual_return: f64,
  pub annual_volatility: f64,
  pub sharpe: f64,
  pub sortino: f64,
  pub max_drawdown: f64,
  pub hhi: f64,
  pub avg_turnover: f64,
}

impl StrategySummary {
  /// Column names in report order.
  pub const NAMES: [&'static str; 7] = [
    "annual_return",
    "annual_volatility",
    "sharpe",
    "sortino",
    "max_drawdown",
    "hhi",
    "avg_turnover",
  ];

  /// `(name, value)` pairs in [`Self::NAMES`] order.
  pub fn entries(&self) -> [(&'static str, f64); 7] {
    let values = [
      self.annual_return,
      self.annual_volatility,
      self.sharpe,
      self.sortino,
      self.max_drawdown,
      self.hhi,
      self.avg_turnover,
    ];
    let mut out = [("", 0.0); 7];
    for (i, v) in values.into_iter().enumerate() {
      out[i] = (Self::NAMES[i], v);
    }
    out
  }
}

/// All metrics of one strategy with a zero risk-free rate.
pub fn summarize(returns: &[f64], weights: &Array2<f64>, periods_per_year: usize) -> StrategySummary {
  StrategySummary {
    annual_return: annualized_return(returns, periods_per_year),
    annual_volatility: annualized_volatility(returns, periods_per_year),
    sharpe: sharpe_ratio(returns, periods_per_year, 0.0),
    sortino: sortino_ratio(returns, periods_per_year, 0.0),
    max_drawdown: max_drawdown(returns),
    hhi: concentration_hhi(weights),
    avg_turnover: average_turnover(weights),
  }
}
