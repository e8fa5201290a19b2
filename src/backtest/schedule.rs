//! # Rebalance Schedule
//!
//! Calendar buckets over an observed date index. A rebalance date is the last
//! observed date of its bucket, so schedules never contain dates the return matrix
//! does not have.

use std::fmt::Display;
use std::str::FromStr;

use chrono::Datelike;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::BacktestError;

/// Rebalance cadence, parsed from calendar offset aliases such as `ME` or `W-SUN`.
#[derive(Default, Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(try_from = "String")]
pub enum RebalanceFrequency {
  /// `D`
  Daily,
  /// `W`, `W-SUN`: weeks ending Sunday.
  Weekly,
  /// `ME`, `M`
  #[default]
  MonthEnd,
  /// `QE`, `Q`
  QuarterEnd,
  /// `YE`, `Y`, `A`
  YearEnd,
}

impl RebalanceFrequency {
  fn bucket(&self, date: NaiveDate) -> (i32, u32) {
    match self {
      Self::Daily => (date.year(), date.ordinal()),
      Self::Weekly => {
        let week = date.iso_week();
        (week.year(), week.week())
      }
      Self::MonthEnd => (date.year(), date.month()),
      Self::QuarterEnd => (date.year(), (date.month() - 1) / 3),
      Self::YearEnd => (date.year(), 0),
    }
  }
}

impl FromStr for RebalanceFrequency {
  type Err = BacktestError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_uppercase().as_str() {
      "D" => Ok(Self::Daily),
      "W" | "W-SUN" => Ok(Self::Weekly),
      "ME" | "M" => Ok(Self::MonthEnd),
      "QE" | "Q" => Ok(Self::QuarterEnd),
      "YE" | "Y" | "A" => Ok(Self::YearEnd),
      other => Err(BacktestError::invalid_config(format!(
        "unknown rebalance frequency '{other}'"
      ))),
    }
  }
}

impl TryFrom<String> for RebalanceFrequency {
  type Error = BacktestError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl Display for RebalanceFrequency {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Daily => write!(f, "D"),
      Self::Weekly => write!(f, "W-SUN"),
      Self::MonthEnd => write!(f, "ME"),
      Self::QuarterEnd => write!(f, "QE"),
      Self::YearEnd => write!(f, "YE"),
    }
  }
}

/// Last observed date of every calendar bucket, ascending.
pub fn rebalance_dates(dates: &[NaiveDate], frequency: RebalanceFrequency) -> Vec<NaiveDate> {
  let mut sorted = dates.to_vec();
  sorted.sort_unstable();
  sorted.dedup();

  let mut out = Vec::new();
  for (i, &d) in sorted.iter().enumerate() {
    let last_in_bucket = match sorted.get(i + 1) {
      Some(&next) => frequency.bucket(next) != frequency.bucket(d),
      None => true,
    };
    if last_in_bucket {
      out.push(d);
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use chrono::Days;

  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  #[test]
  fn parses_aliases() {
    assert_eq!("ME".parse::<RebalanceFrequency>().unwrap(), RebalanceFrequency::MonthEnd);
    assert_eq!("m".parse::<RebalanceFrequency>().unwrap(), RebalanceFrequency::MonthEnd);
    assert_eq!("W-SUN".parse::<RebalanceFrequency>().unwrap(), RebalanceFrequency::Weekly);
    assert_eq!("Q".parse::<RebalanceFrequency>().unwrap(), RebalanceFrequency::QuarterEnd);
    assert_eq!("A".parse::<RebalanceFrequency>().unwrap(), RebalanceFrequency::YearEnd);
    assert!(matches!(
      "fortnight".parse::<RebalanceFrequency>(),
      Err(BacktestError::InvalidConfig(_))
    ));
    assert_eq!(RebalanceFrequency::QuarterEnd.to_string(), "QE");
  }

  #[test]
  fn month_end_picks_last_observed_day() {
    let dates = vec![
      d(2024, 1, 30),
      d(2024, 1, 31),
      d(2024, 2, 27),
      d(2024, 2, 28),
      d(2024, 3, 1),
    ];
    assert_eq!(
      rebalance_dates(&dates, RebalanceFrequency::MonthEnd),
      vec![d(2024, 1, 31), d(2024, 2, 28), d(2024, 3, 1)]
    );
  }

  #[test]
  fn weekly_buckets_end_on_sunday() {
    // 2024-01-01 is a Monday.
    let dates: Vec<NaiveDate> = (0..14).map(|i| d(2024, 1, 1) + Days::new(i)).collect();
    assert_eq!(
      rebalance_dates(&dates, RebalanceFrequency::Weekly),
      vec![d(2024, 1, 7), d(2024, 1, 14)]
    );
  }

  #[test]
  fn quarter_and_year_buckets() {
    let dates = vec![d(2023, 2, 28), d(2023, 3, 31), d(2023, 4, 30), d(2024, 1, 31)];
    assert_eq!(
      rebalance_dates(&dates, RebalanceFrequency::QuarterEnd),
      vec![d(2023, 3, 31), d(2023, 4, 30), d(2024, 1, 31)]
    );
    assert_eq!(
      rebalance_dates(&dates, RebalanceFrequency::YearEnd),
      vec![d(2023, 4, 30), d(2024, 1, 31)]
    );
    assert_eq!(rebalance_dates(&dates, RebalanceFrequency::Daily).len(), 4);
    assert!(rebalance_dates(&[], RebalanceFrequency::Daily).is_empty());
  }
}
