//! # Reports
//!
//! CSV outputs of a case study and a console rendering of its summary table.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use chrono::NaiveDate;
use csv::Writer;
use prettytable::format;
use prettytable::Cell;
use prettytable::Row;
use prettytable::Table;
use tracing::info;

use crate::backtest::metrics::StrategySummary;
use crate::error::Result;
use crate::frame::Series;
use crate::frame::WeightHistory;
use crate::pipeline::CaseStudyResult;
use crate::pipeline::SummaryTable;

const DATE_FORMAT: &str = "%Y-%m-%d";
const PERCENT_METRICS: [&str; 4] = [
  "annual_return",
  "annual_volatility",
  "max_drawdown",
  "avg_turnover",
];

/// Raw CSV cell; `NaN` is left empty.
fn csv_value(v: f64) -> String {
  if v.is_nan() {
    String::new()
  } else {
    v.to_string()
  }
}

/// Display cell: percentages with two decimals, ratios with three.
fn display_value(metric: &str, v: f64) -> String {
  if v.is_nan() {
    "nan".to_string()
  } else if PERCENT_METRICS.contains(&metric) {
    format!("{:.2}%", v * 100.0)
  } else {
    format!("{v:.3}")
  }
}

fn write_summary(summary: &SummaryTable, path: &Path) -> Result<()> {
  let mut wtr = Writer::from_path(path)?;
  let mut header = vec!["strategy"];
  header.extend(StrategySummary::NAMES);
  wtr.write_record(&header)?;

  for (name, s) in summary.iter() {
    let mut record = vec![name.to_string()];
    record.extend(s.entries().iter().map(|(_, v)| csv_value(*v)));
    wtr.write_record(&record)?;
  }
  wtr.flush()?;
  Ok(())
}

/// Outer join of several series on their dates.
fn write_aligned(columns: &[(&str, &Series)], path: &Path) -> Result<()> {
  let dates: BTreeSet<NaiveDate> = columns
    .iter()
    .flat_map(|(_, s)| s.dates().iter().copied())
    .collect();

  let mut wtr = Writer::from_path(path)?;
  let mut header = vec!["date"];
  header.extend(columns.iter().map(|(name, _)| *name));
  wtr.write_record(&header)?;

  for date in dates {
    let mut record = vec![date.format(DATE_FORMAT).to_string()];
    record.extend(
      columns
        .iter()
        .map(|(_, s)| s.get(date).map(csv_value).unwrap_or_default()),
    );
    wtr.write_record(&record)?;
  }
  wtr.flush()?;
  Ok(())
}

fn write_weights(weights: &WeightHistory, path: &Path) -> Result<()> {
  let mut wtr = Writer::from_path(path)?;
  let mut header = vec!["rebalance_date"];
  header.extend(weights.assets().iter().map(String::as_str));
  wtr.write_record(&header)?;

  for (i, date) in weights.dates().iter().enumerate() {
    let mut record = vec![date.format(DATE_FORMAT).to_string()];
    record.extend(weights.row(i).iter().map(|v| csv_value(*v)));
    wtr.write_record(&record)?;
  }
  wtr.flush()?;
  Ok(())
}

fn write_metadata(result: &CaseStudyResult, path: &Path) -> Result<()> {
  let mut wtr = Writer::from_path(path)?;
  wtr.write_record(["key", "value"])?;
  wtr.write_record(["person_label", result.person_label.as_str()])?;
  wtr.write_record([
    "as_of_date".to_string(),
    result.as_of_date.format(DATE_FORMAT).to_string(),
  ])?;
  wtr.write_record(["n_assets".to_string(), result.universe.len().to_string()])?;
  wtr.write_record(["universe".to_string(), result.universe.join(",")])?;
  wtr.flush()?;
  Ok(())
}

/// Write every report of `result` into `dir`, creating it if needed.
///
/// Returns the written paths.
pub fn write_case_study(result: &CaseStudyResult, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
  let dir = dir.as_ref();
  fs::create_dir_all(dir)?;
  let mut written = Vec::new();

  let path = dir.join("summary.csv");
  write_summary(&result.summary, &path)?;
  written.push(path);

  let navs: Vec<(&str, &Series)> = result
    .strategy_results
    .iter()
    .map(|(name, r)| (name.as_str(), &r.nav))
    .collect();
  let path = dir.join("equity_curve.csv");
  write_aligned(&navs, &path)?;
  written.push(path);

  let returns: Vec<(&str, &Series)> = result
    .strategy_results
    .iter()
    .map(|(name, r)| (name.as_str(), &r.returns))
    .collect();
  let path = dir.join("strategy_returns.csv");
  write_aligned(&returns, &path)?;
  written.push(path);

  for (name, r) in &result.strategy_results {
    let path = dir.join(format!("weights_{name}.csv"));
    write_weights(&r.weights, &path)?;
    written.push(path);
  }

  let path = dir.join("metadata.csv");
  write_metadata(result, &path)?;
  written.push(path);

  info!(dir = %dir.display(), files = written.len(), "wrote case study reports");
  Ok(written)
}

/// Render the summary as a console table.
pub fn format_summary(summary: &SummaryTable) -> String {
  let mut table = Table::new();
  table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);

  let mut titles = vec![Cell::new("strategy")];
  titles.extend(StrategySummary::NAMES.iter().map(|n| Cell::new(n)));
  table.set_titles(Row::new(titles));

  for (name, s) in summary.iter() {
    let mut cells = vec![Cell::new(name)];
    cells.extend(
      s.entries()
        .iter()
        .map(|(metric, v)| Cell::new(&display_value(metric, *v))),
    );
    table.add_row(Row::new(cells));
  }

  table.to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_formats() {
    assert_eq!(display_value("annual_return", 0.1234), "12.34%");
    assert_eq!(display_value("max_drawdown", -0.05), "-5.00%");
    assert_eq!(display_value("sharpe", 1.23456), "1.235");
    assert_eq!(display_value("sortino", f64::INFINITY), "inf");
    assert_eq!(display_value("hhi", f64::NAN), "nan");
    assert_eq!(csv_value(f64::NAN), "");
    assert_eq!(csv_value(0.5), "0.5");
  }

  #[test]
  fn summary_table_lists_every_strategy() {
    let s = StrategySummary {
      annual_return: 0.1,
      annual_volatility: 0.2,
      sharpe: 0.5,
      sortino: f64::INFINITY,
      max_drawdown: -0.1,
      hhi: 0.4,
      avg_turnover: f64::NAN,
    };
    let table = SummaryTable::new(12, vec![("disclosed".into(), s), ("mean_variance".into(), s)]);
    let text = format_summary(&table);

    assert!(text.contains("annual_volatility"));
    assert!(text.contains("disclosed"));
    assert!(text.contains("mean_variance"));
    assert!(text.contains("10.00%"));
    assert!(text.contains("0.500"));
    assert!(text.contains("nan"));
  }

  #[test]
  fn aligned_series_outer_join() {
    let d = |m: u32| NaiveDate::from_ymd_opt(2024, m, 1).unwrap();
    let a = Series::new(vec![d(1), d(2)], vec![1.0, 2.0]).unwrap();
    let b = Series::new(vec![d(2), d(3)], vec![3.0, 4.0]).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("x.csv");

    write_aligned(&[("a", &a), ("b", &b)], &path).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(
      text,
      "date,a,b\n2024-01-01,1,\n2024-02-01,2,3\n2024-03-01,,4\n"
    );
  }
}
