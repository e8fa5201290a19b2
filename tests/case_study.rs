use std::fs;
use std::path::Path;

use chrono::Months;
use chrono::NaiveDate;
use portfolio_bl::backtest::StrategySummary;
use portfolio_bl::pipeline::run_case_study;
use portfolio_bl::report::format_summary;
use portfolio_bl::report::write_case_study;
use portfolio_bl::AppConfig;
use portfolio_bl::BacktestError;

const STRATEGIES: [&str; 3] = ["disclosed", "mean_variance", "black_litterman"];

fn write_inputs(dir: &Path) {
  let disclosures = "\
person,as_of_date,ticker,value_usd
Warren Buffett,2025-03-31,AAPL,100
Warren Buffett,2025-03-31,MSFT,80
Warren Buffett,2025-03-31,XOM,20
Nancy Pelosi,2025-03-31,AAPL,50
";
  fs::write(dir.join("disclosures.csv"), disclosures).unwrap();

  let start = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
  let mut prices = String::from("date,ticker,close\n");
  for i in 0..18 {
    let date = start + Months::new(i);
    let i = i as f64;
    prices.push_str(&format!("{date},AAPL,{}\n", 100.0 + 2.0 * i));
    prices.push_str(&format!("{date},MSFT,{}\n", 90.0 + 1.5 * i));
    prices.push_str(&format!("{date},XOM,{}\n", 70.0 + 0.8 * i));
  }
  fs::write(dir.join("prices.csv"), prices).unwrap();

  let config = format!(
    "\
data:
  disclosures_path: {}
  prices_path: {}
backtest:
  lookback_periods: 6
  rebalance_frequency: ME
  risk_aversion: 2.5
  tau: 0.05
case_studies:
  buffett:
    person_label: Warren Buffett
    disclosure_aliases: [warren buffett, buffett]
",
    dir.join("disclosures.csv").display(),
    dir.join("prices.csv").display(),
  );
  fs::write(dir.join("config.yaml"), config).unwrap();
}

#[test]
fn eighteen_month_case_study() {
  let dir = tempfile::tempdir().unwrap();
  write_inputs(dir.path());

  let config = AppConfig::load(dir.path().join("config.yaml")).unwrap();
  let result = run_case_study(&config, "buffett", None).unwrap();

  assert_eq!(result.person_label, "Warren Buffett");
  assert_eq!(result.universe, vec!["AAPL", "MSFT", "XOM"]);
  assert_eq!(result.as_of_date, NaiveDate::from_ymd_opt(2025, 3, 31).unwrap());
  assert_eq!(result.summary.periods_per_year(), 12);

  for name in STRATEGIES {
    let run = result.strategy(name).unwrap();
    assert_eq!(run.weights.n_rows(), 11, "{name}");
    // Held from the period after the first rebalance.
    assert_eq!(run.returns.len(), 10, "{name}");
    for i in 0..run.weights.n_rows() {
      let row = run.weights.row(i);
      assert!((row.sum() - 1.0).abs() < 1e-10, "{name}");
      assert!(row.iter().all(|&w| w >= 0.0), "{name}");
    }

    let summary = result.summary.get(name).unwrap();
    let entries = summary.entries();
    assert_eq!(entries.map(|(n, _)| n), StrategySummary::NAMES);
    for (metric, value) in entries {
      assert!(!value.is_nan(), "{name}.{metric} is NaN");
    }
    // Prices only go up.
    assert_eq!(summary.sortino, f64::INFINITY);
    assert_eq!(summary.max_drawdown, 0.0);
  }

  let disclosed = result.strategy("disclosed").unwrap();
  let w = disclosed.weights.row(0);
  assert!((w[0] - 0.5).abs() < 1e-12);
  assert!((w[1] - 0.4).abs() < 1e-12);
  assert!((w[2] - 0.1).abs() < 1e-12);
  assert_eq!(result.summary.get("disclosed").unwrap().avg_turnover, 0.0);
}

#[test]
fn reports_are_written() {
  let dir = tempfile::tempdir().unwrap();
  write_inputs(dir.path());
  let config = AppConfig::load(dir.path().join("config.yaml")).unwrap();
  let result = run_case_study(&config, "buffett", Some(0.9)).unwrap();

  let out = dir.path().join("out").join("buffett");
  let written = write_case_study(&result, &out).unwrap();
  assert_eq!(written.len(), 7);

  let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
  assert!(summary.starts_with(
    "strategy,annual_return,annual_volatility,sharpe,sortino,max_drawdown,hhi,avg_turnover\n"
  ));
  assert_eq!(summary.lines().count(), 4);

  let equity = fs::read_to_string(out.join("equity_curve.csv")).unwrap();
  assert!(equity.starts_with("date,disclosed,mean_variance,black_litterman\n"));
  assert_eq!(equity.lines().count(), 11);

  let weights = fs::read_to_string(out.join("weights_black_litterman.csv")).unwrap();
  assert!(weights.starts_with("rebalance_date,AAPL,MSFT,XOM\n"));

  let metadata = fs::read_to_string(out.join("metadata.csv")).unwrap();
  assert!(metadata.contains("n_assets,3"));
  assert!(metadata.contains("universe,\"AAPL,MSFT,XOM\""));

  let table = format_summary(&result.summary);
  assert!(table.contains("black_litterman"));
}

#[test]
fn unknown_person_lists_available_keys() {
  let dir = tempfile::tempdir().unwrap();
  write_inputs(dir.path());
  let config = AppConfig::load(dir.path().join("config.yaml")).unwrap();

  let err = run_case_study(&config, "pelosi", None).unwrap_err();
  assert!(matches!(err, BacktestError::InvalidConfig(_)));
  assert!(err.to_string().contains("buffett"));
}
