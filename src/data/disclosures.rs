//! # Disclosures
//!
//! $$
//! w_i = \frac{V_i}{\sum_j V_j}
//! $$
//!
//! Publicly disclosed holdings and the latest disclosed portfolio of a person.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::io;
use std::path::Path;

use chrono::NaiveDate;
use csv::ReaderBuilder;
use tracing::debug;
use tracing::info;

use super::column_indices;
use super::parse_date;
use super::parse_number;
use crate::error::BacktestError;
use crate::error::Result;
use crate::weights::WeightVector;

/// One disclosed position.
#[derive(Clone, Debug, PartialEq)]
pub struct DisclosureRecord {
  /// Trimmed, lowercased name of the discloser.
  pub person: String,
  pub as_of_date: NaiveDate,
  pub ticker: String,
  pub value_usd: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Holding {
  pub ticker: String,
  pub value_usd: f64,
  pub weight: f64,
}

/// Holdings of the latest disclosure date, sorted by ticker.
#[derive(Clone, Debug, PartialEq)]
pub struct DisclosedPortfolio {
  pub as_of_date: NaiveDate,
  pub holdings: Vec<Holding>,
}

impl DisclosedPortfolio {
  pub fn tickers(&self) -> impl Iterator<Item = &str> + '_ {
    self.holdings.iter().map(|h| h.ticker.as_str())
  }

  pub fn weights(&self) -> Result<WeightVector> {
    WeightVector::from_pairs(self.holdings.iter().map(|h| (h.ticker.clone(), h.weight)))
  }
}

/// Load `person,as_of_date,ticker,value_usd` rows from a CSV file.
pub fn load_disclosures_csv(path: impl AsRef<Path>) -> Result<Vec<DisclosureRecord>> {
  let path = path.as_ref();
  let file = std::fs::File::open(path)?;
  let records = read_disclosures(file)?;
  info!(path = %path.display(), rows = records.len(), "loaded disclosures");
  Ok(records)
}

/// Parse disclosure rows from any reader.
///
/// Rows with an empty person or ticker, an unparseable date or value, or a
/// non-positive value are dropped. The output is sorted by date, person and ticker.
pub fn read_disclosures<R: io::Read>(reader: R) -> Result<Vec<DisclosureRecord>> {
  let mut reader = ReaderBuilder::new().flexible(true).from_reader(reader);
  let [person_col, date_col, ticker_col, value_col] = column_indices(
    reader.headers()?,
    ["person", "as_of_date", "ticker", "value_usd"],
    "disclosure",
  )?;

  let mut out = Vec::new();
  let mut skipped = 0usize;
  for record in reader.records() {
    let record = record?;
    let person = record.get(person_col).map(|p| p.trim().to_lowercase());
    let date = record.get(date_col).and_then(parse_date);
    let ticker = record.get(ticker_col).map(|t| t.trim().to_uppercase());
    let value = record.get(value_col).and_then(parse_number);

    match (person, date, ticker, value) {
      (Some(person), Some(as_of_date), Some(ticker), Some(value_usd))
        if !person.is_empty() && !ticker.is_empty() && value_usd > 0.0 =>
      {
        out.push(DisclosureRecord {
          person,
          as_of_date,
          ticker,
          value_usd,
        });
      }
      _ => skipped += 1,
    }
  }

  if skipped > 0 {
    debug!(skipped, "dropped invalid disclosure rows");
  }
  if out.is_empty() {
    return Err(BacktestError::insufficient_data(
      "disclosure dataset is empty after cleaning",
    ));
  }

  out.sort_by(|a, b| {
    a.as_of_date
      .cmp(&b.as_of_date)
      .then_with(|| a.person.cmp(&b.person))
      .then_with(|| a.ticker.cmp(&b.ticker))
  });
  Ok(out)
}

/// Latest disclosed portfolio of anyone matching `aliases`.
///
/// Aliases are compared trimmed and lowercased. Repeated tickers on the latest date
/// are summed.
pub fn latest_portfolio_for_aliases<S: AsRef<str>>(
  disclosures: &[DisclosureRecord],
  aliases: &[S],
) -> Result<DisclosedPortfolio> {
  let alias_set: BTreeSet<String> = aliases
    .iter()
    .map(|a| a.as_ref().trim().to_lowercase())
    .collect();
  let matching: Vec<&DisclosureRecord> = disclosures
    .iter()
    .filter(|r| alias_set.contains(&r.person))
    .collect();

  let Some(as_of_date) = matching.iter().map(|r| r.as_of_date).max() else {
    let names: Vec<&str> = alias_set.iter().map(String::as_str).collect();
    return Err(BacktestError::Data(format!(
      "no disclosure rows found for aliases: {}",
      names.join(", ")
    )));
  };

  let mut values: BTreeMap<&str, f64> = BTreeMap::new();
  for r in matching.iter().filter(|r| r.as_of_date == as_of_date) {
    *values.entry(r.ticker.as_str()).or_insert(0.0) += r.value_usd;
  }
  let total: f64 = values.values().sum();

  let holdings = values
    .into_iter()
    .map(|(ticker, value_usd)| Holding {
      ticker: ticker.to_string(),
      value_usd,
      weight: value_usd / total,
    })
    .collect();

  Ok(DisclosedPortfolio {
    as_of_date,
    holdings,
  })
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use approx::assert_abs_diff_eq;

  use super::*;

  const CSV: &str = "\
person,as_of_date,ticker,value_usd
Warren Buffett,2024-12-31,aapl,50
Warren Buffett,2025-03-31,AAPL,100
 warren buffett ,2025-03-31,MSFT,80
BUFFETT,2025-03-31,XOM,20
Warren Buffett,2025-03-31,KO,-1
Nancy Pelosi,2025-03-31,AAPL,50
Nancy Pelosi,,NVDA,10
";

  #[test]
  fn read_disclosures_normalizes_names() {
    let rows = read_disclosures(CSV.as_bytes()).unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0].ticker, "AAPL");
    assert_eq!(rows[0].person, "warren buffett");
    assert!(rows.iter().all(|r| r.value_usd > 0.0));
    assert_eq!(rows[1].person, "buffett");
    assert_eq!(rows[2].person, "nancy pelosi");
  }

  #[test]
  fn latest_portfolio_uses_latest_date_and_all_aliases() {
    let rows = read_disclosures(CSV.as_bytes()).unwrap();
    let p = latest_portfolio_for_aliases(&rows, &["Warren Buffett", " buffett"]).unwrap();

    assert_eq!(p.as_of_date, NaiveDate::from_ymd_opt(2025, 3, 31).unwrap());
    assert_eq!(p.tickers().collect::<Vec<_>>(), vec!["AAPL", "MSFT", "XOM"]);
    assert_abs_diff_eq!(p.holdings[0].weight, 0.5, epsilon = 1e-15);
    assert_abs_diff_eq!(p.holdings[1].weight, 0.4, epsilon = 1e-15);
    assert_abs_diff_eq!(p.holdings[2].weight, 0.1, epsilon = 1e-15);
    assert_abs_diff_eq!(p.weights().unwrap().values().iter().sum::<f64>(), 1.0, epsilon = 1e-12);
  }

  #[test]
  fn repeated_tickers_are_summed() {
    let d = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
    let rec = |ticker: &str, value_usd: f64| DisclosureRecord {
      person: "a".into(),
      as_of_date: d,
      ticker: ticker.into(),
      value_usd,
    };
    let p = latest_portfolio_for_aliases(&[rec("X", 1.0), rec("Y", 2.0), rec("X", 1.0)], &["A"])
      .unwrap();
    assert_eq!(p.holdings.len(), 2);
    assert_abs_diff_eq!(p.holdings[0].weight, 0.5, epsilon = 1e-15);
  }

  #[test]
  fn unknown_alias_is_an_error() {
    let rows = read_disclosures(CSV.as_bytes()).unwrap();
    let err = latest_portfolio_for_aliases(&rows, &["Nobody"]).unwrap_err();
    assert!(err.to_string().contains("nobody"));
  }

  #[test]
  fn load_from_file() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(CSV.as_bytes()).unwrap();
    assert_eq!(load_disclosures_csv(f.path()).unwrap().len(), 5);

    let mut bad = tempfile::NamedTempFile::new().unwrap();
    bad.write_all(b"person,ticker\nx,A\n").unwrap();
    let err = load_disclosures_csv(bad.path()).unwrap_err();
    assert!(err.to_string().contains("as_of_date, value_usd"));
  }
}
