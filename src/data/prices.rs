//! # Prices
//!
//! $$
//! R_{t,i} = \frac{\tilde P_{t,i}}{\tilde P_{t-1,i}} - 1
//! $$
//!
//! Long-format closing prices and their pivot into a [`ReturnMatrix`]. `P~` is the
//! price forward-filled per asset.

use std::collections::BTreeSet;
use std::io;
use std::path::Path;

use csv::ReaderBuilder;
use ndarray::Array2;
use tracing::debug;
use tracing::info;

use super::column_indices;
use super::parse_date;
use super::parse_number;
use crate::error::BacktestError;
use crate::error::Result;
use crate::frame::ReturnMatrix;

/// One closing price observation.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceRecord {
  pub date: chrono::NaiveDate,
  pub ticker: String,
  pub close: f64,
}

/// Load `date,ticker,close` rows from a CSV file.
pub fn load_prices_csv(path: impl AsRef<Path>) -> Result<Vec<PriceRecord>> {
  let path = path.as_ref();
  let file = std::fs::File::open(path)?;
  let prices = read_prices(file)?;
  info!(path = %path.display(), rows = prices.len(), "loaded prices");
  Ok(prices)
}

/// Parse price rows from any reader.
///
/// Tickers are trimmed and uppercased. Rows with an unparseable date or close, an
/// empty ticker or a non-positive close are dropped. The output is sorted by date,
/// then ticker.
pub fn read_prices<R: io::Read>(reader: R) -> Result<Vec<PriceRecord>> {
  let mut reader = ReaderBuilder::new().flexible(true).from_reader(reader);
  let [date_col, ticker_col, close_col] =
    column_indices(reader.headers()?, ["date", "ticker", "close"], "price")?;

  let mut out = Vec::new();
  let mut skipped = 0usize;
  for record in reader.records() {
    let record = record?;
    let date = record.get(date_col).and_then(parse_date);
    let ticker = record.get(ticker_col).map(|t| t.trim().to_uppercase());
    let close = record.get(close_col).and_then(parse_number);

    match (date, ticker, close) {
      (Some(date), Some(ticker), Some(close)) if !ticker.is_empty() && close > 0.0 => {
        out.push(PriceRecord {
          date,
          ticker,
          close,
        });
      }
      _ => skipped += 1,
    }
  }

  if skipped > 0 {
    debug!(skipped, "dropped invalid price rows");
  }
  if out.is_empty() {
    return Err(BacktestError::insufficient_data(
      "price dataset is empty after cleaning",
    ));
  }

  out.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.ticker.cmp(&b.ticker)));
  Ok(out)
}

/// Pivot prices to a date by ticker table and take simple returns.
///
/// The last price wins when a date and ticker repeat. Missing prices are
/// forward-filled before differencing; the first date and dates without any return
/// are dropped.
pub fn to_return_matrix(prices: &[PriceRecord]) -> Result<ReturnMatrix> {
  let dates: Vec<_> = prices
    .iter()
    .map(|p| p.date)
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect();
  let tickers: Vec<String> = prices
    .iter()
    .map(|p| p.ticker.clone())
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect();

  let mut levels = Array2::from_elem((dates.len(), tickers.len()), f64::NAN);
  for p in prices {
    if let (Ok(r), Ok(c)) = (dates.binary_search(&p.date), tickers.binary_search(&p.ticker)) {
      levels[[r, c]] = p.close;
    }
  }

  for c in 0..tickers.len() {
    let mut last = f64::NAN;
    for r in 0..dates.len() {
      if levels[[r, c]].is_nan() {
        levels[[r, c]] = last;
      } else {
        last = levels[[r, c]];
      }
    }
  }

  let n_rows = dates.len().saturating_sub(1);
  let returns = Array2::from_shape_fn((n_rows, tickers.len()), |(r, c)| {
    levels[[r + 1, c]] / levels[[r, c]] - 1.0
  });

  let matrix = ReturnMatrix::new(dates.into_iter().skip(1).collect(), tickers, returns)?;
  if matrix.is_empty() {
    return Err(BacktestError::insufficient_data(
      "return matrix is empty; not enough observations in prices",
    ));
  }
  Ok(matrix)
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use approx::assert_abs_diff_eq;
  use chrono::NaiveDate;

  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  const CSV: &str = "\
date,ticker,close,volume
2024-02-29, msft ,110,1
2024-01-31,AAPL,100,1
2024-01-31,MSFT,100,1
2024-02-29,AAPL,abc,1
2024-03-31,AAPL,-5,1
2024-03-31,AAPL,120,1
not-a-date,AAPL,1,1
2024-03-31,MSFT,99,1
";

  #[test]
  fn read_prices_cleans_and_sorts() {
    let prices = read_prices(CSV.as_bytes()).unwrap();

    assert_eq!(prices.len(), 5);
    assert_eq!(prices[0].date, d(2024, 1, 31));
    assert_eq!(prices[0].ticker, "AAPL");
    assert_eq!(prices[2].ticker, "MSFT");
    assert_eq!(prices[2].date, d(2024, 2, 29));
    assert!(prices.iter().all(|p| p.close > 0.0));
  }

  #[test]
  fn returns_forward_fill_missing_prices() {
    let prices = read_prices(CSV.as_bytes()).unwrap();
    let m = to_return_matrix(&prices).unwrap();

    assert_eq!(m.dates(), &[d(2024, 2, 29), d(2024, 3, 31)]);
    assert_eq!(m.assets(), &["AAPL".to_string(), "MSFT".to_string()]);
    // AAPL has no valid February close: flat in February, 100 -> 120 in March.
    assert_abs_diff_eq!(m.row(0)[0], 0.0, epsilon = 1e-15);
    assert_abs_diff_eq!(m.row(1)[0], 0.2, epsilon = 1e-12);
    assert_abs_diff_eq!(m.row(0)[1], 0.1, epsilon = 1e-12);
    assert_abs_diff_eq!(m.row(1)[1], 0.9 - 1.0, epsilon = 1e-12);
  }

  #[test]
  fn late_listing_starts_with_missing_returns() {
    let prices = vec![
      PriceRecord { date: d(2024, 1, 31), ticker: "A".into(), close: 10.0 },
      PriceRecord { date: d(2024, 2, 29), ticker: "A".into(), close: 11.0 },
      PriceRecord { date: d(2024, 2, 29), ticker: "B".into(), close: 5.0 },
      PriceRecord { date: d(2024, 3, 31), ticker: "A".into(), close: 11.0 },
      PriceRecord { date: d(2024, 3, 31), ticker: "B".into(), close: 6.0 },
    ];
    let m = to_return_matrix(&prices).unwrap();
    assert!(m.row(0)[1].is_nan());
    assert_abs_diff_eq!(m.row(1)[1], 0.2, epsilon = 1e-12);
  }

  #[test]
  fn single_date_has_no_returns() {
    let prices = vec![PriceRecord { date: d(2024, 1, 31), ticker: "A".into(), close: 10.0 }];
    assert!(matches!(
      to_return_matrix(&prices),
      Err(BacktestError::InsufficientData(_))
    ));
  }

  #[test]
  fn load_from_file_and_reject_bad_headers() {
    let mut good = tempfile::NamedTempFile::new().unwrap();
    good.write_all(CSV.as_bytes()).unwrap();
    assert_eq!(load_prices_csv(good.path()).unwrap().len(), 5);

    let mut bad = tempfile::NamedTempFile::new().unwrap();
    bad.write_all(b"day,ticker,price\n2024-01-31,A,1\n").unwrap();
    let err = load_prices_csv(bad.path()).unwrap_err();
    assert!(err.to_string().contains("close, date"));

    let mut empty = tempfile::NamedTempFile::new().unwrap();
    empty.write_all(b"date,ticker,close\n2024-01-31,A,0\n").unwrap();
    assert!(matches!(
      load_prices_csv(empty.path()),
      Err(BacktestError::InsufficientData(_))
    ));
  }
}
