//! # Data
//!
//! CSV loaders for closing prices and disclosed holdings. Rows whose values cannot
//! be parsed are dropped rather than failing the whole file.

pub mod disclosures;
pub mod prices;

use chrono::NaiveDate;
use chrono::NaiveDateTime;
use csv::StringRecord;

use crate::error::BacktestError;
use crate::error::Result;

pub use disclosures::latest_portfolio_for_aliases;
pub use disclosures::load_disclosures_csv;
pub use disclosures::DisclosedPortfolio;
pub use disclosures::DisclosureRecord;
pub use disclosures::Holding;
pub use prices::load_prices_csv;
pub use prices::to_return_matrix;
pub use prices::PriceRecord;

/// Positions of `required` in `headers`, or a data error naming the missing columns.
pub(crate) fn column_indices<const N: usize>(
  headers: &StringRecord,
  required: [&str; N],
  table: &str,
) -> Result<[usize; N]> {
  let mut idx = [0usize; N];
  let mut missing = Vec::new();
  for (slot, name) in idx.iter_mut().zip(required) {
    match headers.iter().position(|h| h.trim() == name) {
      Some(i) => *slot = i,
      None => missing.push(name),
    }
  }

  if !missing.is_empty() {
    missing.sort_unstable();
    return Err(BacktestError::Data(format!(
      "missing required {table} columns: {}",
      missing.join(", ")
    )));
  }
  Ok(idx)
}

/// Parse `YYYY-MM-DD`, also accepting a trailing time of day.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
  let s = raw.trim();
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
    .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").map(|dt| dt.date()))
    .ok()
}

/// Parse a finite float.
pub(crate) fn parse_number(raw: &str) -> Option<f64> {
  raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_columns_are_listed_sorted() {
    let headers = StringRecord::from(vec!["ticker", "other"]);
    let err = column_indices(&headers, ["date", "ticker", "close"], "price").unwrap_err();
    assert_eq!(
      err.to_string(),
      "Data error: missing required price columns: close, date"
    );

    let idx = column_indices(&headers, ["other", "ticker"], "price").unwrap();
    assert_eq!(idx, [1, 0]);
  }

  #[test]
  fn dates_and_numbers() {
    let d = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
    assert_eq!(parse_date("2024-01-31"), Some(d));
    assert_eq!(parse_date(" 2024-01-31 00:00:00"), Some(d));
    assert_eq!(parse_date("31/01/2024"), None);
    assert_eq!(parse_number(" 1.5 "), Some(1.5));
    assert_eq!(parse_number("NaN"), None);
    assert_eq!(parse_number("abc"), None);
  }
}
