//! # Frames
//!
//! $$
//! R \in \mathbb{R}^{T \times N},\qquad R_{t,i} = \frac{P_{t,i}}{P_{t-1,i}} - 1
//! $$
//!
//! Date-indexed tables used by the engine: the asset return matrix, weight
//! histories and scalar series. Row labels are [`NaiveDate`]s in strictly
//! increasing order; column labels are asset identifiers in lexicographic order, so
//! label-to-index lookups are binary searches.

use std::ops::Range;

use chrono::NaiveDate;
use ndarray::s;
use ndarray::Array2;
use ndarray::ArrayView1;
use tracing::debug;

use crate::error::BacktestError;
use crate::error::Result;
use crate::weights::WeightVector;

fn ensure_strictly_increasing(dates: &[NaiveDate], context: &str) -> Result<()> {
  for w in dates.windows(2) {
    if w[1] <= w[0] {
      return Err(BacktestError::Data(format!(
        "{context}: dates must be strictly increasing ({} followed by {})",
        w[0], w[1]
      )));
    }
  }
  Ok(())
}

/// Periodic asset returns. `NaN` marks a missing observation.
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnMatrix {
  dates: Vec<NaiveDate>,
  assets: Vec<String>,
  values: Array2<f64>,
}

impl ReturnMatrix {
  /// Build a return matrix from unordered labels.
  ///
  /// Rows are sorted by date and columns by asset identifier. Duplicate labels are
  /// rejected and rows without a single observation are dropped.
  pub fn new(dates: Vec<NaiveDate>, assets: Vec<String>, values: Array2<f64>) -> Result<Self> {
    let (rows, cols) = values.dim();
    if rows != dates.len() {
      return Err(BacktestError::dimension_mismatch(
        "return matrix rows",
        dates.len(),
        rows,
      ));
    }
    if cols != assets.len() {
      return Err(BacktestError::dimension_mismatch(
        "return matrix columns",
        assets.len(),
        cols,
      ));
    }

    let mut col_order: Vec<usize> = (0..cols).collect();
    col_order.sort_by(|&a, &b| assets[a].cmp(&assets[b]));
    for w in col_order.windows(2) {
      if assets[w[0]] == assets[w[1]] {
        return Err(BacktestError::Data(format!(
          "duplicate asset '{}' in return matrix",
          assets[w[0]]
        )));
      }
    }

    let mut row_order: Vec<usize> = (0..rows).collect();
    row_order.sort_by_key(|&i| dates[i]);
    for w in row_order.windows(2) {
      if dates[w[0]] == dates[w[1]] {
        return Err(BacktestError::Data(format!(
          "duplicate date {} in return matrix",
          dates[w[0]]
        )));
      }
    }

    let keep: Vec<usize> = row_order
      .into_iter()
      .filter(|&i| values.row(i).iter().any(|v| !v.is_nan()))
      .collect();
    if keep.len() < rows {
      debug!(dropped = rows - keep.len(), "dropping empty return rows");
    }

    let values = Array2::from_shape_fn((keep.len(), cols), |(r, c)| {
      values[[keep[r], col_order[c]]]
    });

    Ok(Self {
      dates: keep.iter().map(|&i| dates[i]).collect(),
      assets: col_order.iter().map(|&j| assets[j].clone()).collect(),
      values,
    })
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  pub fn values(&self) -> &Array2<f64> {
    &self.values
  }

  pub fn n_periods(&self) -> usize {
    self.dates.len()
  }

  pub fn n_assets(&self) -> usize {
    self.assets.len()
  }

  pub fn is_empty(&self) -> bool {
    self.dates.is_empty() || self.assets.is_empty()
  }

  pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
    self.values.row(i)
  }

  pub fn column(&self, j: usize) -> ArrayView1<'_, f64> {
    self.values.column(j)
  }

  /// Row position of `date`, if present.
  pub fn position(&self, date: NaiveDate) -> Option<usize> {
    self.dates.binary_search(&date).ok()
  }

  /// Column position of `asset`, if present.
  pub fn asset_index(&self, asset: &str) -> Option<usize> {
    self
      .assets
      .binary_search_by(|a| a.as_str().cmp(asset))
      .ok()
  }

  /// Contiguous block of rows.
  pub fn slice_rows(&self, range: Range<usize>) -> ReturnMatrix {
    ReturnMatrix {
      dates: self.dates[range.clone()].to_vec(),
      assets: self.assets.clone(),
      values: self.values.slice(s![range, ..]).to_owned(),
    }
  }

  /// Restrict to `assets`, dropping rows left without observations.
  pub fn select_assets(&self, assets: &[String]) -> Result<ReturnMatrix> {
    let mut idx = Vec::with_capacity(assets.len());
    for a in assets {
      let j = self
        .asset_index(a)
        .ok_or_else(|| BacktestError::Data(format!("asset '{a}' not in return matrix")))?;
      idx.push(j);
    }

    let values = Array2::from_shape_fn((self.n_periods(), idx.len()), |(r, c)| {
      self.values[[r, idx[c]]]
    });
    ReturnMatrix::new(self.dates.clone(), assets.to_vec(), values)
  }
}

/// Portfolio weights per rebalance date over a fixed universe.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightHistory {
  dates: Vec<NaiveDate>,
  assets: Vec<String>,
  values: Array2<f64>,
}

impl WeightHistory {
  pub fn new(dates: Vec<NaiveDate>, assets: Vec<String>, values: Array2<f64>) -> Result<Self> {
    let (rows, cols) = values.dim();
    if rows != dates.len() {
      return Err(BacktestError::dimension_mismatch(
        "weight history rows",
        dates.len(),
        rows,
      ));
    }
    if cols != assets.len() {
      return Err(BacktestError::dimension_mismatch(
        "weight history columns",
        assets.len(),
        cols,
      ));
    }
    ensure_strictly_increasing(&dates, "weight history")?;

    Ok(Self {
      dates,
      assets,
      values,
    })
  }

  /// Stack weight vectors, reindexed onto `assets` with missing entries set to zero.
  pub fn from_rows(assets: Vec<String>, rows: &[(NaiveDate, WeightVector)]) -> Result<Self> {
    let values = Array2::from_shape_fn((rows.len(), assets.len()), |(r, c)| {
      rows[r].1.get(&assets[c]).unwrap_or(0.0)
    });
    let dates = rows.iter().map(|(d, _)| *d).collect();
    Self::new(dates, assets, values)
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  pub fn values(&self) -> &Array2<f64> {
    &self.values
  }

  pub fn n_rows(&self) -> usize {
    self.dates.len()
  }

  pub fn is_empty(&self) -> bool {
    self.dates.is_empty()
  }

  pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
    self.values.row(i)
  }
}

/// Date-indexed scalar series.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Series {
  dates: Vec<NaiveDate>,
  values: Vec<f64>,
}

impl Series {
  pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
    if dates.len() != values.len() {
      return Err(BacktestError::dimension_mismatch(
        "series",
        dates.len(),
        values.len(),
      ));
    }
    ensure_strictly_increasing(&dates, "series")?;
    Ok(Self { dates, values })
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn values(&self) -> &[f64] {
    &self.values
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn get(&self, date: NaiveDate) -> Option<f64> {
    self
      .dates
      .binary_search(&date)
      .ok()
      .map(|i| self.values[i])
  }

  pub fn last(&self) -> Option<(NaiveDate, f64)> {
    self.dates.last().copied().zip(self.values.last().copied())
  }

  pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
    self.dates.iter().copied().zip(self.values.iter().copied())
  }
}

#[cfg(test)]
mod tests {
  use ndarray::array;

  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  #[test]
  fn new_sorts_labels_and_drops_empty_rows() {
    let dates = vec![d(2024, 3, 31), d(2024, 1, 31), d(2024, 2, 29)];
    let assets = vec!["MSFT".to_string(), "AAPL".to_string()];
    let values = array![[0.3, 0.03], [0.1, 0.01], [f64::NAN, f64::NAN]];

    let m = ReturnMatrix::new(dates, assets, values).unwrap();

    assert_eq!(m.dates(), &[d(2024, 1, 31), d(2024, 3, 31)]);
    assert_eq!(m.assets(), &["AAPL".to_string(), "MSFT".to_string()]);
    assert_eq!(m.row(0).to_vec(), vec![0.01, 0.1]);
    assert_eq!(m.row(1).to_vec(), vec![0.03, 0.3]);
    assert_eq!(m.asset_index("MSFT"), Some(1));
    assert_eq!(m.position(d(2024, 3, 31)), Some(1));
    assert_eq!(m.position(d(2024, 2, 29)), None);
  }

  #[test]
  fn new_rejects_duplicate_labels() {
    let dup_asset = ReturnMatrix::new(
      vec![d(2024, 1, 31)],
      vec!["A".into(), "A".into()],
      array![[0.1, 0.2]],
    );
    assert!(matches!(dup_asset, Err(BacktestError::Data(_))));

    let dup_date = ReturnMatrix::new(
      vec![d(2024, 1, 31), d(2024, 1, 31)],
      vec!["A".into()],
      array![[0.1], [0.2]],
    );
    assert!(matches!(dup_date, Err(BacktestError::Data(_))));
  }

  #[test]
  fn slice_and_select() {
    let m = ReturnMatrix::new(
      vec![d(2024, 1, 31), d(2024, 2, 29), d(2024, 3, 31)],
      vec!["A".into(), "B".into(), "C".into()],
      array![[0.1, f64::NAN, 0.3], [0.2, f64::NAN, 0.1], [f64::NAN, 0.5, f64::NAN]],
    )
    .unwrap();

    let window = m.slice_rows(1..3);
    assert_eq!(window.n_periods(), 2);
    assert_eq!(window.dates()[0], d(2024, 2, 29));

    let sub = m.select_assets(&["C".to_string(), "A".to_string()]).unwrap();
    assert_eq!(sub.assets(), &["A".to_string(), "C".to_string()]);
    assert_eq!(sub.n_periods(), 2);
    assert!(m.select_assets(&["Z".to_string()]).is_err());
  }

  #[test]
  fn series_requires_increasing_dates() {
    assert!(Series::new(vec![d(2024, 2, 1), d(2024, 1, 1)], vec![1.0, 2.0]).is_err());
    let s = Series::new(vec![d(2024, 1, 1), d(2024, 2, 1)], vec![1.0, 2.0]).unwrap();
    assert_eq!(s.get(d(2024, 2, 1)), Some(2.0));
    assert_eq!(s.last(), Some((d(2024, 2, 1), 2.0)));
  }
}
