//! # Errors
//!
//! Validation failures surfaced to callers. Numerical edge cases (zero volatility,
//! singular matrices, non-positive weight sums) are not errors and never show up here.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, BacktestError>;

#[derive(Error, Debug)]
pub enum BacktestError {
  /// Not enough rows, assets or eligible dates to run the requested computation.
  #[error("Insufficient data: {0}")]
  InsufficientData(String),

  #[error("Invalid configuration: {0}")]
  InvalidConfig(String),

  #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
  DimensionMismatch {
    context: String,
    expected: usize,
    actual: usize,
  },

  /// Malformed input table.
  #[error("Data error: {0}")]
  Data(String),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("CSV error: {0}")]
  Csv(#[from] csv::Error),

  #[error("YAML error: {0}")]
  Yaml(#[from] serde_yaml::Error),
}

impl BacktestError {
  pub fn insufficient_data(message: impl Into<String>) -> Self {
    Self::InsufficientData(message.into())
  }

  pub fn invalid_config(message: impl Into<String>) -> Self {
    Self::InvalidConfig(message.into())
  }

  pub fn dimension_mismatch(context: impl Into<String>, expected: usize, actual: usize) -> Self {
    Self::DimensionMismatch {
      context: context.into(),
      expected,
      actual,
    }
  }
}
