//! # Configuration
//!
//! YAML configuration of a set of case studies. Relative data paths are resolved
//! against the grandparent directory of the configuration file, so a file under
//! `<project>/configs/` refers to data under `<project>/`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::info;

use crate::backtest::schedule::RebalanceFrequency;
use crate::error::BacktestError;
use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
struct DataSettings {
  #[serde(default = "default_disclosures_path")]
  disclosures_path: PathBuf,
  #[serde(default = "default_prices_path")]
  prices_path: PathBuf,
}

fn default_disclosures_path() -> PathBuf {
  PathBuf::from("data/raw/disclosures/disclosures.csv")
}

fn default_prices_path() -> PathBuf {
  PathBuf::from("data/raw/prices/prices.csv")
}

impl Default for DataSettings {
  fn default() -> Self {
    Self {
      disclosures_path: default_disclosures_path(),
      prices_path: default_prices_path(),
    }
  }
}

/// Parameters shared by every case study.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BacktestSettings {
  /// Rows in each training window.
  #[serde(default = "default_lookback")]
  pub lookback_periods: usize,
  #[serde(default)]
  pub rebalance_frequency: RebalanceFrequency,
  /// Risk aversion used to reverse-optimize equilibrium returns.
  #[serde(default = "default_risk_aversion")]
  pub risk_aversion: f64,
  /// Black-Litterman prior scaling.
  #[serde(default = "default_tau")]
  pub tau: f64,
}

fn default_lookback() -> usize {
  12
}

fn default_risk_aversion() -> f64 {
  2.5
}

fn default_tau() -> f64 {
  0.05
}

fn default_view_confidence() -> f64 {
  0.65
}

impl Default for BacktestSettings {
  fn default() -> Self {
    Self {
      lookback_periods: default_lookback(),
      rebalance_frequency: RebalanceFrequency::default(),
      risk_aversion: default_risk_aversion(),
      tau: default_tau(),
    }
  }
}

impl BacktestSettings {
  pub fn validate(&self) -> Result<()> {
    if self.lookback_periods == 0 {
      return Err(BacktestError::invalid_config(
        "lookback_periods must be positive",
      ));
    }
    if !(self.risk_aversion.is_finite() && self.risk_aversion > 0.0) {
      return Err(BacktestError::invalid_config(format!(
        "risk_aversion must be positive, got {}",
        self.risk_aversion
      )));
    }
    if !(self.tau.is_finite() && self.tau > 0.0) {
      return Err(BacktestError::invalid_config(format!(
        "tau must be positive, got {}",
        self.tau
      )));
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Deserialize)]
struct RawCaseStudy {
  person_label: Option<String>,
  disclosure_aliases: Option<Vec<String>>,
  #[serde(default = "default_view_confidence")]
  view_confidence: f64,
}

impl Default for RawCaseStudy {
  fn default() -> Self {
    Self {
      person_label: None,
      disclosure_aliases: None,
      view_confidence: default_view_confidence(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
  #[serde(default)]
  data: DataSettings,
  #[serde(default)]
  backtest: BacktestSettings,
  #[serde(default)]
  case_studies: BTreeMap<String, Option<RawCaseStudy>>,
}

/// One person whose disclosed portfolio is studied.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseStudyConfig {
  pub key: String,
  pub person_label: String,
  /// Trimmed, lowercased names matched against disclosure rows.
  pub disclosure_aliases: Vec<String>,
  pub view_confidence: f64,
}

/// Confidence in the sample-mean views must lie in `(0, 1]`.
pub fn validate_view_confidence(confidence: f64) -> Result<()> {
  if confidence > 0.0 && confidence <= 1.0 {
    Ok(())
  } else {
    Err(BacktestError::invalid_config(format!(
      "view_confidence must be in (0, 1], got {confidence}"
    )))
  }
}

/// Uppercase every letter that does not follow another letter, lowercase the rest.
fn title_case(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  let mut prev_alpha = false;
  for c in s.chars() {
    if c.is_alphabetic() {
      if prev_alpha {
        out.extend(c.to_lowercase());
      } else {
        out.extend(c.to_uppercase());
      }
      prev_alpha = true;
    } else {
      out.push(c);
      prev_alpha = false;
    }
  }
  out
}

impl CaseStudyConfig {
  fn from_raw(key: &str, raw: RawCaseStudy) -> Result<Self> {
    let aliases: Vec<String> = raw
      .disclosure_aliases
      .unwrap_or_else(|| vec![key.to_string()])
      .iter()
      .map(|a| a.trim().to_lowercase())
      .filter(|a| !a.is_empty())
      .collect();
    if aliases.is_empty() {
      return Err(BacktestError::invalid_config(format!(
        "case study '{key}' has no disclosure aliases"
      )));
    }
    validate_view_confidence(raw.view_confidence)?;

    Ok(Self {
      key: key.to_string(),
      person_label: raw.person_label.unwrap_or_else(|| title_case(key)),
      disclosure_aliases: aliases,
      view_confidence: raw.view_confidence,
    })
  }
}

/// Validated application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
  pub disclosures_path: PathBuf,
  pub prices_path: PathBuf,
  pub backtest: BacktestSettings,
  pub case_studies: BTreeMap<String, CaseStudyConfig>,
}

impl AppConfig {
  /// Read and validate a YAML configuration file.
  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let root = path.parent().and_then(Path::parent).unwrap_or(Path::new(""));
    let config = Self::from_yaml_str(&content, root)?;
    info!(
      path = %path.display(),
      case_studies = config.case_studies.len(),
      "loaded configuration"
    );
    Ok(config)
  }

  /// Parse YAML, resolving relative data paths against `root`.
  pub fn from_yaml_str(content: &str, root: &Path) -> Result<Self> {
    let raw: RawConfig = serde_yaml::from_str(content)?;
    raw.backtest.validate()?;

    let mut case_studies = BTreeMap::new();
    for (key, item) in raw.case_studies {
      let cfg = CaseStudyConfig::from_raw(&key, item.unwrap_or_default())?;
      case_studies.insert(key, cfg);
    }
    if case_studies.is_empty() {
      return Err(BacktestError::invalid_config(
        "no case studies found in config",
      ));
    }

    Ok(Self {
      disclosures_path: root.join(raw.data.disclosures_path),
      prices_path: root.join(raw.data.prices_path),
      backtest: raw.backtest,
      case_studies,
    })
  }

  /// Case study by key, or an error listing the available keys.
  pub fn case_study(&self, key: &str) -> Result<&CaseStudyConfig> {
    self.case_studies.get(key).ok_or_else(|| {
      let keys: Vec<&str> = self.case_studies.keys().map(String::as_str).collect();
      BacktestError::invalid_config(format!(
        "unknown person key '{key}'. Available: {}",
        keys.join(", ")
      ))
    })
  }
}
