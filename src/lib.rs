//! # portfolio-bl
//!
//! $$
//! \mu_{BL} = \left[(\tau\Sigma)^{-1} + P^\top\Omega^{-1}P\right]^{-1}
//! \left[(\tau\Sigma)^{-1}\pi + P^\top\Omega^{-1}Q\right]
//! $$
//!
//! Rolling backtests comparing a publicly disclosed portfolio with long-only
//! mean-variance and Black-Litterman portfolios over the same assets.
//!
//! - [`backtest`]: walk-forward engine, rebalance calendars and metrics.
//! - [`models`]: sample estimation, mean-variance and Black-Litterman.
//! - [`strategy`]: weight rules plugged into the engine.
//! - [`pipeline`]: end-to-end case study.

pub mod backtest;
pub mod config;
pub mod data;
pub mod error;
pub mod frame;
pub mod linalg;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod strategy;
pub mod weights;

pub use backtest::rolling_backtest;
pub use backtest::BacktestResult;
pub use config::AppConfig;
pub use error::BacktestError;
pub use error::Result;
pub use frame::ReturnMatrix;
pub use pipeline::run_case_study;
pub use pipeline::run_case_study_with_data;
pub use pipeline::CaseStudyResult;
pub use strategy::Strategy;
pub use strategy::WeightStrategy;
pub use weights::WeightVector;
