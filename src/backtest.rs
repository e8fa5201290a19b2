//! # Backtest
//!
//! $$
//! \mathrm{NAV}_T = \mathrm{NAV}_0 \prod_{t=1}^{T} \left(1 + \mathbf{w}_{\tau(t)}^\top \mathbf{r}_t\right)
//! $$
//!
//! Walk-forward simulation, rebalance calendars and performance statistics.

pub mod engine;
pub mod metrics;
pub mod schedule;

pub use engine::rolling_backtest;
pub use engine::BacktestResult;
pub use metrics::average_turnover;
pub use metrics::annualized_return;
pub use metrics::annualized_volatility;
pub use metrics::concentration_hhi;
pub use metrics::max_drawdown;
pub use metrics::periods_per_year;
pub use metrics::sharpe_ratio;
pub use metrics::sortino_ratio;
pub use metrics::summarize;
pub use metrics::StrategySummary;
pub use schedule::rebalance_dates;
pub use schedule::RebalanceFrequency;
