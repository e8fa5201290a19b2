use std::hint::black_box;

use chrono::Days;
use chrono::NaiveDate;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::BenchmarkId;
use criterion::Criterion;
use ndarray::Array2;
use portfolio_bl::backtest::rebalance_dates;
use portfolio_bl::backtest::rolling_backtest;
use portfolio_bl::backtest::RebalanceFrequency;
use portfolio_bl::config::BacktestSettings;
use portfolio_bl::pipeline::build_strategies;
use portfolio_bl::ReturnMatrix;
use portfolio_bl::WeightStrategy;
use portfolio_bl::WeightVector;

const N_ASSETS: usize = 5;
const N_PERIODS: usize = 240;

fn synthetic_returns() -> ReturnMatrix {
  let start = NaiveDate::from_ymd_opt(2005, 1, 31).unwrap();
  let dates = (0..N_PERIODS)
    .map(|i| start + Days::new(7 * i as u64))
    .collect();
  let assets = (0..N_ASSETS).map(|j| format!("ASSET{j}")).collect();
  let values = Array2::from_shape_fn((N_PERIODS, N_ASSETS), |(t, j)| {
    let phase = (t as f64 * 0.37 + j as f64 * 1.3).sin();
    0.002 * (j as f64 + 1.0) + 0.03 * phase
  });
  ReturnMatrix::new(dates, assets, values).unwrap()
}

fn bench_strategies(c: &mut Criterion) {
  let returns = synthetic_returns();
  let schedule = rebalance_dates(returns.dates(), RebalanceFrequency::MonthEnd);
  let market = WeightVector::uniform(returns.assets().to_vec()).unwrap();
  let settings = BacktestSettings::default();

  let mut group = c.benchmark_group("rolling_backtest");
  for strategy in build_strategies(&market, &settings, 0.65) {
    group.bench_with_input(
      BenchmarkId::from_parameter(strategy.name()),
      &strategy,
      |b, s| {
        b.iter(|| {
          let result = rolling_backtest(&returns, &schedule, settings.lookback_periods, s, 1.0);
          black_box(result.unwrap());
        });
      },
    );
  }
  group.finish();
}

criterion_group!(benches, bench_strategies);
criterion_main!(benches);
