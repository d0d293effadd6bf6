//! Rolling-hedge pairs trading: regression, spread, signals, and simulation.
//!
//! Data flows strictly forward through the stages:
//! prices -> (hedge ratio, alpha) -> spread -> z-score/signals -> position/PnL.

pub mod backtest;
pub mod hedge_ratio;
pub mod performance;
pub mod pipeline;
pub mod series;
pub mod signals;
pub mod spread;

mod stats;

pub use backtest::{BacktestReport, BacktestRow, BacktestSimulator, PositionState};
pub use hedge_ratio::{HedgeEstimate, HedgeRatioEstimator, RegressionPoint};
pub use performance::PerformanceSummary;
pub use pipeline::{run_pairs_backtest, PairsBacktestInput, PairsBacktestOutput, PairsPipeline};
pub use series::{AlignedPriceSeries, PriceBar};
pub use signals::{SignalGenerator, SignalRow, SignalSet, SpreadStatistics};
pub use spread::{SpreadCalculator, SpreadPoint, SpreadSeries};
