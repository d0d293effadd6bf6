pub mod backtest;
pub mod stationarity;
