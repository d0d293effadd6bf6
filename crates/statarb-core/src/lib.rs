pub mod config;
pub mod error;
pub mod types;

#[cfg(feature = "pairs")]
pub mod pairs;

#[cfg(feature = "stationarity")]
pub mod stationarity;

pub use config::{BacktestConfig, InstrumentPair};
pub use error::StatArbError;
pub use types::*;

/// Standard result type for all statarb operations
pub type StatArbResult<T> = Result<T, StatArbError>;
