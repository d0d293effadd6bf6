use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::StatArbError;
use crate::types::{Money, Rate};
use crate::StatArbResult;

/// Display labels for the two legs of the pair. Leg A is the regressor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentPair {
    pub a: String,
    pub b: String,
}

impl Default for InstrumentPair {
    fn default() -> Self {
        Self {
            a: "PG".into(),
            b: "XLP".into(),
        }
    }
}

/// Immutable backtest configuration shared by every pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Names of the two instruments (A is regressed against, B is the target)
    pub instrument_labels: InstrumentPair,
    /// Number of trailing observations in each rolling regression
    pub window: usize,
    /// Starting capital of the simulated portfolio
    pub initial_cash: Money,
    /// Trade PnL at or above which an open position is closed
    pub take_profit: Rate,
    /// Trade PnL at or below which an open position is closed (negative)
    pub stop_loss: Rate,
    /// |z| beyond which a position is opened
    pub entry_z: Decimal,
    /// |z| below which an open position is closed
    pub exit_z: Decimal,
    /// Apply the previous bar's position to the current bar's return
    pub lag_positions: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            instrument_labels: InstrumentPair::default(),
            window: 90,
            initial_cash: dec!(100000),
            take_profit: dec!(0.05),
            stop_loss: dec!(-0.05),
            entry_z: dec!(2.0),
            exit_z: dec!(0.5),
            lag_positions: false,
        }
    }
}

impl BacktestConfig {
    /// Validate the configuration against a price series of `series_len` bars.
    pub fn validate(&self, series_len: usize) -> StatArbResult<()> {
        self.validate_parameters()?;
        if series_len <= self.window {
            return Err(StatArbError::InsufficientData(format!(
                "A window of {} needs at least {} aligned bars, got {}",
                self.window,
                self.window.saturating_add(1),
                series_len
            )));
        }
        Ok(())
    }

    /// Validate everything that does not depend on the data.
    pub fn validate_parameters(&self) -> StatArbResult<()> {
        if self.window == 0 {
            return Err(invalid("window", "Window must be a positive integer"));
        }
        if self.initial_cash <= Decimal::ZERO {
            return Err(invalid("initial_cash", "Initial cash must be positive"));
        }
        if self.entry_z <= Decimal::ZERO {
            return Err(invalid("entry_z", "Entry z-score must be positive"));
        }
        if self.exit_z <= Decimal::ZERO {
            return Err(invalid("exit_z", "Exit z-score must be positive"));
        }
        if self.take_profit <= self.stop_loss {
            return Err(invalid(
                "take_profit",
                "Take-profit threshold must exceed the stop-loss threshold",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> StatArbError {
    StatArbError::InvalidConfiguration {
        field: field.into(),
        reason: reason.into(),
    }
}
