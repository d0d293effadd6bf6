//! Stationarity diagnostics consumed alongside the spread series.

pub mod adf;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::config::InstrumentPair;
use crate::error::StatArbError;
use crate::pairs::{PairsBacktestInput, PairsPipeline};
use crate::types::{with_metadata, ComputationOutput, F64_BOUNDARY_PRECISION};
use crate::StatArbResult;

pub use adf::AugmentedDickeyFuller;

/// Test statistic, p-value, and named critical values of a unit-root test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationarityReport {
    pub statistic: f64,
    pub p_value: f64,
    /// Lagged differences included in the regression
    pub lags: usize,
    /// Observations used in the regression
    pub nobs: usize,
    /// Keyed by significance level, e.g. "5%"
    pub critical_values: BTreeMap<String, f64>,
}

/// A test of whether a series is mean-reverting.
pub trait StationarityTest {
    fn test(&self, series: &[Decimal]) -> StatArbResult<StationarityReport>;
}

/// Stationarity of the spread a backtest would trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadStationarityOutput {
    pub instruments: InstrumentPair,
    pub window: usize,
    pub spread_points: usize,
    #[serde(flatten)]
    pub report: StationarityReport,
}

/// Fit the rolling hedge ratio and run `test` on the resulting spread.
pub fn run_spread_stationarity<T: StationarityTest>(
    input: &PairsBacktestInput,
    test: &T,
) -> StatArbResult<ComputationOutput<SpreadStationarityOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let fitted = PairsPipeline::new(&input.config).fit(&input.prices)?;
    if fitted.spread().is_empty() {
        return Err(StatArbError::InsufficientData(
            "No spread value survived the rolling fit".into(),
        ));
    }
    let degenerate = fitted.degenerate_count();
    if degenerate > 0 {
        warnings.push(format!(
            "Degenerate fit: {degenerate} windows have a zero-variance predictor and were skipped"
        ));
    }

    let values = fitted.spread().values();
    let report = test.test(&values)?;
    if report.p_value > 0.05 {
        warnings.push(format!(
            "Spread unit root not rejected at 5% (p = {:.4}); mean-reversion signals may be unreliable",
            report.p_value
        ));
    }

    let output = SpreadStationarityOutput {
        instruments: input.config.instrument_labels.clone(),
        window: input.config.window,
        spread_points: values.len(),
        report,
    };
    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Augmented Dickey-Fuller test on the rolling-hedge spread",
        &input.config,
        warnings,
        elapsed,
        output,
    )
    .with_precision(F64_BOUNDARY_PRECISION))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BacktestConfig;
    use crate::pairs::{AlignedPriceSeries, PriceBar};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn input(prices: Vec<(Decimal, Decimal)>, window: usize) -> PairsBacktestInput {
        let start = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap();
        let bars = prices
            .into_iter()
            .enumerate()
            .map(|(i, (a, b))| PriceBar {
                date: start + chrono::Days::new(i as u64),
                price_a: a,
                price_b: b,
            })
            .collect();
        PairsBacktestInput {
            config: BacktestConfig {
                window,
                ..Default::default()
            },
            prices: AlignedPriceSeries::new(bars).unwrap(),
        }
    }

    #[test]
    fn test_alternating_residual_spread_is_stationary() {
        let prices = (0..150)
            .map(|i| {
                let a = dec!(60) + Decimal::from((i * 7 % 11) as i64);
                let kick = if i % 2 == 0 { dec!(0.8) } else { dec!(-0.8) };
                (a, dec!(1.5) * a + kick)
            })
            .collect();
        let out = run_spread_stationarity(&input(prices, 30), &AugmentedDickeyFuller::new(0))
            .unwrap();
        assert_eq!(out.result.spread_points, 120);
        assert_eq!(out.metadata.precision, F64_BOUNDARY_PRECISION);
        assert!(out.result.report.p_value < 0.05);
    }

    #[test]
    fn test_constant_prices_have_no_spread() {
        let prices = vec![(dec!(10), dec!(20)); 40];
        assert!(matches!(
            run_spread_stationarity(&input(prices, 10), &AugmentedDickeyFuller::new(1)),
            Err(StatArbError::InsufficientData(_))
        ));
    }
}
