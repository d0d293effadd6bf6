use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info_span, warn};

use super::backtest::{BacktestRow, BacktestSimulator, PairTrade};
use super::hedge_ratio::{HedgeEstimate, HedgeRatioEstimator, RegressionPoint};
use super::performance::PerformanceSummary;
use super::series::AlignedPriceSeries;
use super::signals::{SignalGenerator, SignalSet, SpreadStatistics};
use super::spread::{SpreadCalculator, SpreadSeries};
use crate::config::{BacktestConfig, InstrumentPair};
use crate::types::{with_metadata, ComputationOutput};
use crate::StatArbResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Configuration plus the aligned prices it runs on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairsBacktestInput {
    #[serde(default)]
    pub config: BacktestConfig,
    pub prices: AlignedPriceSeries,
}

/// Everything the pipeline produces, in bar order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairsBacktestOutput {
    pub instruments: InstrumentPair,
    pub window: usize,
    /// Bars past warm-up whose predictor window had zero variance
    pub degenerate_fits: usize,
    /// Fitted bars whose spread could not be represented
    pub dropped_spread_points: usize,
    /// Absent when no spread point survived the fit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spread_statistics: Option<SpreadStatistics>,
    pub regression: Vec<RegressionPoint>,
    pub rows: Vec<BacktestRow>,
    pub trades: Vec<PairTrade>,
    pub summary: PerformanceSummary,
}

// ---------------------------------------------------------------------------
// Staged pipeline
// ---------------------------------------------------------------------------

/// Runs the stages one at a time; a host may stop between any two.
#[derive(Debug, Clone, Copy)]
pub struct PairsPipeline<'a> {
    config: &'a BacktestConfig,
}

/// Output of the regression and spread stages.
#[derive(Debug, Clone)]
pub struct FittedPair<'a> {
    config: &'a BacktestConfig,
    series: &'a AlignedPriceSeries,
    regression: Vec<RegressionPoint>,
    spread: SpreadSeries,
}

/// A fitted pair with its z-score signals.
#[derive(Debug, Clone)]
pub struct SignalledPair<'a> {
    fitted: FittedPair<'a>,
    signals: SignalSet,
}

impl<'a> PairsPipeline<'a> {
    pub fn new(config: &'a BacktestConfig) -> Self {
        Self { config }
    }

    /// Validate, fit the rolling regression, and build the spread.
    pub fn fit(&self, series: &'a AlignedPriceSeries) -> StatArbResult<FittedPair<'a>> {
        let _span = info_span!("fit", bars = series.len(), window = self.config.window).entered();
        self.config.validate(series.len())?;

        let estimator = HedgeRatioEstimator::new(self.config);
        #[cfg(feature = "parallel")]
        let regression = estimator.estimate_parallel(series)?;
        #[cfg(not(feature = "parallel"))]
        let regression = estimator.estimate(series)?;

        let spread = SpreadCalculator::calculate(series, &regression)?;
        Ok(FittedPair {
            config: self.config,
            series,
            regression,
            spread,
        })
    }
}

impl<'a> FittedPair<'a> {
    pub fn regression(&self) -> &[RegressionPoint] {
        &self.regression
    }

    pub fn spread(&self) -> &SpreadSeries {
        &self.spread
    }

    /// Bars past warm-up with a zero-variance predictor window.
    pub fn degenerate_count(&self) -> usize {
        self.regression
            .iter()
            .filter(|p| p.estimate == HedgeEstimate::Degenerate)
            .count()
    }

    /// True when no bar past warm-up produced a fit.
    pub fn all_degenerate(&self) -> bool {
        !self.regression.iter().any(|p| p.estimate.is_fitted())
    }

    pub fn signals(self) -> StatArbResult<SignalledPair<'a>> {
        let _span = info_span!("signals", points = self.spread.len()).entered();
        let signals = SignalGenerator::new(self.config).generate(&self.spread)?;
        Ok(SignalledPair {
            fitted: self,
            signals,
        })
    }

    /// Output for a pair whose spread is empty: no signal can exist, so no
    /// trade opens and the portfolio stays at its initial value.
    fn into_flat_output(self) -> StatArbResult<PairsBacktestOutput> {
        let degenerate_fits = self.degenerate_count();
        let summary = PerformanceSummary::from_backtest(&[], &[], self.config.initial_cash)?;
        Ok(PairsBacktestOutput {
            instruments: self.config.instrument_labels.clone(),
            window: self.config.window,
            degenerate_fits,
            dropped_spread_points: self.spread.dropped,
            spread_statistics: None,
            regression: self.regression,
            rows: Vec::new(),
            trades: Vec::new(),
            summary,
        })
    }
}

impl<'a> SignalledPair<'a> {
    pub fn signals(&self) -> &SignalSet {
        &self.signals
    }

    pub fn simulate(self) -> StatArbResult<PairsBacktestOutput> {
        let report =
            BacktestSimulator::new(self.fitted.config).simulate(self.fitted.series, &self.signals)?;
        let degenerate_fits = self.fitted.degenerate_count();
        Ok(PairsBacktestOutput {
            instruments: self.fitted.config.instrument_labels.clone(),
            window: self.fitted.config.window,
            degenerate_fits,
            dropped_spread_points: self.fitted.spread.dropped,
            spread_statistics: Some(self.signals.statistics),
            regression: self.fitted.regression,
            rows: report.rows,
            trades: report.trades,
            summary: report.summary,
        })
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run the full pairs backtest: rolling hedge ratio, spread, z-score signals,
/// and position simulation.
pub fn run_pairs_backtest(
    input: &PairsBacktestInput,
) -> StatArbResult<ComputationOutput<PairsBacktestOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let fitted = PairsPipeline::new(&input.config).fit(&input.prices)?;

    let degenerate = fitted.degenerate_count();
    if fitted.all_degenerate() {
        warn!(degenerate, "no rolling window produced a hedge ratio");
        warnings.push(format!(
            "Degenerate fit: all {degenerate} eligible windows have a zero-variance predictor; \
             no spread or signal exists and no trade was opened"
        ));
    } else if degenerate > 0 {
        warnings.push(format!(
            "Degenerate fit: {degenerate} windows have a zero-variance predictor and were skipped"
        ));
    }
    if fitted.spread().dropped > 0 {
        warnings.push(format!(
            "{} spread values overflowed and were dropped",
            fitted.spread().dropped
        ));
    }

    let output = if fitted.spread().is_empty() {
        fitted.into_flat_output()?
    } else {
        warnings.push(
            "Z-scores use whole-history spread mean and standard deviation; \
             later observations influence earlier signals"
                .into(),
        );
        if !input.config.lag_positions {
            warnings.push(
                "Each bar's position is applied to that bar's own return \
                 (set lag_positions to apply the previous bar's position)"
                    .into(),
            );
        }
        fitted.signals()?.simulate()?
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Rolling OLS hedge ratio, global z-score signals, threshold state machine",
        &input.config,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
