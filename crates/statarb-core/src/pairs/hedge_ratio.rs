use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::series::AlignedPriceSeries;
use super::stats::checked_sum;
use crate::config::BacktestConfig;
use crate::error::StatArbError;
use crate::StatArbResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Outcome of the rolling fit at one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HedgeEstimate {
    /// Fewer than `window` observations precede this bar
    Warmup,
    /// The predictor window has zero variance (or the fit overflowed)
    Degenerate,
    Fitted { hedge_ratio: Decimal, alpha: Decimal },
}

impl HedgeEstimate {
    pub fn hedge_ratio(&self) -> Option<Decimal> {
        match self {
            HedgeEstimate::Fitted { hedge_ratio, .. } => Some(*hedge_ratio),
            _ => None,
        }
    }

    pub fn alpha(&self) -> Option<Decimal> {
        match self {
            HedgeEstimate::Fitted { alpha, .. } => Some(*alpha),
            _ => None,
        }
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self, HedgeEstimate::Fitted { .. })
    }
}

/// Per-timestamp regression result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionPoint {
    pub index: usize,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub estimate: HedgeEstimate,
}

/// Rolling OLS of leg B on leg A.
///
/// The fit at bar `i` uses bars `[i - window, i)`; the current bar never
/// enters its own regression.
#[derive(Debug, Clone, Copy)]
pub struct HedgeRatioEstimator {
    window: usize,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl HedgeRatioEstimator {
    pub fn new(config: &BacktestConfig) -> Self {
        Self::with_window(config.window)
    }

    pub fn with_window(window: usize) -> Self {
        Self { window }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// One regression point per bar, in bar order.
    pub fn estimate(&self, series: &AlignedPriceSeries) -> StatArbResult<Vec<RegressionPoint>> {
        self.check_window(series.len())?;
        let a = series.prices_a();
        let b = series.prices_b();

        let points: Vec<RegressionPoint> = (0..series.len())
            .map(|i| self.point_at(series, &a, &b, i))
            .collect();

        log_degenerate(&points, self.window);
        Ok(points)
    }

    /// Same output as [`estimate`](Self::estimate), with the per-bar fits
    /// spread across the rayon pool. All fits complete before returning.
    #[cfg(feature = "parallel")]
    pub fn estimate_parallel(
        &self,
        series: &AlignedPriceSeries,
    ) -> StatArbResult<Vec<RegressionPoint>> {
        use rayon::prelude::*;

        self.check_window(series.len())?;
        let a = series.prices_a();
        let b = series.prices_b();

        let points: Vec<RegressionPoint> = (0..series.len())
            .into_par_iter()
            .map(|i| self.point_at(series, &a, &b, i))
            .collect();

        log_degenerate(&points, self.window);
        Ok(points)
    }

    fn check_window(&self, len: usize) -> StatArbResult<()> {
        if self.window == 0 {
            return Err(StatArbError::InvalidConfiguration {
                field: "window".into(),
                reason: "Window must be a positive integer".into(),
            });
        }
        if self.window >= len {
            return Err(StatArbError::InvalidConfiguration {
                field: "window".into(),
                reason: format!(
                    "Window ({}) must be shorter than the price series ({} bars)",
                    self.window, len
                ),
            });
        }
        Ok(())
    }

    fn point_at(
        &self,
        series: &AlignedPriceSeries,
        a: &[Decimal],
        b: &[Decimal],
        i: usize,
    ) -> RegressionPoint {
        let estimate = if i < self.window {
            HedgeEstimate::Warmup
        } else {
            let lo = i - self.window;
            fit_ols(&a[lo..i], &b[lo..i])
        };
        RegressionPoint {
            index: i,
            date: series.bars()[i].date,
            estimate,
        }
    }
}

/// Closed-form single-predictor OLS of `y` on `x`.
///
/// slope = cov(x, y) / var(x), intercept = mean(y) - slope * mean(x).
pub fn fit_ols(x: &[Decimal], y: &[Decimal]) -> HedgeEstimate {
    match ols_coefficients(x, y) {
        Some((hedge_ratio, alpha)) => HedgeEstimate::Fitted { hedge_ratio, alpha },
        None => HedgeEstimate::Degenerate,
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn ols_coefficients(x: &[Decimal], y: &[Decimal]) -> Option<(Decimal, Decimal)> {
    if x.is_empty() || x.len() != y.len() {
        return None;
    }
    let n = Decimal::from(x.len() as u64);
    let mean_x = checked_sum(x.iter().copied())?.checked_div(n)?;
    let mean_y = checked_sum(y.iter().copied())?.checked_div(n)?;

    let mut cov = Decimal::ZERO;
    let mut var = Decimal::ZERO;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi.checked_sub(mean_x)?;
        let dy = yi.checked_sub(mean_y)?;
        cov = cov.checked_add(dx.checked_mul(dy)?)?;
        var = var.checked_add(dx.checked_mul(dx)?)?;
    }

    if var.is_zero() {
        return None;
    }

    let slope = cov.checked_div(var)?;
    let intercept = mean_y.checked_sub(slope.checked_mul(mean_x)?)?;
    Some((slope, intercept))
}

fn log_degenerate(points: &[RegressionPoint], window: usize) {
    let eligible = points.len().saturating_sub(window);
    let degenerate = points
        .iter()
        .filter(|p| p.estimate == HedgeEstimate::Degenerate)
        .count();
    debug!(eligible, degenerate, window, "rolling hedge ratio estimated");
    if eligible > 0 && degenerate == eligible {
        warn!(eligible, "every rolling window has a zero-variance predictor");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
