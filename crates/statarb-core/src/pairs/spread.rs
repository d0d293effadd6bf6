use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::hedge_ratio::RegressionPoint;
use super::series::AlignedPriceSeries;
use crate::error::StatArbError;
use crate::StatArbResult;

/// Residual of leg B against the fitted combination of leg A at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadPoint {
    pub index: usize,
    pub date: NaiveDate,
    pub hedge_ratio: Decimal,
    pub alpha: Decimal,
    pub spread: Decimal,
}

/// Spread points in bar order. Bars without a fit, or whose spread
/// overflowed, are absent rather than stored as placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadSeries {
    pub points: Vec<SpreadPoint>,
    /// Fitted bars whose spread could not be represented
    pub dropped: usize,
}

impl SpreadSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<Decimal> {
        self.points.iter().map(|p| p.spread).collect()
    }
}

pub struct SpreadCalculator;

impl SpreadCalculator {
    /// spread[t] = B[t] - (hedge_ratio[t] * A[t] + alpha[t])
    pub fn calculate(
        series: &AlignedPriceSeries,
        regression: &[RegressionPoint],
    ) -> StatArbResult<SpreadSeries> {
        if regression.len() != series.len() {
            return Err(StatArbError::MismatchedSeries(format!(
                "Regression has {} points but the price series has {} bars",
                regression.len(),
                series.len()
            )));
        }

        let mut points = Vec::with_capacity(regression.len());
        let mut dropped = 0usize;

        for (point, bar) in regression.iter().zip(series.bars()) {
            if point.date != bar.date {
                return Err(StatArbError::MismatchedSeries(format!(
                    "Regression date {} does not match price date {} at index {}",
                    point.date, bar.date, point.index
                )));
            }
            let (Some(hedge_ratio), Some(alpha)) =
                (point.estimate.hedge_ratio(), point.estimate.alpha())
            else {
                continue;
            };

            match residual(bar.price_a, bar.price_b, hedge_ratio, alpha) {
                Some(spread) => points.push(SpreadPoint {
                    index: point.index,
                    date: point.date,
                    hedge_ratio,
                    alpha,
                    spread,
                }),
                None => {
                    debug!(index = point.index, "spread overflowed; bar dropped");
                    dropped += 1;
                }
            }
        }

        debug!(points = points.len(), dropped, "spread calculated");
        Ok(SpreadSeries { points, dropped })
    }
}

fn residual(a: Decimal, b: Decimal, hedge_ratio: Decimal, alpha: Decimal) -> Option<Decimal> {
    let fitted = hedge_ratio.checked_mul(a)?.checked_add(alpha)?;
    b.checked_sub(fitted)
}
