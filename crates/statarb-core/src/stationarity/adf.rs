use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::collections::BTreeMap;
use tracing::debug;

use super::{StationarityReport, StationarityTest};
use crate::error::StatArbError;
use crate::StatArbResult;

// ---------------------------------------------------------------------------
// MacKinnon response surfaces (constant, single series)
// ---------------------------------------------------------------------------

/// Approximate p-value surface, MacKinnon (1994).
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

/// Finite-sample critical values, MacKinnon (2010): c0 + c1/T + c2/T^2 + c3/T^3.
const CRITICAL_SURFACE: [(&str, [f64; 4]); 3] = [
    ("1%", [-3.43035, -6.5393, -16.786, -79.433]),
    ("5%", [-2.86154, -2.8903, -4.234, -40.04]),
    ("10%", [-2.56677, -1.5384, -2.809, 0.0]),
];

// ---------------------------------------------------------------------------
// Test
// ---------------------------------------------------------------------------

/// Augmented Dickey-Fuller test with a constant and a fixed number of lagged
/// differences.
///
/// Regression: ds_t = c + gamma * s_{t-1} + sum_i b_i * ds_{t-i} + e_t.
/// The statistic is the t-ratio of gamma; more negative means stronger
/// evidence of mean reversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AugmentedDickeyFuller {
    pub lags: usize,
}

impl AugmentedDickeyFuller {
    pub fn new(lags: usize) -> Self {
        Self { lags }
    }
}

impl StationarityTest for AugmentedDickeyFuller {
    fn test(&self, series: &[Decimal]) -> StatArbResult<StationarityReport> {
        let y: Vec<f64> = series
            .iter()
            .map(|v| v.to_f64())
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(|| StatArbError::DegenerateStatistics {
                context: "series value not representable as f64".into(),
            })?;

        let p = self.lags;
        let k = 2 + p;
        let nobs = y.len().saturating_sub(1 + p);
        if nobs <= k {
            return Err(StatArbError::InsufficientData(format!(
                "ADF with {} lags needs more than {} usable observations, got {}",
                p, k, nobs
            )));
        }

        let dy: Vec<f64> = y.windows(2).map(|w| w[1] - w[0]).collect();

        // Design rows: [1, s_{t-1}, ds_{t-1}, ..., ds_{t-p}]
        let mut xtx = vec![vec![0.0; k]; k];
        let mut xty = vec![0.0; k];
        let mut rows: Vec<(Vec<f64>, f64)> = Vec::with_capacity(nobs);
        for j in p..dy.len() {
            let mut x = Vec::with_capacity(k);
            x.push(1.0);
            x.push(y[j]);
            for lag in 1..=p {
                x.push(dy[j - lag]);
            }
            for r in 0..k {
                xty[r] += x[r] * dy[j];
                for c in 0..k {
                    xtx[r][c] += x[r] * x[c];
                }
            }
            rows.push((x, dy[j]));
        }

        let inv = invert(xtx).ok_or_else(|| StatArbError::DegenerateStatistics {
            context: "ADF design matrix is singular".into(),
        })?;
        let beta: Vec<f64> = (0..k)
            .map(|r| (0..k).map(|c| inv[r][c] * xty[c]).sum())
            .collect();

        let ssr: f64 = rows
            .iter()
            .map(|(x, target)| {
                let fitted: f64 = x.iter().zip(&beta).map(|(xi, bi)| xi * bi).sum();
                (target - fitted).powi(2)
            })
            .sum();
        let sigma2 = ssr / (nobs - k) as f64;
        let se_gamma = (sigma2 * inv[1][1]).sqrt();
        if !se_gamma.is_finite() || se_gamma <= 0.0 {
            return Err(StatArbError::DegenerateStatistics {
                context: "ADF residual variance is zero; the series is perfectly explained".into(),
            });
        }

        let statistic = beta[1] / se_gamma;
        let p_value = mackinnon_p_value(statistic)?;
        let critical_values = critical_values(nobs);
        debug!(statistic, p_value, nobs, lags = p, "ADF test computed");

        Ok(StationarityReport {
            statistic,
            p_value,
            lags: p,
            nobs,
            critical_values,
        })
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Approximate asymptotic p-value of a Dickey-Fuller tau statistic.
fn mackinnon_p_value(stat: f64) -> StatArbResult<f64> {
    if stat > TAU_MAX {
        return Ok(1.0);
    }
    if stat < TAU_MIN {
        return Ok(0.0);
    }
    let z = if stat <= TAU_STAR {
        polyval(&TAU_SMALL_P, stat)
    } else {
        polyval(&TAU_LARGE_P, stat)
    };
    let normal = Normal::new(0.0, 1.0).map_err(|e| StatArbError::DegenerateStatistics {
        context: format!("standard normal unavailable: {e}"),
    })?;
    Ok(normal.cdf(z))
}

fn critical_values(nobs: usize) -> BTreeMap<String, f64> {
    let inv_t = 1.0 / nobs as f64;
    CRITICAL_SURFACE
        .iter()
        .map(|(level, coef)| (level.to_string(), polyval(coef, inv_t)))
        .collect()
}

/// c0 + c1*x + c2*x^2 + ...
fn polyval(coef: &[f64], x: f64) -> f64 {
    coef.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Gauss-Jordan inverse with partial pivoting. `None` when singular.
fn invert(mut a: Vec<Vec<f64>>) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let mut inv: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();
    let scale = a
        .iter()
        .flatten()
        .fold(0.0_f64, |m, v| m.max(v.abs()))
        .max(1.0);

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() <= 1e-12 * scale {
            return None;
        }
        a.swap(col, pivot);
        inv.swap(col, pivot);

        let d = a[col][col];
        for j in 0..n {
            a[col][j] /= d;
            inv[col][j] /= d;
        }
        for row in 0..n {
            if row != col {
                let f = a[row][col];
                if f != 0.0 {
                    for j in 0..n {
                        a[row][j] -= f * a[col][j];
                        inv[row][j] -= f * inv[col][j];
                    }
                }
            }
        }
    }
    Some(inv)
}
