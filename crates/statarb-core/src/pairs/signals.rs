use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::spread::SpreadSeries;
use super::stats::{mean, sample_std_dev};
use crate::config::BacktestConfig;
use crate::error::StatArbError;
use crate::StatArbResult;

/// Whole-history statistics of the spread used to normalise it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadStatistics {
    pub mean: Decimal,
    /// Sample standard deviation (n - 1)
    pub std_dev: Decimal,
    pub count: usize,
}

/// Z-score and entry/exit predicates for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalRow {
    pub index: usize,
    pub date: NaiveDate,
    pub hedge_ratio: Decimal,
    pub alpha: Decimal,
    pub spread: Decimal,
    pub zscore: Decimal,
    pub long_entry: bool,
    pub short_entry: bool,
    pub exit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSet {
    pub statistics: SpreadStatistics,
    pub rows: Vec<SignalRow>,
}

/// Per-bar signal predicates from a globally normalised spread.
#[derive(Debug, Clone, Copy)]
pub struct SignalGenerator {
    entry_z: Decimal,
    exit_z: Decimal,
}

impl SignalGenerator {
    pub fn new(config: &BacktestConfig) -> Self {
        Self {
            entry_z: config.entry_z,
            exit_z: config.exit_z,
        }
    }

    pub fn with_thresholds(entry_z: Decimal, exit_z: Decimal) -> StatArbResult<Self> {
        if entry_z <= Decimal::ZERO {
            return Err(StatArbError::InvalidConfiguration {
                field: "entry_z".into(),
                reason: "Entry z-score must be positive".into(),
            });
        }
        if exit_z <= Decimal::ZERO {
            return Err(StatArbError::InvalidConfiguration {
                field: "exit_z".into(),
                reason: "Exit z-score must be positive".into(),
            });
        }
        Ok(Self { entry_z, exit_z })
    }

    /// (long_entry, short_entry, exit) for a z-score.
    pub fn classify(&self, z: Decimal) -> (bool, bool, bool) {
        (z < -self.entry_z, z > self.entry_z, z.abs() < self.exit_z)
    }

    /// Normalise the whole spread once, then classify every bar.
    ///
    /// Mean and standard deviation come from the complete series, so later
    /// spread values influence the z-score of earlier bars.
    pub fn generate(&self, spread: &SpreadSeries) -> StatArbResult<SignalSet> {
        let values = spread.values();
        match values.len() {
            0 => {
                return Err(StatArbError::InsufficientData(
                    "No spread observations to normalise".into(),
                ))
            }
            1 => {
                warn!("single spread observation; z-score undefined");
                return Err(StatArbError::DegenerateStatistics {
                    context: "sample standard deviation of a single spread value is undefined; \
                              z-score undefined"
                        .into(),
                });
            }
            _ => {}
        }

        let m = mean(&values).ok_or_else(|| StatArbError::DegenerateStatistics {
            context: "spread mean overflowed".into(),
        })?;
        let std_dev =
            sample_std_dev(&values, m).ok_or_else(|| StatArbError::DegenerateStatistics {
                context: "spread variance overflowed".into(),
            })?;
        if std_dev.is_zero() {
            warn!(count = values.len(), "spread is constant; z-score undefined");
            return Err(StatArbError::DegenerateStatistics {
                context: format!(
                    "spread standard deviation is zero over {} observations; z-score undefined",
                    values.len()
                ),
            });
        }

        let mut rows = Vec::with_capacity(values.len());
        for p in &spread.points {
            let zscore = p
                .spread
                .checked_sub(m)
                .and_then(|d| d.checked_div(std_dev))
                .ok_or_else(|| StatArbError::ArithmeticFailure {
                    index: p.index,
                    date: p.date,
                    context: format!("z-score of spread {} overflowed", p.spread),
                })?;
            let (long_entry, short_entry, exit) = self.classify(zscore);
            rows.push(SignalRow {
                index: p.index,
                date: p.date,
                hedge_ratio: p.hedge_ratio,
                alpha: p.alpha,
                spread: p.spread,
                zscore,
                long_entry,
                short_entry,
                exit,
            });
        }

        let statistics = SpreadStatistics {
            mean: m,
            std_dev,
            count: values.len(),
        };
        debug!(
            count = statistics.count,
            mean = %statistics.mean,
            std_dev = %statistics.std_dev,
            "signals generated"
        );
        Ok(SignalSet { statistics, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairs::spread::SpreadPoint;
    use crate::pairs::stats;
    use rust_decimal_macros::dec;

    fn spread_of(values: &[Decimal]) -> SpreadSeries {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        SpreadSeries {
            points: values
                .iter()
                .enumerate()
                .map(|(i, v)| SpreadPoint {
                    index: i + 10,
                    date: start + chrono::Days::new(i as u64),
                    hedge_ratio: dec!(1),
                    alpha: Decimal::ZERO,
                    spread: *v,
                })
                .collect(),
            dropped: 0,
        }
    }

    fn generator() -> SignalGenerator {
        SignalGenerator::with_thresholds(dec!(2.0), dec!(0.5)).unwrap()
    }

    #[test]
    fn test_zscore_normalised() {
        let values: Vec<Decimal> = (0..50)
            .map(|i| Decimal::from((i * 13 % 17) as i64) - dec!(8) + Decimal::from(i as i64) / dec!(10))
            .collect();
        let out = generator().generate(&spread_of(&values)).unwrap();
        let z: Vec<Decimal> = out.rows.iter().map(|r| r.zscore).collect();
        let zm = stats::mean(&z).unwrap();
        let zs = stats::sample_std_dev(&z, zm).unwrap();
        assert!(zm.abs() < dec!(0.000000001));
        assert!((zs - Decimal::ONE).abs() < dec!(0.000000001));
        assert_eq!(out.statistics.count, 50);
    }

    #[test]
    fn test_classify_thresholds() {
        let g = generator();
        assert_eq!(g.classify(dec!(-2.1)), (true, false, false));
        assert_eq!(g.classify(dec!(2.1)), (false, true, false));
        assert_eq!(g.classify(dec!(0.4)), (false, false, true));
        assert_eq!(g.classify(dec!(-0.4)), (false, false, true));
        // strict inequalities at the boundaries
        assert_eq!(g.classify(dec!(2.0)), (false, false, false));
        assert_eq!(g.classify(dec!(-2.0)), (false, false, false));
        assert_eq!(g.classify(dec!(0.5)), (false, false, false));
    }

    #[test]
    fn test_long_and_short_never_both_true() {
        let g = generator();
        for i in -50..=50 {
            let (long, short, _) = g.classify(Decimal::from(i) / dec!(10));
            assert!(!(long && short));
        }
    }

    #[test]
    fn test_constant_spread_reported() {
        let err = generator()
            .generate(&spread_of(&[dec!(1.5); 20]))
            .unwrap_err();
        assert!(matches!(err, StatArbError::DegenerateStatistics { .. }));
    }

    #[test]
    fn test_single_spread_value_is_degenerate() {
        let err = generator().generate(&spread_of(&[dec!(1)])).unwrap_err();
        assert!(matches!(err, StatArbError::DegenerateStatistics { .. }));
    }

    #[test]
    fn test_empty_spread_is_insufficient() {
        let err = generator().generate(&spread_of(&[])).unwrap_err();
        assert!(matches!(err, StatArbError::InsufficientData(_)));
    }

    #[test]
    fn test_rows_keep_spread_domain() {
        let out = generator()
            .generate(&spread_of(&[dec!(1), dec!(2), dec!(3)]))
            .unwrap();
        let idx: Vec<usize> = out.rows.iter().map(|r| r.index).collect();
        assert_eq!(idx, vec![10, 11, 12]);
        // mean 2, sample std 1
        assert!((out.rows[0].zscore + Decimal::ONE).abs() < dec!(0.000000001));
        assert!((out.rows[2].zscore - Decimal::ONE).abs() < dec!(0.000000001));
        assert!(out.rows[1].exit);
    }

    #[test]
    fn test_non_positive_thresholds_rejected() {
        assert!(SignalGenerator::with_thresholds(dec!(0), dec!(0.5)).is_err());
        assert!(SignalGenerator::with_thresholds(dec!(2), dec!(-0.5)).is_err());
    }
}
