use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::backtest::{BacktestRow, ExitReason, PairTrade};
use super::stats::{mean, sample_std_dev};
use crate::error::StatArbError;
use crate::types::{Money, Rate};
use crate::StatArbResult;

/// Bars per year used to annualise the Sharpe ratio.
const BARS_PER_YEAR: u32 = 252;

/// Headline numbers of a backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub initial_cash: Money,
    /// Portfolio value on the last bar (initial cash when there are no bars)
    pub final_portfolio_value: Money,
    /// (final / initial - 1) * 100
    pub total_return_pct: Decimal,
    /// Round trips closed by take-profit, stop-loss, or exit signal
    pub closed_trades: usize,
    /// Fraction of closed trades with positive PnL
    pub win_rate: Rate,
    /// Largest peak-to-trough decline of portfolio value, as a fraction
    pub max_drawdown: Rate,
    /// mean / std of strategy returns * sqrt(252)
    pub sharpe_ratio: Decimal,
    pub bars: usize,
}

impl PerformanceSummary {
    /// Summarise a simulated path. Overflow anywhere in the summary is an
    /// `ArithmeticFailure` on the last bar.
    pub fn from_backtest(
        rows: &[BacktestRow],
        trades: &[PairTrade],
        initial_cash: Money,
    ) -> StatArbResult<Self> {
        let overflow = |context: &str| match rows.last() {
            Some(last) => StatArbError::ArithmeticFailure {
                index: last.index,
                date: last.date,
                context: context.into(),
            },
            None => StatArbError::DegenerateStatistics {
                context: context.into(),
            },
        };

        let final_portfolio_value = rows
            .last()
            .map(|r| r.portfolio_value)
            .unwrap_or(initial_cash);
        let total_return_pct = if initial_cash.is_zero() {
            Decimal::ZERO
        } else {
            final_portfolio_value
                .checked_div(initial_cash)
                .and_then(|r| r.checked_sub(Decimal::ONE))
                .and_then(|r| r.checked_mul(dec!(100)))
                .ok_or_else(|| overflow("total return percentage overflowed"))?
        };

        let closed: Vec<&PairTrade> = trades
            .iter()
            .filter(|t| t.exit_reason != ExitReason::EndOfData)
            .collect();
        let wins = closed.iter().filter(|t| t.pnl > Decimal::ZERO).count();
        let win_rate = if closed.is_empty() {
            Decimal::ZERO
        } else {
            Decimal::from(wins as u64) / Decimal::from(closed.len() as u64)
        };

        let returns: Vec<Rate> = rows.iter().map(|r| r.strategy_return).collect();
        let values: Vec<Money> = rows.iter().map(|r| r.portfolio_value).collect();

        let max_drawdown = compute_max_drawdown(initial_cash, &values)
            .ok_or_else(|| overflow("maximum drawdown overflowed"))?;
        let sharpe_ratio =
            compute_sharpe(&returns).ok_or_else(|| overflow("Sharpe ratio overflowed"))?;

        Ok(Self {
            initial_cash,
            final_portfolio_value,
            total_return_pct,
            closed_trades: closed.len(),
            win_rate,
            max_drawdown,
            sharpe_ratio,
            bars: rows.len(),
        })
    }
}

/// Annualised Sharpe ratio from per-bar returns. Zero when undefined,
/// `None` on overflow.
fn compute_sharpe(returns: &[Rate]) -> Option<Decimal> {
    if returns.len() < 2 {
        return Some(Decimal::ZERO);
    }
    let m = mean(returns)?;
    let std = sample_std_dev(returns, m)?;
    if std.is_zero() {
        return Some(Decimal::ZERO);
    }
    let annualiser = Decimal::from(BARS_PER_YEAR)
        .sqrt()
        .unwrap_or(Decimal::ONE);
    m.checked_div(std)?.checked_mul(annualiser)
}

/// Maximum drawdown of a value path starting from `start`. `None` on overflow.
fn compute_max_drawdown(start: Money, values: &[Money]) -> Option<Decimal> {
    let mut peak = start;
    let mut max_dd = Decimal::ZERO;

    for v in values {
        if *v > peak {
            peak = *v;
        }
        if peak > Decimal::ZERO {
            let dd = peak.checked_sub(*v)?.checked_div(peak)?;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    Some(max_dd)
}
