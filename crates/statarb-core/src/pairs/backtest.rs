use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span};

use super::performance::PerformanceSummary;
use super::series::AlignedPriceSeries;
use super::signals::{SignalRow, SignalSet};
use crate::config::BacktestConfig;
use crate::error::StatArbError;
use crate::types::{Money, Price, Rate};
use crate::StatArbResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Direction of an open spread position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpreadSide {
    /// Long leg A, short leg B (position +1)
    LongSpread,
    /// Short leg A, long leg B (position -1)
    ShortSpread,
}

impl SpreadSide {
    pub fn position(self) -> i8 {
        match self {
            SpreadSide::LongSpread => 1,
            SpreadSide::ShortSpread => -1,
        }
    }
}

/// Prices recorded on the bar a position opened.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryPrices {
    pub index: usize,
    pub date: NaiveDate,
    pub price_a: Price,
    pub price_b: Price,
    pub zscore: Decimal,
}

/// Simulator state between bars. Non-flat states carry their entry prices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PositionState {
    Flat,
    LongSpread(EntryPrices),
    ShortSpread(EntryPrices),
}

impl PositionState {
    /// Position value: +1 long spread, -1 short spread, 0 flat.
    pub fn position(&self) -> i8 {
        self.open_position().map_or(0, |(side, _)| side.position())
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }

    /// Side and entry prices of an open position.
    pub fn open_position(&self) -> Option<(SpreadSide, EntryPrices)> {
        match self {
            PositionState::Flat => None,
            PositionState::LongSpread(entry) => Some((SpreadSide::LongSpread, *entry)),
            PositionState::ShortSpread(entry) => Some((SpreadSide::ShortSpread, *entry)),
        }
    }

    fn open(side: SpreadSide, entry: EntryPrices) -> Self {
        match side {
            SpreadSide::LongSpread => PositionState::LongSpread(entry),
            SpreadSide::ShortSpread => PositionState::ShortSpread(entry),
        }
    }
}

/// Why an open position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    ExitSignal,
    /// Still open on the last bar; reported, not forced flat
    EndOfData,
}

/// One bar of input to the transition function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalBar {
    pub index: usize,
    pub date: NaiveDate,
    pub price_a: Price,
    pub price_b: Price,
    pub zscore: Decimal,
    pub long_entry: bool,
    pub short_entry: bool,
    pub exit: bool,
}

/// Trade-level profit/loss thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitThresholds {
    pub take_profit: Rate,
    pub stop_loss: Rate,
}

/// What happened on a bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TransitionEvent {
    Hold,
    Opened { side: SpreadSide },
    Closed {
        side: SpreadSide,
        entry: EntryPrices,
        reason: ExitReason,
        pnl: Rate,
    },
}

/// Result of applying one bar to a state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub next: PositionState,
    pub event: TransitionEvent,
}

impl Transition {
    /// Position recorded for the bar: the state after the transition.
    pub fn recorded_position(&self) -> i8 {
        self.next.position()
    }
}

/// A closed (or end-of-data) round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairTrade {
    pub side: SpreadSide,
    pub entry_index: usize,
    pub entry_date: NaiveDate,
    pub exit_index: usize,
    pub exit_date: NaiveDate,
    pub entry_price_a: Price,
    pub entry_price_b: Price,
    pub exit_price_a: Price,
    pub exit_price_b: Price,
    /// Trade PnL as a fraction of entry prices
    pub pnl: Rate,
    pub holding_bars: usize,
    pub entry_z: Decimal,
    pub exit_z: Decimal,
    pub exit_reason: ExitReason,
}

/// Per-bar simulation output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRow {
    pub index: usize,
    pub date: NaiveDate,
    pub price_a: Price,
    pub price_b: Price,
    pub hedge_ratio: Decimal,
    pub alpha: Decimal,
    pub spread: Decimal,
    pub zscore: Decimal,
    pub long_entry: bool,
    pub short_entry: bool,
    pub exit_signal: bool,
    pub position: i8,
    pub return_a: Rate,
    pub return_b: Rate,
    pub strategy_return: Rate,
    pub cumulative_return: Decimal,
    pub portfolio_value: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub rows: Vec<BacktestRow>,
    pub trades: Vec<PairTrade>,
    pub summary: PerformanceSummary,
}

// ---------------------------------------------------------------------------
// Transition function
// ---------------------------------------------------------------------------

/// Pure per-bar state transition.
///
/// From flat, a long entry takes precedence over a short entry. From an open
/// position, the bar either closes it or holds; no entry is evaluated on the
/// bar a position closes.
pub fn transition(
    state: &PositionState,
    bar: &SignalBar,
    thresholds: &ExitThresholds,
) -> StatArbResult<Transition> {
    match state {
        PositionState::Flat => {
            let side = if bar.long_entry {
                Some(SpreadSide::LongSpread)
            } else if bar.short_entry {
                Some(SpreadSide::ShortSpread)
            } else {
                None
            };
            Ok(match side {
                Some(side) => Transition {
                    next: PositionState::open(side, entry_from(bar)),
                    event: TransitionEvent::Opened { side },
                },
                None => Transition {
                    next: PositionState::Flat,
                    event: TransitionEvent::Hold,
                },
            })
        }
        PositionState::LongSpread(entry) => {
            close_or_hold(SpreadSide::LongSpread, entry, *state, bar, thresholds)
        }
        PositionState::ShortSpread(entry) => {
            close_or_hold(SpreadSide::ShortSpread, entry, *state, bar, thresholds)
        }
    }
}

/// Trade PnL of an open position marked at the bar's prices.
///
/// Long spread: (A/A0 - 1) - (B/B0 - 1). Short spread: the negation.
pub fn trade_pnl(side: SpreadSide, entry: &EntryPrices, bar: &SignalBar) -> StatArbResult<Rate> {
    let leg_a = leg_return(bar.price_a, entry.price_a, bar, "leg A entry price is zero")?;
    let leg_b = leg_return(bar.price_b, entry.price_b, bar, "leg B entry price is zero")?;
    let pnl = match side {
        SpreadSide::LongSpread => leg_a - leg_b,
        SpreadSide::ShortSpread => leg_b - leg_a,
    };
    Ok(pnl)
}

fn close_or_hold(
    side: SpreadSide,
    entry: &EntryPrices,
    state: PositionState,
    bar: &SignalBar,
    thresholds: &ExitThresholds,
) -> StatArbResult<Transition> {
    let pnl = trade_pnl(side, entry, bar)?;
    let reason = if pnl >= thresholds.take_profit {
        Some(ExitReason::TakeProfit)
    } else if pnl <= thresholds.stop_loss {
        Some(ExitReason::StopLoss)
    } else if bar.exit {
        Some(ExitReason::ExitSignal)
    } else {
        None
    };
    Ok(match reason {
        Some(reason) => Transition {
            next: PositionState::Flat,
            event: TransitionEvent::Closed {
                side,
                entry: *entry,
                reason,
                pnl,
            },
        },
        None => Transition {
            next: state,
            event: TransitionEvent::Hold,
        },
    })
}

fn leg_return(
    current: Price,
    base: Price,
    bar: &SignalBar,
    context: &str,
) -> StatArbResult<Rate> {
    current
        .checked_div(base)
        .and_then(|r| r.checked_sub(Decimal::ONE))
        .ok_or_else(|| StatArbError::ArithmeticFailure {
            index: bar.index,
            date: bar.date,
            context: format!("{context} (base {base}, current {current})"),
        })
}

fn entry_from(bar: &SignalBar) -> EntryPrices {
    EntryPrices {
        index: bar.index,
        date: bar.date,
        price_a: bar.price_a,
        price_b: bar.price_b,
        zscore: bar.zscore,
    }
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

/// Left-to-right fold of [`transition`] over the signal domain, with
/// per-bar return accounting.
#[derive(Debug, Clone, Copy)]
pub struct BacktestSimulator {
    initial_cash: Money,
    thresholds: ExitThresholds,
    lag_positions: bool,
}

impl BacktestSimulator {
    pub fn new(config: &BacktestConfig) -> Self {
        Self {
            initial_cash: config.initial_cash,
            thresholds: ExitThresholds {
                take_profit: config.take_profit,
                stop_loss: config.stop_loss,
            },
            lag_positions: config.lag_positions,
        }
    }

    pub fn thresholds(&self) -> ExitThresholds {
        self.thresholds
    }

    pub fn simulate(
        &self,
        series: &AlignedPriceSeries,
        signals: &SignalSet,
    ) -> StatArbResult<BacktestReport> {
        let _span = info_span!("simulate", bars = signals.rows.len()).entered();

        let mut state = PositionState::Flat;
        let mut cumulative = Decimal::ONE;
        let mut prev_position: i8 = 0;
        let mut prev_index: Option<usize> = None;
        let mut prev_bar: Option<SignalBar> = None;
        let mut rows = Vec::with_capacity(signals.rows.len());
        let mut trades = Vec::new();

        for signal in &signals.rows {
            if prev_index.is_some_and(|p| signal.index <= p) {
                return Err(StatArbError::MismatchedSeries(format!(
                    "Signal indices must be strictly increasing; {} follows {:?}",
                    signal.index, prev_index
                )));
            }
            prev_index = Some(signal.index);

            let bar = signal_bar(series, signal)?;
            let step = transition(&state, &bar, &self.thresholds)?;
            if let TransitionEvent::Closed {
                side,
                entry,
                reason,
                pnl,
            } = step.event
            {
                trades.push(close_trade(side, &entry, &bar, reason, pnl));
            }
            state = step.next;
            let position = step.recorded_position();

            let (return_a, return_b) = match &prev_bar {
                Some(prior) => bar_returns(prior, &bar)?,
                None => (Decimal::ZERO, Decimal::ZERO),
            };
            let applied = if self.lag_positions {
                prev_position
            } else {
                position
            };
            let strategy_return = Decimal::from(applied) * (return_a - return_b);
            cumulative = cumulative
                .checked_mul(Decimal::ONE + strategy_return)
                .ok_or_else(|| overflow(&bar, "cumulative return overflowed"))?;
            let portfolio_value = self
                .initial_cash
                .checked_mul(cumulative)
                .ok_or_else(|| overflow(&bar, "portfolio value overflowed"))?;

            rows.push(BacktestRow {
                index: bar.index,
                date: bar.date,
                price_a: bar.price_a,
                price_b: bar.price_b,
                hedge_ratio: signal.hedge_ratio,
                alpha: signal.alpha,
                spread: signal.spread,
                zscore: signal.zscore,
                long_entry: signal.long_entry,
                short_entry: signal.short_entry,
                exit_signal: signal.exit,
                position,
                return_a,
                return_b,
                strategy_return,
                cumulative_return: cumulative,
                portfolio_value,
            });
            prev_position = position;
            prev_bar = Some(bar);
        }

        if let (Some((side, entry)), Some(last)) = (state.open_position(), signals.rows.last()) {
            let bar = signal_bar(series, last)?;
            let pnl = trade_pnl(side, &entry, &bar)?;
            trades.push(close_trade(side, &entry, &bar, ExitReason::EndOfData, pnl));
        }

        debug!(rows = rows.len(), trades = trades.len(), "backtest simulated");
        let summary = PerformanceSummary::from_backtest(&rows, &trades, self.initial_cash)?;
        Ok(BacktestReport {
            rows,
            trades,
            summary,
        })
    }
}

fn signal_bar(series: &AlignedPriceSeries, signal: &SignalRow) -> StatArbResult<SignalBar> {
    let price = series.get(signal.index).ok_or_else(|| {
        StatArbError::MismatchedSeries(format!(
            "Signal index {} is outside the price series ({} bars)",
            signal.index,
            series.len()
        ))
    })?;
    if price.date != signal.date {
        return Err(StatArbError::MismatchedSeries(format!(
            "Signal date {} does not match price date {} at index {}",
            signal.date, price.date, signal.index
        )));
    }
    Ok(SignalBar {
        index: signal.index,
        date: signal.date,
        price_a: price.price_a,
        price_b: price.price_b,
        zscore: signal.zscore,
        long_entry: signal.long_entry,
        short_entry: signal.short_entry,
        exit: signal.exit,
    })
}

/// Simple returns of both legs from the preceding bar of the signal domain.
/// The first domain bar has no prior and earns nothing.
fn bar_returns(prior: &SignalBar, bar: &SignalBar) -> StatArbResult<(Rate, Rate)> {
    let ra = leg_return(bar.price_a, prior.price_a, bar, "prior leg A price is zero")?;
    let rb = leg_return(bar.price_b, prior.price_b, bar, "prior leg B price is zero")?;
    Ok((ra, rb))
}

fn close_trade(
    side: SpreadSide,
    entry: &EntryPrices,
    bar: &SignalBar,
    reason: ExitReason,
    pnl: Rate,
) -> PairTrade {
    PairTrade {
        side,
        entry_index: entry.index,
        entry_date: entry.date,
        exit_index: bar.index,
        exit_date: bar.date,
        entry_price_a: entry.price_a,
        entry_price_b: entry.price_b,
        exit_price_a: bar.price_a,
        exit_price_b: bar.price_b,
        pnl,
        holding_bars: bar.index - entry.index,
        entry_z: entry.zscore,
        exit_z: bar.zscore,
        exit_reason: reason,
    }
}

fn overflow(bar: &SignalBar, context: &str) -> StatArbError {
    StatArbError::ArithmeticFailure {
        index: bar.index,
        date: bar.date,
        context: context.into(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
