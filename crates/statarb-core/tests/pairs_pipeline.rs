use chrono::{Days, NaiveDate};
use pretty_assertions::assert_eq;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use statarb_core::pairs::backtest::ExitReason;
use statarb_core::pairs::{
    run_pairs_backtest, AlignedPriceSeries, BacktestSimulator, HedgeEstimate, PairsBacktestInput,
    PriceBar, SignalGenerator, SpreadPoint, SpreadSeries,
};
use statarb_core::{BacktestConfig, StatArbError};

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 7, 1).unwrap()
}

fn series(prices: &[(Decimal, Decimal)]) -> AlignedPriceSeries {
    AlignedPriceSeries::new(
        prices
            .iter()
            .enumerate()
            .map(|(i, (a, b))| PriceBar {
                date: start() + Days::new(i as u64),
                price_a: *a,
                price_b: *b,
            })
            .collect(),
    )
    .unwrap()
}

fn dec4(x: f64) -> Decimal {
    Decimal::from_f64(x).unwrap().round_dp(4)
}

/// Leg B tracks 2A + 1 with a slow oscillation and occasional spread shocks.
fn cointegrated_pair(n: usize) -> AlignedPriceSeries {
    let prices: Vec<(Decimal, Decimal)> = (0..n)
        .map(|t| {
            let tf = t as f64;
            let a = 100.0 + 10.0 * (tf / 7.0).sin() + tf / 20.0;
            let shock = match t % 37 {
                20 => 8.0,
                33 => -8.0,
                _ => 0.0,
            };
            let b = 2.0 * a + 1.0 + (tf / 5.0).sin() + shock;
            (dec4(a), dec4(b))
        })
        .collect();
    series(&prices)
}

fn config(window: usize) -> BacktestConfig {
    BacktestConfig {
        window,
        ..Default::default()
    }
}

#[test]
fn exact_linear_pair_recovers_hedge_ratio_and_alpha() {
    let prices: Vec<(Decimal, Decimal)> = (0..80)
        .map(|t| {
            let a = dec!(40) + Decimal::from((t * 5 % 9) as i64) + Decimal::from(t as i64) / dec!(3);
            (a, dec!(2) * a + dec!(1))
        })
        .collect();
    let input = PairsBacktestInput {
        config: config(25),
        prices: series(&prices),
    };
    let fitted = statarb_core::pairs::PairsPipeline::new(&input.config)
        .fit(&input.prices)
        .unwrap();

    let tol = dec!(0.000000001);
    for p in fitted.regression() {
        if p.index < 25 {
            assert_eq!(p.estimate, HedgeEstimate::Warmup);
        } else {
            assert!((p.estimate.hedge_ratio().unwrap() - dec!(2)).abs() < tol);
            assert!((p.estimate.alpha().unwrap() - dec!(1)).abs() < tol);
        }
    }
    assert_eq!(fitted.spread().len(), 55);
}

#[test]
fn constant_prices_report_degenerate_fit_and_never_trade() {
    let window = 30;
    let input = PairsBacktestInput {
        config: config(window),
        prices: series(&vec![(dec!(100), dec!(200)); window + 10]),
    };
    let out = run_pairs_backtest(&input).unwrap();
    let eligible = &out.result.regression[window..];
    assert_eq!(eligible.len(), 10);
    assert!(eligible
        .iter()
        .all(|p| p.estimate == HedgeEstimate::Degenerate));
    assert!(out.result.trades.is_empty());
    assert!(out.result.rows.iter().all(|r| r.position == 0));
    assert!(out.result.spread_statistics.is_none());
    assert!(out.warnings.iter().any(|w| w.contains("Degenerate fit")));
}

#[test]
fn manual_spread_swing_opens_and_closes_in_order() {
    // 19 spread points: zeros plus one +1 and one -1 give z = +3 and -3 exactly.
    let mut values = vec![Decimal::ZERO; 19];
    values[8] = dec!(1);
    values[10] = dec!(-1);

    let prices = vec![(dec!(100), dec!(200)); 20];
    let prices = series(&prices);
    let spread = SpreadSeries {
        points: values
            .iter()
            .enumerate()
            .map(|(k, v)| SpreadPoint {
                index: k + 1,
                date: start() + Days::new(k as u64 + 1),
                hedge_ratio: dec!(2),
                alpha: Decimal::ZERO,
                spread: *v,
            })
            .collect(),
        dropped: 0,
    };

    let cfg = config(1);
    let signals = SignalGenerator::new(&cfg).generate(&spread).unwrap();
    assert!(signals.rows[8].short_entry);
    assert!(signals.rows[9].exit);
    assert!(signals.rows[10].long_entry);
    assert!(signals.rows[11].exit);

    let report = BacktestSimulator::new(&cfg)
        .simulate(&prices, &signals)
        .unwrap();
    let positions: Vec<i8> = report.rows.iter().map(|r| r.position).collect();
    let mut expected = vec![0i8; 19];
    expected[8] = -1;
    expected[10] = 1;
    assert_eq!(positions, expected);

    let reasons: Vec<ExitReason> = report.trades.iter().map(|t| t.exit_reason).collect();
    assert_eq!(reasons, vec![ExitReason::ExitSignal, ExitReason::ExitSignal]);
    assert_eq!(report.trades[0].entry_index, 9);
    assert_eq!(report.trades[1].entry_index, 11);
}

#[test]
fn positions_follow_the_state_machine() {
    let input = PairsBacktestInput {
        config: config(30),
        prices: cointegrated_pair(400),
    };
    let out = run_pairs_backtest(&input).unwrap().result;
    assert!(!out.trades.is_empty());

    let mut prev = 0i8;
    for row in &out.rows {
        match (prev, row.position) {
            (0, 1) => assert!(row.long_entry),
            (0, -1) => assert!(row.short_entry),
            (1, -1) | (-1, 1) => panic!("position reversed at index {}", row.index),
            _ => {}
        }
        prev = row.position;
    }

    for trade in &out.trades {
        match trade.exit_reason {
            ExitReason::TakeProfit => assert!(trade.pnl >= input.config.take_profit),
            ExitReason::StopLoss => assert!(trade.pnl <= input.config.stop_loss),
            ExitReason::ExitSignal => {
                let row = out.rows.iter().find(|r| r.index == trade.exit_index).unwrap();
                assert!(row.exit_signal);
            }
            ExitReason::EndOfData => {
                assert_eq!(trade.exit_index, out.rows.last().unwrap().index)
            }
        }
    }
}

#[test]
fn portfolio_value_is_initial_cash_times_cumulative_return() {
    let input = PairsBacktestInput {
        config: config(30),
        prices: cointegrated_pair(250),
    };
    let out = run_pairs_backtest(&input).unwrap().result;
    let mut running = Decimal::ONE;
    for row in &out.rows {
        running *= Decimal::ONE + row.strategy_return;
        assert_eq!(row.cumulative_return, running);
        assert_eq!(
            row.portfolio_value,
            input.config.initial_cash * row.cumulative_return
        );
        assert_eq!(
            row.strategy_return,
            Decimal::from(row.position) * (row.return_a - row.return_b)
        );
    }
    let last = out.rows.last().unwrap();
    assert_eq!(out.summary.final_portfolio_value, last.portfolio_value);
}

#[test]
fn spread_domain_within_fitted_domain() {
    let input = PairsBacktestInput {
        config: config(45),
        prices: cointegrated_pair(200),
    };
    let out = run_pairs_backtest(&input).unwrap().result;
    let fitted = out
        .regression
        .iter()
        .filter(|p| p.estimate.is_fitted())
        .count();
    assert_eq!(out.rows.len(), fitted);
    assert_eq!(out.dropped_spread_points, 0);
    assert!(out.rows.iter().all(|r| r.index >= 45));
}

#[test]
fn pipeline_is_idempotent() {
    let input = PairsBacktestInput {
        config: config(30),
        prices: cointegrated_pair(300),
    };
    let first = run_pairs_backtest(&input).unwrap();
    let second = run_pairs_backtest(&input).unwrap();
    assert_eq!(first.result, second.result);
    assert_eq!(first.warnings, second.warnings);
}

#[test]
fn zero_price_fails_with_bar_context() {
    // Leg A prints zero on bar 40; the following bar divides by it.
    let mut prices: Vec<(Decimal, Decimal)> = (0..60)
        .map(|t| {
            let a = dec!(50) + Decimal::from((t * 3 % 7) as i64);
            (a, dec!(2) * a)
        })
        .collect();
    prices[40] = (Decimal::ZERO, dec!(500));
    let input = PairsBacktestInput {
        config: config(20),
        prices: series(&prices),
    };
    match run_pairs_backtest(&input) {
        Err(StatArbError::ArithmeticFailure { index, .. }) => assert!(index >= 40),
        other => panic!("expected arithmetic failure, got {other:?}"),
    }
}

#[test]
fn input_deserializes_with_default_config() {
    let json = r#"{
        "config": {"window": 2, "instrument_labels": {"a": "KO", "b": "PEP"}},
        "prices": [
            {"date": "2024-01-01", "price_a": 10, "price_b": 21},
            {"date": "2024-01-02", "price_a": 11, "price_b": 23},
            {"date": "2024-01-03", "price_a": 12, "price_b": 25.5}
        ]
    }"#;
    let input: PairsBacktestInput = serde_json::from_str(json).unwrap();
    assert_eq!(input.config.window, 2);
    assert_eq!(input.config.entry_z, dec!(2.0));
    assert_eq!(input.config.instrument_labels.b, "PEP");
    assert_eq!(input.prices.len(), 3);
}
