use clap::Args;
use serde_json::Value;

use statarb_core::pairs::run_pairs_backtest;

use crate::input;

/// Arguments for the pairs backtest
#[derive(Args)]
pub struct BacktestArgs {
    /// Path to JSON or YAML input file (config and optional prices)
    #[arg(long)]
    pub input: Option<String>,

    /// CSV of aligned closes with header date,price_a,price_b
    #[arg(long)]
    pub prices: Option<String>,

    /// Override the rolling regression window
    #[arg(long)]
    pub window: Option<usize>,

    /// Apply the previous bar's position to each bar's return
    #[arg(long)]
    pub lag_positions: bool,
}

pub fn run_backtest(args: BacktestArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut pairs_input = input::load_pairs_input(args.input.as_deref(), args.prices.as_deref())?;
    if let Some(window) = args.window {
        pairs_input.config.window = window;
    }
    if args.lag_positions {
        pairs_input.config.lag_positions = true;
    }
    let result = run_pairs_backtest(&pairs_input)?;
    Ok(serde_json::to_value(result)?)
}
