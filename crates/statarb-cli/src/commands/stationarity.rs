use clap::Args;
use serde_json::Value;

use statarb_core::stationarity::{run_spread_stationarity, AugmentedDickeyFuller};

use crate::input;

/// Arguments for the spread stationarity test
#[derive(Args)]
pub struct StationarityArgs {
    /// Path to JSON or YAML input file (config and optional prices)
    #[arg(long)]
    pub input: Option<String>,

    /// CSV of aligned closes with header date,price_a,price_b
    #[arg(long)]
    pub prices: Option<String>,

    /// Lagged differences in the ADF regression
    #[arg(long, default_value_t = 1)]
    pub lags: usize,

    /// Override the rolling regression window
    #[arg(long)]
    pub window: Option<usize>,
}

pub fn run_stationarity(args: StationarityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut pairs_input = input::load_pairs_input(args.input.as_deref(), args.prices.as_deref())?;
    if let Some(window) = args.window {
        pairs_input.config.window = window;
    }
    let result = run_spread_stationarity(&pairs_input, &AugmentedDickeyFuller::new(args.lags))?;
    Ok(serde_json::to_value(result)?)
}
