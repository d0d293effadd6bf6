pub mod file;
pub mod prices;
pub mod stdin;

use serde::Deserialize;
use tracing::debug;

use statarb_core::pairs::{AlignedPriceSeries, PairsBacktestInput};
use statarb_core::BacktestConfig;

/// Input document: a config plus, optionally, the prices it runs on.
#[derive(Debug, Default, Deserialize)]
pub struct PairsDocument {
    #[serde(default)]
    pub config: BacktestConfig,
    #[serde(default)]
    pub prices: Option<AlignedPriceSeries>,
}

/// Assemble a backtest input from `--input`, stdin, and `--prices`.
///
/// A CSV given with `--prices` replaces any prices in the document. With only
/// `--prices`, the default configuration is used.
pub fn load_pairs_input(
    input: Option<&str>,
    prices_csv: Option<&str>,
) -> Result<PairsBacktestInput, Box<dyn std::error::Error>> {
    let document: PairsDocument = if let Some(path) = input {
        file::read_structured(path)?
    } else if let Some(document) = stdin::read_stdin()? {
        document
    } else if prices_csv.is_some() {
        PairsDocument::default()
    } else {
        return Err("--input <file.json|yaml>, --prices <file.csv>, or stdin required".into());
    };

    let series = match (prices_csv, document.prices) {
        (Some(path), _) => prices::read_prices_csv(path)?,
        (None, Some(series)) => series,
        (None, None) => {
            return Err("no prices: add a \"prices\" array to the input or pass --prices".into())
        }
    };

    debug!(bars = series.len(), window = document.config.window, "pairs input loaded");
    Ok(PairsBacktestInput {
        config: document.config,
        prices: series,
    })
}
