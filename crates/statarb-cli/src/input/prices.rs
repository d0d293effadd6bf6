use std::fs::File;
use std::io::Read;

use statarb_core::pairs::{AlignedPriceSeries, PriceBar};

use super::file::resolve_path;

/// Read aligned closes from a CSV with header `date,price_a,price_b`.
pub fn read_prices_csv(path: &str) -> Result<AlignedPriceSeries, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let file = File::open(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    parse_prices_csv(file).map_err(|e| format!("'{}': {}", canonical.display(), e).into())
}

fn parse_prices_csv<R: Read>(reader: R) -> Result<AlignedPriceSeries, Box<dyn std::error::Error>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();
    for (line, record) in rdr.deserialize::<PriceBar>().enumerate() {
        // +2: one-based, after the header
        let bar = record.map_err(|e| format!("row {}: {}", line + 2, e))?;
        bars.push(bar);
    }
    Ok(AlignedPriceSeries::new(bars)?)
}
