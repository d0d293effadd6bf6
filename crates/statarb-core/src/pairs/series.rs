use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::StatArbError;
use crate::types::Price;
use crate::StatArbResult;

/// Closing prices of both legs at one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub price_a: Price,
    pub price_b: Price,
}

/// Two pre-aligned, gap-free price series with strictly increasing dates.
///
/// Immutable once constructed; every pipeline stage borrows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PriceBar>", into = "Vec<PriceBar>")]
pub struct AlignedPriceSeries {
    bars: Vec<PriceBar>,
}

impl AlignedPriceSeries {
    pub fn new(bars: Vec<PriceBar>) -> StatArbResult<Self> {
        if bars.is_empty() {
            return Err(StatArbError::InsufficientData(
                "Price series is empty".into(),
            ));
        }
        for (i, pair) in bars.windows(2).enumerate() {
            if pair[1].date <= pair[0].date {
                return Err(StatArbError::MismatchedSeries(format!(
                    "Dates must be strictly increasing: {} at index {} follows {}",
                    pair[1].date,
                    i + 1,
                    pair[0].date
                )));
            }
        }
        Ok(Self { bars })
    }

    /// Zip three equal-length columns into a series.
    pub fn from_columns(
        dates: Vec<NaiveDate>,
        prices_a: Vec<Price>,
        prices_b: Vec<Price>,
    ) -> StatArbResult<Self> {
        if prices_a.len() != dates.len() || prices_b.len() != dates.len() {
            return Err(StatArbError::MismatchedSeries(format!(
                "Column lengths differ: {} dates, {} A prices, {} B prices",
                dates.len(),
                prices_a.len(),
                prices_b.len()
            )));
        }
        let bars = dates
            .into_iter()
            .zip(prices_a)
            .zip(prices_b)
            .map(|((date, price_a), price_b)| PriceBar {
                date,
                price_a,
                price_b,
            })
            .collect();
        Self::new(bars)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn get(&self, index: usize) -> Option<&PriceBar> {
        self.bars.get(index)
    }

    pub fn prices_a(&self) -> Vec<Price> {
        self.bars.iter().map(|b| b.price_a).collect()
    }

    pub fn prices_b(&self) -> Vec<Price> {
        self.bars.iter().map(|b| b.price_b).collect()
    }
}

impl TryFrom<Vec<PriceBar>> for AlignedPriceSeries {
    type Error = StatArbError;

    fn try_from(bars: Vec<PriceBar>) -> Result<Self, Self::Error> {
        Self::new(bars)
    }
}

impl From<AlignedPriceSeries> for Vec<PriceBar> {
    fn from(series: AlignedPriceSeries) -> Self {
        series.bars
    }
}
