use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Instrument prices. Wraps Decimal to prevent accidental f64 usage.
pub type Price = Decimal;

/// Monetary values (cash, portfolio value).
pub type Money = Decimal;

/// Rates and returns expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Numeric precision of the whole pipeline.
pub const DECIMAL_PRECISION: &str = "rust_decimal_128bit";

/// Precision of outputs whose statistics leave `Decimal` for `f64`.
pub const F64_BOUNDARY_PRECISION: &str = "rust_decimal_128bit inputs; f64 test statistics";

/// Envelope around every run: the result plus how it was computed, the
/// configuration it ran with, and any caveats worth surfacing to a reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    /// The configuration the run used, serialised
    pub assumptions: serde_json::Value,
    /// Degenerate fits, dropped spread values, look-ahead caveats
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

impl<T: Serialize> ComputationOutput<T> {
    /// Replace the recorded precision, e.g. for results computed in `f64`.
    pub fn with_precision(mut self, precision: &str) -> Self {
        self.metadata.precision = precision.to_string();
        self
    }
}

/// Wrap a result with timing, the serialised configuration, and warnings.
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: DECIMAL_PRECISION.to_string(),
        },
    }
}
