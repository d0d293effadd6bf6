use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatArbError {
    #[error("Invalid configuration: {field} — {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Mismatched series: {0}")]
    MismatchedSeries(String),

    #[error("Degenerate statistics: {context}")]
    DegenerateStatistics { context: String },

    #[error("Arithmetic failure at index {index} ({date}): {context}")]
    ArithmeticFailure {
        index: usize,
        date: NaiveDate,
        context: String,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for StatArbError {
    fn from(e: serde_json::Error) -> Self {
        StatArbError::SerializationError(e.to_string())
    }
}
