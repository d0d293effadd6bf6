use serde_json::Value;

use super::{format_value, result_of};

/// Stationarity fields worth a one-line answer, in priority order.
const PRIORITY_KEYS: &[&str] = &["p_value", "statistic"];

/// The key answer on one line: final portfolio value and total return for a
/// backtest, otherwise the first priority field present.
pub fn render_minimal(value: &Value) -> String {
    let result = result_of(value);

    if let Some(summary) = result.get("summary") {
        let field = |k: &str| summary.get(k).map(format_value).unwrap_or_default();
        return format!(
            "{} {}%",
            field("final_portfolio_value"),
            field("total_return_pct")
        );
    }

    if let Value::Object(map) = result {
        for key in PRIORITY_KEYS {
            if let Some(val) = map.get(*key).filter(|v| !v.is_null()) {
                return format!("{}: {}", key, format_value(val));
            }
        }
        if let Some((key, val)) = map.iter().next() {
            return format!("{}: {}", key, format_value(val));
        }
    }

    format_value(result)
}
