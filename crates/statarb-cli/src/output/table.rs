use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{format_value, result_of};

/// Headline summary fields, in display order.
const SUMMARY_FIELDS: &[&str] = &[
    "initial_cash",
    "final_portfolio_value",
    "total_return_pct",
    "closed_trades",
    "win_rate",
    "max_drawdown",
    "sharpe_ratio",
    "bars",
];

const TRADE_COLUMNS: &[&str] = &[
    "side",
    "entry_date",
    "exit_date",
    "holding_bars",
    "entry_z",
    "exit_z",
    "pnl",
    "exit_reason",
];

/// Render output as tables: the backtest summary and trade ledger, or the
/// flattened result fields, followed by warnings and methodology.
pub fn render_table(value: &Value) -> String {
    let result = result_of(value);
    let mut out = match result.get("summary").and_then(Value::as_object) {
        Some(summary) => backtest_tables(result, summary),
        None => field_table(result),
    };

    if let Some(Value::Array(warnings)) = value.get("warnings") {
        if !warnings.is_empty() {
            out.push_str("\nWarnings:\n");
            for w in warnings.iter().filter_map(Value::as_str) {
                out.push_str(&format!("  - {}\n", w));
            }
        }
    }
    if let Some(Value::String(meth)) = value.get("methodology") {
        out.push_str(&format!("\nMethodology: {}\n", meth));
    }
    out
}

fn backtest_tables(result: &Value, summary: &Map<String, Value>) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    if let Some(pair) = result.get("instruments") {
        let label = |k: &str| pair.get(k).map(format_value).unwrap_or_default();
        builder.push_record(["instruments".to_string(), format!("{}/{}", label("a"), label("b"))]);
    }
    for key in ["window", "degenerate_fits", "dropped_spread_points"] {
        if let Some(v) = result.get(key) {
            builder.push_record([key, &format_value(v)]);
        }
    }
    if let Some(stats) = result.get("spread_statistics") {
        for key in ["mean", "std_dev"] {
            if let Some(v) = stats.get(key) {
                builder.push_record([format!("spread_{}", key), format_value(v)]);
            }
        }
    }
    for key in SUMMARY_FIELDS {
        if let Some(v) = summary.get(*key) {
            builder.push_record([*key, &format_value(v)]);
        }
    }
    let mut out = format!("{}\n", Table::from(builder));

    if let Some(Value::Array(trades)) = result.get("trades") {
        if !trades.is_empty() {
            let mut ledger = Builder::default();
            ledger.push_record(TRADE_COLUMNS.iter().copied());
            for trade in trades {
                ledger.push_record(
                    TRADE_COLUMNS
                        .iter()
                        .map(|c| trade.get(*c).map(format_value).unwrap_or_default()),
                );
            }
            out.push_str(&format!("\nTrades:\n{}\n", Table::from(ledger)));
        }
    }
    out
}

fn field_table(result: &Value) -> String {
    let mut rows = Vec::new();
    flatten("", result, &mut rows);
    let mut builder = Builder::default();
    builder.push_record(["Field".to_string(), "Value".to_string()]);
    for row in rows {
        builder.push_record([row.0, row.1]);
    }
    format!("{}\n", Table::from(builder))
}

/// Nested objects become dotted keys, e.g. `critical_values.5%`.
fn flatten(prefix: &str, value: &Value, rows: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(&path, val, rows);
            }
        }
        _ => rows.push((prefix.to_string(), format_value(value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_backtest_summary_and_trades() {
        let value = json!({
            "result": {
                "instruments": {"a": "PG", "b": "XLP"},
                "window": 90,
                "summary": {"final_portfolio_value": "104250.50", "closed_trades": 3},
                "trades": [{"side": "long_spread", "pnl": "0.061", "exit_reason": "take_profit"}],
                "rows": [{"index": 90}]
            },
            "warnings": ["Z-scores use whole-history spread mean"],
            "methodology": "Rolling OLS"
        });
        let out = render_table(&value);
        assert!(out.contains("PG/XLP"));
        assert!(out.contains("104250.50"));
        assert!(out.contains("Trades:"));
        assert!(out.contains("take_profit"));
        assert!(out.contains("  - Z-scores use whole-history spread mean"));
        assert!(out.contains("Methodology: Rolling OLS"));
        assert!(!out.contains("rows"));
    }

    #[test]
    fn test_flattened_fields() {
        let mut rows = Vec::new();
        flatten(
            "",
            &json!({"statistic": -3.9, "critical_values": {"5%": -2.87}}),
            &mut rows,
        );
        assert!(rows.contains(&("statistic".to_string(), "-3.9".to_string())));
        assert!(rows.contains(&("critical_values.5%".to_string(), "-2.87".to_string())));
    }
}
