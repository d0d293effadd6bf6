use serde_json::Value;
use std::io;

use super::{format_value, result_of};

/// Backtest row columns, in bar-record order.
const ROW_COLUMNS: &[&str] = &[
    "index",
    "date",
    "price_a",
    "price_b",
    "hedge_ratio",
    "alpha",
    "spread",
    "zscore",
    "long_entry",
    "short_entry",
    "exit_signal",
    "position",
    "return_a",
    "return_b",
    "strategy_return",
    "cumulative_return",
    "portfolio_value",
];

/// Write output as CSV to stdout: one line per backtest bar, or field/value
/// pairs for results without rows.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    if let Err(e) = write_csv(value, stdout.lock()) {
        eprintln!("CSV write error: {}", e);
    }
}

fn write_csv<W: io::Write>(value: &Value, out: W) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    let result = result_of(value);

    match result.get("rows") {
        Some(Value::Array(rows)) => {
            wtr.write_record(ROW_COLUMNS)?;
            for row in rows {
                let record: Vec<String> = ROW_COLUMNS
                    .iter()
                    .map(|c| row.get(*c).map(format_value).unwrap_or_default())
                    .collect();
                wtr.write_record(&record)?;
            }
        }
        _ => {
            wtr.write_record(["field", "value"])?;
            if let Value::Object(map) = result {
                for (key, val) in map {
                    wtr.write_record([key.as_str(), &format_value(val)])?;
                }
            } else {
                wtr.write_record(["value", &format_value(result)])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(value: &Value) -> String {
        let mut buf = Vec::new();
        write_csv(value, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_rows_written_in_column_order() {
        let value = json!({
            "result": {
                "rows": [{
                    "portfolio_value": "100000",
                    "index": 90,
                    "date": "2024-05-01",
                    "position": -1,
                    "short_entry": true
                }]
            }
        });
        let out = render(&value);
        let mut lines = out.lines();
        assert!(lines.next().unwrap().starts_with("index,date,price_a"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("90,2024-05-01,"));
        assert!(row.ends_with(",100000"));
        assert!(row.contains(",true,"));
        assert!(row.contains(",-1,"));
    }

    #[test]
    fn test_result_without_rows_is_field_value() {
        let value = json!({"result": {"p_value": 0.03, "lags": 1}});
        let out = render(&value);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "field,value");
        assert!(lines.contains(&"lags,1"));
        assert!(lines.contains(&"p_value,0.03"));
    }
}
