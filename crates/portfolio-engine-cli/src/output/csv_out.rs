use serde_json::{Map, Value};
use std::io;

use super::{format_cell, is_cell, result_of};

/// Write output as CSV to stdout.
///
/// Record lists (per-fund results, fund weights) become one row per
/// record. Otherwise the result's flat fields become `field,value` rows.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = result_of(value);
    let result = result.get("performance").unwrap_or(result);

    match result {
        Value::Object(map) => {
            if let Some(records) = primary_records(map) {
                write_records(&mut wtr, records);
            } else {
                write_fields(&mut wtr, map);
            }
        }
        Value::Array(arr) => write_records(&mut wtr, arr),
        other => {
            let _ = wtr.write_record([&format_cell(other)]);
        }
    }

    let _ = wtr.flush();
}

/// Per-fund rows, when the result has them.
fn primary_records(map: &Map<String, Value>) -> Option<&[Value]> {
    ["funds", "fund_weights"].iter().find_map(|key| match map.get(*key) {
        Some(Value::Array(arr)) if !arr.is_empty() && arr.iter().all(Value::is_object) => {
            Some(arr.as_slice())
        }
        _ => None,
    })
}

fn write_fields<W: io::Write>(wtr: &mut csv::Writer<W>, map: &Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in map {
        if is_cell(val) {
            let _ = wtr.write_record([key.as_str(), &format_cell(val)]);
        } else if let Value::Object(inner) = val {
            // Breakdown maps flatten to "map.bucket" rows.
            for (bucket, v) in inner {
                let _ = wtr.write_record([format!("{key}.{bucket}"), format_cell(v)]);
            }
        }
    }
}

fn write_records<W: io::Write>(wtr: &mut csv::Writer<W>, records: &[Value]) {
    let Some(Value::Object(first)) = records.first() else {
        for item in records {
            let _ = wtr.write_record([&format_cell(item)]);
        }
        return;
    };

    let headers: Vec<&str> = first
        .iter()
        .filter(|(_, v)| is_cell(v))
        .map(|(k, _)| k.as_str())
        .collect();
    let _ = wtr.write_record(&headers);

    for item in records {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(format_cell).unwrap_or_default())
                .collect();
            let _ = wtr.write_record(&row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(value: &Value) -> String {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        match result_of(value) {
            Value::Object(map) => match primary_records(map) {
                Some(records) => write_records(&mut wtr, records),
                None => write_fields(&mut wtr, map),
            },
            _ => unreachable!(),
        }
        String::from_utf8(wtr.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_fund_rows_skip_nested_columns() {
        let v = json!({"result": {"funds": [
            {"fund_name": "A", "current_value": "120", "cashflows": [{"amount": "1"}]}
        ]}});
        assert_eq!(render(&v), "current_value,fund_name\n120,A\n");
    }

    #[test]
    fn test_breakdown_maps_flatten() {
        let v = json!({"result": {"fund_count": 2, "asset_allocation": {"Debt": "40", "Equity": "60"}}});
        assert_eq!(
            render(&v),
            "field,value\nasset_allocation.Debt,40\nasset_allocation.Equity,60\nfund_count,2\n"
        );
    }
}
