use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{format_cell, is_cell, result_of};

/// Render an analysis envelope as tables.
///
/// Headline figures come first, then one table per breakdown map
/// (allocations, window) and per list of records (funds, weights,
/// findings). Per-fund cash flow detail is left to the JSON output.
pub fn print_table(value: &Value) {
    let result = result_of(value);

    match result {
        Value::Object(map) if map.contains_key("performance") && map.contains_key("diversification") => {
            for section in ["performance", "diversification"] {
                if let Some(Value::Object(inner)) = map.get(section) {
                    println!("== {} ==", section);
                    print_section(inner);
                }
            }
            if let Some(Value::Array(narratives)) = map.get("narratives") {
                print_records("narratives", narratives);
            }
        }
        Value::Object(map) => print_section(map),
        Value::Array(arr) => print_records("results", arr),
        other => println!("{}", format_cell(other)),
    }

    if let Value::Object(envelope) = value {
        print_envelope_notes(envelope);
    }
}

fn print_section(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        if key != "warnings" && is_cell(val) {
            builder.push_record([key.as_str(), &format_cell(val)]);
        }
    }
    println!("{}", Table::from(builder));

    for (key, val) in map {
        match val {
            Value::Object(inner) if !inner.is_empty() => print_breakdown(key, inner),
            Value::Array(records) if records.iter().any(Value::is_object) => {
                print_records(key, records)
            }
            _ => {}
        }
    }
}

/// A name → value map, such as an allocation, as two columns.
fn print_breakdown(title: &str, map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Bucket", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_cell(val)]);
    }
    println!("\n{}:", title);
    println!("{}", Table::from(builder));
}

/// One row per record; nested columns are dropped.
fn print_records(title: &str, records: &[Value]) {
    println!("\n{}:", title);
    let Some(Value::Object(first)) = records.first() else {
        println!("(empty)");
        return;
    };

    let headers: Vec<String> = first
        .iter()
        .filter(|(_, v)| is_cell(v))
        .map(|(k, _)| k.clone())
        .collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);

    for item in records {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(h.as_str()).map(format_cell).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }
    }
    println!("{}", Table::from(builder));
}

fn print_envelope_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}
