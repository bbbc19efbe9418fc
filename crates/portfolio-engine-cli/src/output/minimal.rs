use serde_json::Value;

use super::{format_cell, result_of};

/// Headline figures, most specific first.
const PRIORITY_KEYS: [&str; 6] = [
    "xirr",
    "internal_rate_of_return",
    "cagr",
    "absolute_return_percent",
    "current_value",
    "concentration_hhi",
];

/// Print just the key answer from the output.
///
/// Combined analyses answer with the performance section.
pub fn print_minimal(value: &Value) {
    let result = result_of(value);
    let result = result.get("performance").unwrap_or(result);
    println!("{}", minimal_answer(result));
}

fn minimal_answer(result: &Value) -> String {
    let Value::Object(map) = result else {
        return format_cell(result);
    };

    // Skip nulls: an unavailable XIRR falls through to CAGR and so on.
    for key in PRIORITY_KEYS {
        if let Some(val) = map.get(key) {
            if !val.is_null() {
                return format_cell(val);
            }
        }
    }

    match map.iter().find(|(_, v)| super::is_scalar(v)) {
        Some((key, val)) => format!("{}: {}", key, format_cell(val)),
        None => "null".to_string(),
    }
}
