//! Best-effort conversion of loosely typed profile values.
//!
//! Profiles arrive with numbers spelled as strings, scalars where lists are
//! expected, and percent suffixes on plain numbers. Everything in this module
//! is pure and total: unparsable input degrades to `None` or an empty list,
//! and the caller decides which default to substitute.

use serde_json::Value;

/// Parse a value as a float.
///
/// Strings tolerate surrounding whitespace, a trailing `%`, and a comma
/// decimal separator. `null`, booleans, and containers yield `None`.
pub fn coerce_float(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim().trim_end_matches('%').replace(',', ".");
            s.trim().parse::<f64>().ok()
        }
        _ => None,
    }
}

/// Parse a value as an integer, rounding floats to the nearest whole number.
pub fn coerce_int(v: &Value) -> Option<i64> {
    coerce_float(v).map(|f| f.round() as i64)
}

/// Tolerate profiles that express single values as scalars: `null` becomes an
/// empty list, a scalar becomes a single-element list, a list is unchanged.
pub fn as_list(v: &Value) -> Vec<Value> {
    match v {
        Value::Null => Vec::new(),
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

/// Render a value as its canonical string form: integers without a decimal
/// point, other numbers in their shortest float form, booleans as `"1"` /
/// `"0"`, strings unchanged.
pub fn canonical_string(v: &Value) -> String {
    match v {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => n.as_f64().map(canonical_float).unwrap_or_else(|| n.to_string()),
        },
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Shortest decimal form of a float; whole-numbered values drop the `.0`.
pub fn canonical_float(x: f64) -> String {
    if x.fract() == 0.0 && x.abs() < i64::MAX as f64 {
        format!("{}", x as i64)
    } else {
        format!("{}", x)
    }
}

/// Coerce a scalar-or-list value into a list of canonical strings, dropping
/// `null` entries.
pub fn string_list(v: &Value) -> Vec<String> {
    as_list(v)
        .iter()
        .filter(|v| !v.is_null())
        .map(canonical_string)
        .collect()
}
