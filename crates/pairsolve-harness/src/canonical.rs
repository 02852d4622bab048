//! Canonical, whitespace-insensitive rendering of result values and the
//! comparison used to grade an actual result against an expected string.

use serde_json::Value;

use crate::input_parser::parse_literal;

/// Compact JSON: arrays bracketed and comma-joined with no spaces, strings
/// quoted, booleans and numbers stringified.
pub fn canonical(value: &Value) -> String {
    match value {
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(canonical).collect();
            format!("[{}]", inner.join(","))
        }
        other => other.to_string(),
    }
}

/// Removes every whitespace character.
pub fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Canonical form of a hand-written expected output.
pub fn normalize_expected(expected: &str) -> String {
    canonical(&parse_literal(expected))
}

/// Grades a canonical actual string against a hand-written expected string.
///
/// Tried in order: whitespace-stripped equality, JSON value equality
/// (so `2` matches `2.0`), order-insensitive comparison of top-level lists,
/// and case-insensitive comparison with surrounding quotes removed.
pub fn outputs_match(actual: &str, expected: &str) -> bool {
    let actual_stripped = strip_whitespace(actual);
    let expected_stripped = strip_whitespace(expected);
    if actual_stripped == expected_stripped {
        return true;
    }

    let actual_value = parse_literal(actual);
    let expected_value = parse_literal(expected);
    if values_equal(&actual_value, &expected_value) {
        return true;
    }

    if let (Value::Array(a), Value::Array(e)) = (&actual_value, &expected_value) {
        if a.len() == e.len() && sorted_canonical(a) == sorted_canonical(e) {
            return true;
        }
    }

    unquote(actual.trim()).eq_ignore_ascii_case(unquote(expected.trim()))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => (x - y).abs() < 1e-9,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (x, y) => x == y,
    }
}

fn sorted_canonical(items: &[Value]) -> Vec<String> {
    let mut rendered: Vec<String> = items.iter().map(canonical).collect();
    rendered.sort();
    rendered
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(s)
}
