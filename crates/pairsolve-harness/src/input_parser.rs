//! Decoding of human-written example inputs such as
//! `nums = [2,7,11,15], target = 9` into ordered argument values.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

/// A comma that starts a new `name =` segment. Commas inside array literals
/// are never followed by an identifier and `=`, so they are left alone.
fn segment_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*\w+\s*=").expect("invalid segment boundary regex"))
}

fn python_true() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bTrue\b").expect("invalid True regex"))
}

fn python_false() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bFalse\b").expect("invalid False regex"))
}

/// Parses an example input into one value per `name = literal` segment, in
/// source order. Never fails: a segment whose literal is not valid JSON after
/// normalization is kept as a string.
pub fn parse_input(input: &str) -> Vec<Value> {
    if input.trim().is_empty() {
        return Vec::new();
    }
    split_segments(input)
        .into_iter()
        .map(|segment| match segment.split_once('=') {
            Some((_, literal)) => parse_literal(literal),
            None => parse_literal(segment),
        })
        .collect()
}

/// Decodes a single literal, normalizing single quotes and Python booleans.
pub fn parse_literal(literal: &str) -> Value {
    let normalized = normalize_literal(literal);
    serde_json::from_str(&normalized).unwrap_or(Value::String(normalized))
}

fn normalize_literal(literal: &str) -> String {
    let quoted = literal.trim().replace('\'', "\"");
    let trued = python_true().replace_all(&quoted, "true");
    python_false().replace_all(&trued, "false").into_owned()
}

fn split_segments(input: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    for boundary in segment_boundary().find_iter(input) {
        segments.push(&input[start..boundary.start()]);
        // skip the comma itself, the name stays with the next segment
        start = boundary.start() + 1;
    }
    segments.push(&input[start..]);
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_two_sum_input() {
        let args = parse_input("nums = [2,7,11,15], target = 9");
        assert_eq!(args, vec![json!([2, 7, 11, 15]), json!(9)]);
    }

    #[test]
    fn test_nested_arrays_keep_depth() {
        let args = parse_input("grid = [[1,1,0],[0,1,0]], k = 2");
        assert_eq!(args, vec![json!([[1, 1, 0], [0, 1, 0]]), json!(2)]);
    }

    #[test]
    fn test_quoted_commas_are_not_split() {
        let args = parse_input(r#"s = "a, b", t = "c""#);
        assert_eq!(args, vec![json!("a, b"), json!("c")]);
    }

    #[test]
    fn test_single_quotes_and_python_booleans() {
        let args = parse_input("words = ['ab','cd'], flag = True, other = False");
        assert_eq!(args, vec![json!(["ab", "cd"]), json!(true), json!(false)]);
    }

    #[test]
    fn test_unparseable_literal_falls_back_to_string() {
        let args = parse_input("head = 1->2->3, n = 2");
        assert_eq!(args, vec![json!("1->2->3"), json!(2)]);
    }

    #[test]
    fn test_bare_literal_without_name() {
        assert_eq!(parse_input("[1,2,3]"), vec![json!([1, 2, 3])]);
        assert!(parse_input("   ").is_empty());
    }

    #[test]
    fn test_parse_literal_matches_expected_outputs() {
        assert_eq!(parse_literal("[0, 1]"), json!([0, 1]));
        assert_eq!(parse_literal("True"), json!(true));
        assert_eq!(parse_literal("'abc'"), json!("abc"));
        assert_eq!(parse_literal("not json"), json!("not json"));
    }
}
