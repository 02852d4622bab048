//! Turns raw sandbox output into a [`Verdict`].

use pairsolve_core::{CaseResult, ExecutionResult, Verdict, VerdictStatus};
use serde::Deserialize;
use serde_json::Value;

use crate::canonical::{canonical, outputs_match};

const SUMMARY_KEYS: [&str; 2] = [r#"{"stats":"#, r#"{ "stats":"#];
const RAW_OUTPUT_PREVIEW: usize = 300;

#[derive(Debug, Deserialize)]
struct RawStats {
    #[serde(default)]
    passed: u32,
    #[serde(default)]
    total: u32,
}

/// Case entries are read leniently: an entry that only carries `error` is as
/// valid as a full one, and non-string values are kept in canonical form.
#[derive(Debug, Default, Deserialize)]
struct RawCase {
    #[serde(default)]
    id: Option<u32>,
    #[serde(default)]
    passed: bool,
    #[serde(default)]
    actual: Option<Value>,
    #[serde(default)]
    expected: Option<Value>,
    #[serde(default)]
    input: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawSummary {
    stats: RawStats,
    results: Vec<RawCase>,
    #[serde(default)]
    error: Option<String>,
}

fn text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(canonical(&other)),
    }
}

impl RawCase {
    fn into_case(self, index: usize) -> CaseResult {
        CaseResult {
            id: self.id.unwrap_or(index as u32),
            passed: self.passed,
            actual: text(self.actual).unwrap_or_default(),
            expected: text(self.expected).unwrap_or_default(),
            input: text(self.input).unwrap_or_default(),
            error: text(self.error),
        }
    }
}

/// Finds the harness summary in arbitrary program output: first at the
/// summary key, then as any whole line holding both `stats` and `results`,
/// scanning from the end.
fn find_summary(output: &str) -> Option<RawSummary> {
    for key in SUMMARY_KEYS {
        let Some(start) = output.find(key) else {
            continue;
        };
        let mut stream = serde_json::Deserializer::from_str(&output[start..]).into_iter::<RawSummary>();
        if let Some(Ok(summary)) = stream.next() {
            return Some(summary);
        }
    }

    output.lines().rev().find_map(|line| {
        let value: Value = serde_json::from_str(line.trim()).ok()?;
        if value.get("stats").is_none() || value.get("results").is_none() {
            return None;
        }
        serde_json::from_value(value).ok()
    })
}

fn failure_text(result: &ExecutionResult) -> String {
    result
        .error
        .clone()
        .or_else(|| result.stderr.clone().filter(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| "Execution failed".to_string())
}

fn raw_output_preview(output: &str) -> String {
    if output.is_empty() {
        return "No Output".to_string();
    }
    output.chars().take(RAW_OUTPUT_PREVIEW).collect()
}

/// A failed case is re-checked with the shared comparison so every language
/// gets the same tolerance, e.g. `2` against `2.0` or reordered lists.
fn regrade(mut case: CaseResult) -> CaseResult {
    if !case.passed && case.error.is_none() && outputs_match(&case.actual, &case.expected) {
        case.passed = true;
    }
    case
}

/// Verdict for a run of a synthesized driver program.
pub fn interpret(result: &ExecutionResult, runtime_ms: u64) -> Verdict {
    if !result.success {
        return Verdict::bare(VerdictStatus::RuntimeError, runtime_ms, Some(failure_text(result)));
    }

    let output = result.output.trim();
    let Some(summary) = find_summary(output) else {
        tracing::warn!("Driver output had no test summary ({} bytes)", output.len());
        return Verdict::bare(
            VerdictStatus::FormatError,
            runtime_ms,
            Some(format!(
                "Could not parse test results. Raw Output:\n{}",
                raw_output_preview(output)
            )),
        );
    };

    if summary.results.is_empty() {
        let error = summary.error.unwrap_or_else(|| {
            format!(
                "Harness reported {} of {} passing but no test cases",
                summary.stats.passed, summary.stats.total
            )
        });
        return Verdict::bare(VerdictStatus::RuntimeError, runtime_ms, Some(error));
    }

    if summary.stats.total as usize != summary.results.len() {
        tracing::debug!(
            "Summary reports {} cases but lists {}",
            summary.stats.total,
            summary.results.len()
        );
    }

    let cases = summary
        .results
        .into_iter()
        .enumerate()
        .map(|(i, raw)| regrade(raw.into_case(i)))
        .collect();
    Verdict::from_cases(cases, runtime_ms)
}

/// Verdict for raw source run without a driver. A stored expected output
/// must appear somewhere in the program output; without one any output
/// counts as a pass.
pub fn interpret_legacy(result: &ExecutionResult, expected: Option<&str>, runtime_ms: u64) -> Verdict {
    if !result.success {
        return Verdict::bare(VerdictStatus::RuntimeError, runtime_ms, Some(failure_text(result)));
    }

    let output = result.output.trim();
    let passed = match expected {
        Some(expected) => output.contains(expected.trim()),
        None => !output.is_empty(),
    };
    let status = match passed {
        true => VerdictStatus::Accepted,
        false => VerdictStatus::WrongAnswer,
    };
    Verdict::bare(status, runtime_ms, None)
}
