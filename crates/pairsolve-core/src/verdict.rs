use std::fmt;

use serde::{Deserialize, Serialize};

/// Raw response of one sandbox call, already flattened from the HTTP payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(default)]
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            stderr: None,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            stderr: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerdictStatus {
    Accepted,
    WrongAnswer,
    RuntimeError,
    FormatError,
}

impl VerdictStatus {
    pub fn label(&self) -> &'static str {
        match self {
            VerdictStatus::Accepted => "Accepted",
            VerdictStatus::WrongAnswer => "Wrong Answer",
            VerdictStatus::RuntimeError => "Runtime Error",
            VerdictStatus::FormatError => "Format Error",
        }
    }
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseResult {
    pub id: u32,
    pub passed: bool,
    #[serde(default)]
    pub actual: String,
    #[serde(default)]
    pub expected: String,
    #[serde(default)]
    pub input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Structured outcome of one run against all examples of a problem.
///
/// When `cases` is populated, `passed` and `total` are derived from it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub passed: u32,
    pub total: u32,
    pub cases: Vec<CaseResult>,
    pub runtime_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Verdict {
    /// Builds a verdict from per-case results, deriving the counters and status.
    pub fn from_cases(cases: Vec<CaseResult>, runtime_ms: u64) -> Self {
        let total = cases.len() as u32;
        let passed = cases.iter().filter(|c| c.passed).count() as u32;
        let status = match passed == total {
            true => VerdictStatus::Accepted,
            false => VerdictStatus::WrongAnswer,
        };
        Self {
            status,
            passed,
            total,
            cases,
            runtime_ms,
            error: None,
        }
    }

    /// A verdict with no case breakdown.
    pub fn bare(status: VerdictStatus, runtime_ms: u64, error: Option<String>) -> Self {
        Self {
            status,
            passed: 0,
            total: 0,
            cases: Vec::new(),
            runtime_ms,
            error,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == VerdictStatus::Accepted
    }

    /// Percentage score recorded for a solved problem.
    pub fn score(&self) -> u32 {
        match self.total {
            0 => 100,
            total => ((self.passed as f64 / total as f64) * 100.0).round() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(id: u32, passed: bool) -> CaseResult {
        CaseResult {
            id,
            passed,
            ..Default::default()
        }
    }

    #[test]
    fn test_from_cases_derives_counters() {
        let v = Verdict::from_cases(vec![case(0, true), case(1, false), case(2, true)], 12);
        assert_eq!(v.passed, 2);
        assert_eq!(v.total, 3);
        assert_eq!(v.status, VerdictStatus::WrongAnswer);
        assert_eq!(v.score(), 67);

        let v = Verdict::from_cases(vec![case(0, true)], 3);
        assert!(v.is_accepted());
        assert_eq!(v.score(), 100);
    }

    #[test]
    fn test_bare_verdict_has_no_cases() {
        let v = Verdict::bare(VerdictStatus::FormatError, 0, Some("raw".into()));
        assert!(v.cases.is_empty());
        assert_eq!(v.total, 0);
        assert_eq!(v.score(), 100);
    }

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&VerdictStatus::WrongAnswer).unwrap();
        assert_eq!(json, "\"wrong-answer\"");
        assert_eq!(VerdictStatus::FormatError.to_string(), "Format Error");
    }
}
