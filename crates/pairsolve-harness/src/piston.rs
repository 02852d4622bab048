use async_trait::async_trait;
use pairsolve_core::{ExecutionResult, Language, SandboxConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const STDERR_SEPARATOR: &str = "\n--- Stderr ---\n";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SandboxError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("HTTP error! status: {0}")]
    Status(u16),

    #[error("Failed to execute code: {0}")]
    Transport(String),

    #[error("Malformed sandbox response: {0}")]
    Malformed(String),

    #[error("Execution timed out after {0}ms")]
    Timeout(u64),
}

impl From<SandboxError> for ExecutionResult {
    fn from(err: SandboxError) -> Self {
        ExecutionResult::failed(err.to_string())
    }
}

/// Remote code execution: submit one source file, get its output back.
#[async_trait]
pub trait Sandbox: Send + Sync {
    async fn execute(&self, language: Language, source: &str) -> Result<ExecutionResult, SandboxError>;
}

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    language: &'a str,
    version: &'a str,
    files: Vec<SourceFile<'a>>,
}

#[derive(Debug, Serialize)]
struct SourceFile<'a> {
    name: &'a str,
    content: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct StageResult {
    #[serde(default)]
    stdout: Option<String>,
    #[serde(default)]
    stderr: String,
    #[serde(default)]
    output: String,
    #[serde(default)]
    code: Option<i64>,
}

impl StageResult {
    /// Piston's `output` interleaves stdout and stderr; `stdout` alone is
    /// preferred so stderr is not reported twice.
    fn stdout(&self) -> &str {
        self.stdout.as_deref().unwrap_or(&self.output)
    }

    fn failed(&self) -> bool {
        self.code.is_some_and(|code| code != 0)
    }
}

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    run: StageResult,
    #[serde(default)]
    compile: Option<StageResult>,
}

impl From<ExecuteResponse> for ExecutionResult {
    fn from(response: ExecuteResponse) -> Self {
        if let Some(compile) = response.compile.as_ref().filter(|c| c.failed()) {
            let message = match compile.output.trim().is_empty() {
                true => compile.stderr.clone(),
                false => compile.output.clone(),
            };
            return ExecutionResult::failed(message);
        }

        let stdout = response.run.stdout().to_string();
        let stderr = response.run.stderr;
        if !stderr.is_empty() && stdout.is_empty() {
            return ExecutionResult {
                success: false,
                output: stdout,
                stderr: Some(stderr.clone()),
                error: Some(stderr),
            };
        }

        match stderr.is_empty() {
            true => ExecutionResult::ok(stdout),
            false => ExecutionResult {
                success: true,
                output: format!("{stdout}{STDERR_SEPARATOR}{stderr}"),
                stderr: Some(stderr),
                error: None,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct PistonClient {
    config: SandboxConfig,
    client: reqwest::Client,
}

impl PistonClient {
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }
}

#[async_trait]
impl Sandbox for PistonClient {
    async fn execute(&self, language: Language, source: &str) -> Result<ExecutionResult, SandboxError> {
        let runtime = self
            .config
            .runtime(language)
            .ok_or_else(|| SandboxError::UnsupportedLanguage(language.id().to_string()))?;

        let url = format!("{}/execute", self.config.base_url.trim_end_matches('/'));
        let request = ExecuteRequest {
            language: &runtime.language,
            version: &runtime.version,
            files: vec![SourceFile {
                name: &runtime.file_name,
                content: source,
            }],
        };
        debug!(
            "Submitting {} bytes to {} {}",
            source.len(),
            runtime.language,
            runtime.version
        );

        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SandboxError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            warn!("Sandbox returned {}", resp.status());
            return Err(SandboxError::Status(resp.status().as_u16()));
        }

        let body: ExecuteResponse = resp
            .json()
            .await
            .map_err(|e| SandboxError::Malformed(e.to_string()))?;

        Ok(body.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> ExecutionResult {
        serde_json::from_str::<ExecuteResponse>(json).unwrap().into()
    }

    #[test]
    fn test_stdout_only() {
        let result = response(r#"{"run":{"stdout":"ok\n","stderr":"","output":"ok\n","code":0}}"#);
        assert_eq!(result, ExecutionResult::ok("ok\n"));
    }

    #[test]
    fn test_stderr_is_appended_to_output() {
        let result = response(
            r#"{"run":{"stdout":"[0,1]","stderr":"warning","output":"[0,1]warning","code":0}}"#,
        );
        assert!(result.success);
        assert_eq!(result.output, "[0,1]\n--- Stderr ---\nwarning");
        assert_eq!(result.stderr.as_deref(), Some("warning"));
    }

    #[test]
    fn test_stderr_without_stdout_fails() {
        let result = response(r#"{"run":{"stdout":"","stderr":"Traceback","output":"Traceback","code":1}}"#);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Traceback"));
    }

    #[test]
    fn test_compile_failure() {
        let result = response(
            r#"{"compile":{"stdout":"","stderr":"main.c:1: error","output":"main.c:1: error","code":1},"run":{"stdout":"","stderr":"","output":"","code":null}}"#,
        );
        assert_eq!(result, ExecutionResult::failed("main.c:1: error"));
    }

    #[test]
    fn test_successful_compile_is_ignored() {
        let result = response(
            r#"{"compile":{"stdout":"","stderr":"","output":"","code":0},"run":{"stdout":"hi","stderr":"","output":"hi","code":0}}"#,
        );
        assert_eq!(result, ExecutionResult::ok("hi"));
    }

    #[test]
    fn test_output_field_used_without_stdout() {
        let result = response(r#"{"run":{"output":"legacy","stderr":""}}"#);
        assert_eq!(result.output, "legacy");
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(SandboxError::Status(429).to_string(), "HTTP error! status: 429");
        assert_eq!(
            SandboxError::UnsupportedLanguage("kotlin".into()).to_string(),
            "Unsupported language: kotlin"
        );
        assert_eq!(
            ExecutionResult::from(SandboxError::Timeout(10_000)).error.as_deref(),
            Some("Execution timed out after 10000ms")
        );
    }

    #[tokio::test]
    async fn test_missing_runtime_is_unsupported() {
        let mut config = SandboxConfig::default();
        config.runtimes.remove(&Language::Go);
        let client = PistonClient::new(config);
        let err = client.execute(Language::Go, "package main").await.unwrap_err();
        assert_eq!(err, SandboxError::UnsupportedLanguage("go".into()));
    }
}
