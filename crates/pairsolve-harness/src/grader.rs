//! One run end to end: driver synthesis, sandbox call, interpretation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use pairsolve_core::{ExecutionResult, Language, Problem, SandboxConfig, Verdict};
use serde::Serialize;
use tracing::{debug, info};

use crate::adapters::{AdapterRegistry, DriverProgram};
use crate::interpreter::{interpret, interpret_legacy};
use crate::piston::{PistonClient, Sandbox, SandboxError};
use crate::signature::Unsupported;

/// Strictly increasing run tokens, tracked per problem. Only the most
/// recently issued token of a problem is current, so a slow run that
/// resolves after a newer run of the same problem was started is dropped
/// instead of overwriting the newer result. Runs of other problems never
/// supersede each other.
#[derive(Debug, Default)]
pub struct RunTickets {
    next: AtomicU64,
    latest: Mutex<HashMap<String, u64>>,
}

impl RunTickets {
    fn latest(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        // The map is only ever written whole-entry, a poisoned guard is still consistent.
        self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn issue(&self, problem: &str) -> u64 {
        let ticket = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest().insert(problem.to_string(), ticket);
        ticket
    }

    pub fn is_current(&self, problem: &str, ticket: u64) -> bool {
        self.latest().get(problem) == Some(&ticket)
    }
}

/// What will be sent to the sandbox for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreparedRun {
    Driver(DriverProgram),
    /// No driver could be built; the raw source runs as-is and is graded
    /// against the problem's stored output.
    Fallback { reason: Unsupported },
}

#[derive(Debug, Clone, Serialize)]
pub struct GradedRun {
    pub ticket: u64,
    pub language: Language,
    /// Entry point the driver called, absent on the fallback path.
    pub callable: Option<String>,
    pub verdict: Verdict,
    pub execution: ExecutionResult,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum RunOutcome {
    Completed(GradedRun),
    Superseded { ticket: u64 },
}

impl RunOutcome {
    pub fn verdict(&self) -> Option<&Verdict> {
        match self {
            RunOutcome::Completed(run) => Some(&run.verdict),
            RunOutcome::Superseded { .. } => None,
        }
    }
}

pub struct Grader {
    registry: Arc<AdapterRegistry>,
    sandbox: Arc<dyn Sandbox>,
    timeout: Duration,
    tickets: RunTickets,
}

impl Grader {
    pub fn new(registry: Arc<AdapterRegistry>, sandbox: Arc<dyn Sandbox>, timeout: Duration) -> Self {
        Self {
            registry,
            sandbox,
            timeout,
            tickets: RunTickets::default(),
        }
    }

    /// Grader backed by the Piston API described in `config`.
    pub fn from_config(config: &SandboxConfig) -> Self {
        Self::new(
            Arc::new(AdapterRegistry::new()),
            Arc::new(PistonClient::new(config.clone())),
            Duration::from_millis(config.timeout_ms),
        )
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn prepare(&self, problem: &Problem, language: Language, source: &str) -> PreparedRun {
        match self
            .registry
            .synthesize_driver(language, source, problem.starter(language), &problem.examples)
        {
            Ok(program) => PreparedRun::Driver(program),
            Err(reason) => {
                info!("Falling back to output matching for {}: {}", problem.title, reason);
                PreparedRun::Fallback { reason }
            }
        }
    }

    /// Sandbox call raced against the configured timeout. Every failure is
    /// folded into an unsuccessful [`ExecutionResult`].
    pub async fn execute(&self, language: Language, source: &str) -> ExecutionResult {
        let timeout_ms = self.timeout.as_millis() as u64;
        match tokio::time::timeout(self.timeout, self.sandbox.execute(language, source)).await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                info!("Sandbox call for {} failed: {}", language, err);
                err.into()
            }
            Err(_) => SandboxError::Timeout(timeout_ms).into(),
        }
    }

    /// Runs `source` against every example of `problem`.
    pub async fn run(&self, problem: &Problem, language: Language, source: &str) -> RunOutcome {
        let ticket = self.tickets.issue(&problem.title);
        let prepared = self.prepare(problem, language, source);

        let start = Instant::now();
        let (callable, execution) = match &prepared {
            PreparedRun::Driver(program) => (
                Some(program.callable.clone()),
                self.execute(language, &program.source).await,
            ),
            PreparedRun::Fallback { .. } => (None, self.execute(language, source).await),
        };
        let runtime_ms = start.elapsed().as_millis() as u64;

        if !self.tickets.is_current(&problem.title, ticket) {
            debug!("Dropping stale run {} for {}", ticket, problem.title);
            return RunOutcome::Superseded { ticket };
        }

        let verdict = match prepared {
            PreparedRun::Driver(_) => interpret(&execution, runtime_ms),
            PreparedRun::Fallback { .. } => {
                interpret_legacy(&execution, problem.legacy_expected(language), runtime_ms)
            }
        };
        info!(
            "{} ({}): {} {}/{} in {}ms",
            problem.title, language, verdict.status, verdict.passed, verdict.total, runtime_ms
        );

        RunOutcome::Completed(GradedRun {
            ticket,
            language,
            callable,
            verdict,
            execution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tickets_only_latest_is_current() {
        let tickets = RunTickets::default();
        let first = tickets.issue("Two Sum");
        let second = tickets.issue("Two Sum");
        assert!(second > first);
        assert!(!tickets.is_current("Two Sum", first));
        assert!(tickets.is_current("Two Sum", second));
    }

    #[test]
    fn test_tickets_are_tracked_per_problem() {
        let tickets = RunTickets::default();
        let two_sum = tickets.issue("Two Sum");
        let anagram = tickets.issue("Valid Anagram");
        assert!(tickets.is_current("Two Sum", two_sum));
        assert!(tickets.is_current("Valid Anagram", anagram));
        assert!(!tickets.is_current("Valid Anagram", two_sum));
        assert!(!tickets.is_current("Three Sum", two_sum));
    }
}
