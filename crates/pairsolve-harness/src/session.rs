//! Paired interview sessions: runs are graded, verdicts land in the shared
//! session state and every change is broadcast to the other participant.

use std::sync::Arc;
use std::time::Duration;

use pairsolve_core::{InterviewSession, Language, Problem, SessionConfig, SessionPhase, Verdict};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::grader::{Grader, RunOutcome};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SessionEvent {
    CodeRunStatus { problem: String, running: bool },
    CodeRunResult { problem: String, verdict: Verdict },
    ProblemSwitch { index: usize, problem: String },
    InterviewPhase { phase: SessionPhase },
}

pub struct SessionCoordinator {
    grader: Arc<Grader>,
    session: Arc<Mutex<InterviewSession>>,
    events: mpsc::Sender<SessionEvent>,
    interview_delay: Duration,
    pending_phase: Mutex<Option<CancellationToken>>,
}

impl SessionCoordinator {
    pub fn new(
        grader: Arc<Grader>,
        session: InterviewSession,
        events: mpsc::Sender<SessionEvent>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            grader,
            session: Arc::new(Mutex::new(session)),
            events,
            interview_delay: Duration::from_millis(config.interview_delay_ms),
            pending_phase: Mutex::new(None),
        }
    }

    pub async fn snapshot(&self) -> InterviewSession {
        self.session.lock().await.clone()
    }

    async fn emit(&self, event: SessionEvent) {
        if self.events.send(event).await.is_err() {
            debug!("Session event dropped, no subscriber");
        }
    }

    /// Grades a run of `problem`. A run superseded by a newer run of the same
    /// problem changes nothing; the newer run reports status and verdict.
    /// Runs of different problems proceed independently.
    pub async fn run(&self, problem: &Problem, language: Language, source: &str) -> RunOutcome {
        let title = problem.title.clone();
        self.session.lock().await.mark_running(&title);
        self.emit(SessionEvent::CodeRunStatus {
            problem: title.clone(),
            running: true,
        })
        .await;

        let outcome = self.grader.run(problem, language, source).await;
        let RunOutcome::Completed(run) = &outcome else {
            return outcome;
        };

        let all_solved = {
            let mut session = self.session.lock().await;
            session.record_verdict(&title, &run.verdict) && session.all_solved()
        };
        self.emit(SessionEvent::CodeRunStatus {
            problem: title.clone(),
            running: false,
        })
        .await;
        self.emit(SessionEvent::CodeRunResult {
            problem: title,
            verdict: run.verdict.clone(),
        })
        .await;

        if all_solved {
            self.schedule_interview().await;
        }
        outcome
    }

    /// Moves the session to another problem, cancelling a pending interview
    /// transition.
    pub async fn switch_problem(&self, index: usize) -> bool {
        self.cancel_pending().await;
        let problem = {
            let mut session = self.session.lock().await;
            if !session.switch_problem(index) {
                return false;
            }
            session.current_problem().unwrap_or_default().to_string()
        };
        self.emit(SessionEvent::ProblemSwitch { index, problem }).await;
        true
    }

    pub async fn cancel_pending(&self) {
        if let Some(token) = self.pending_phase.lock().await.take() {
            token.cancel();
        }
    }

    async fn schedule_interview(&self) {
        let token = CancellationToken::new();
        if let Some(previous) = self.pending_phase.lock().await.replace(token.clone()) {
            previous.cancel();
        }

        let session = Arc::clone(&self.session);
        let events = self.events.clone();
        let delay = self.interview_delay;
        info!("All problems solved, interview phase in {}ms", delay.as_millis());

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Interview transition cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    session.lock().await.enter_interview();
                    info!("Session entered interview phase");
                    let _ = events
                        .send(SessionEvent::InterviewPhase {
                            phase: SessionPhase::Interview,
                        })
                        .await;
                }
            }
        });
    }
}
