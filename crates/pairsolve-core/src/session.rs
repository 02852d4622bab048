use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::{Verdict, VerdictStatus};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    #[default]
    Coding,
    Interview,
}

/// Where a single problem stands inside a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "status", rename_all = "snake_case")]
pub enum ProblemProgress {
    #[default]
    Unattempted,
    Running,
    Finished(VerdictStatus),
}

/// State of one paired interview session: which problems are in play, which
/// have been solved and whether the coding phase is over.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InterviewSession {
    pub problems: Vec<String>,
    pub current_index: usize,
    pub phase: SessionPhase,
    /// Score per problem title, only ever written on an accepted verdict.
    pub problem_scores: BTreeMap<String, u32>,
    #[serde(default)]
    pub progress: HashMap<String, ProblemProgress>,
}

impl InterviewSession {
    pub fn new(problems: Vec<String>) -> Self {
        Self {
            problems,
            ..Default::default()
        }
    }

    pub fn current_problem(&self) -> Option<&str> {
        self.problems.get(self.current_index).map(String::as_str)
    }

    /// Moves to another problem; the session drops back to the coding phase.
    pub fn switch_problem(&mut self, index: usize) -> bool {
        if index >= self.problems.len() {
            return false;
        }
        self.current_index = index;
        self.phase = SessionPhase::Coding;
        true
    }

    pub fn mark_running(&mut self, title: &str) {
        self.progress.insert(title.to_string(), ProblemProgress::Running);
    }

    /// Records a finished run. Returns true when the verdict newly solved or
    /// re-scored the problem.
    pub fn record_verdict(&mut self, title: &str, verdict: &Verdict) -> bool {
        self.progress
            .insert(title.to_string(), ProblemProgress::Finished(verdict.status));

        if !verdict.is_accepted() {
            return false;
        }
        self.problem_scores.insert(title.to_string(), verdict.score());
        true
    }

    pub fn progress_of(&self, title: &str) -> ProblemProgress {
        self.progress.get(title).copied().unwrap_or_default()
    }

    pub fn is_solved(&self, title: &str) -> bool {
        self.problem_scores.contains_key(title)
    }

    pub fn all_solved(&self) -> bool {
        !self.problems.is_empty() && self.problems.iter().all(|p| self.is_solved(p))
    }

    pub fn enter_interview(&mut self) {
        self.phase = SessionPhase::Interview;
    }

    pub fn total_score(&self) -> u32 {
        self.problem_scores.values().sum()
    }
}
