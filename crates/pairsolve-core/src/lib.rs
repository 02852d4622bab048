// Domain modules
pub mod code;
pub mod config;
pub mod error;
pub mod session;
pub mod verdict;

pub use code::{Difficulty, Example, Language, Problem, ProblemSet};
pub use config::{CatalogConfig, PairSolveConfig, RuntimeSpec, SandboxConfig, SessionConfig};
pub use error::{PairSolveError, Result};
pub use session::{InterviewSession, ProblemProgress, SessionPhase};
pub use verdict::{CaseResult, ExecutionResult, Verdict, VerdictStatus};
