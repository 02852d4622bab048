mod language;
mod types;

pub use language::Language;
pub use types::{Difficulty, Example, Problem, ProblemSet};
