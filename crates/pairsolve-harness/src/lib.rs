pub mod adapters;
pub mod canonical;
pub mod driver;
pub mod grader;
pub mod input_parser;
pub mod interpreter;
pub mod piston;
pub mod problem_loader;
pub mod session;
pub mod signature;

pub use adapters::{AdapterRegistry, DriverCase, DriverProgram, LanguageAdapter};
pub use canonical::{canonical, normalize_expected, outputs_match};
pub use grader::{GradedRun, Grader, PreparedRun, RunOutcome, RunTickets};
pub use input_parser::{parse_input, parse_literal};
pub use interpreter::{interpret, interpret_legacy};
pub use piston::{PistonClient, Sandbox, SandboxError};
pub use problem_loader::{find_problem, load_all_problem_sets, load_catalog, load_problem_set, CatalogError};
pub use session::{SessionCoordinator, SessionEvent};
pub use signature::{CallableSignature, Unsupported};
