//! Agent loop: prompt composition, response parsing, argument coercion,
//! scenarios and the iteration driver.

pub mod coerce;
pub mod events;
pub mod parser;
pub mod prompt;
pub mod runner;
pub mod scenario;
pub mod types;

pub use coerce::ArgumentCoercer;
pub use events::*;
pub use parser::{parse_response, Command};
pub use prompt::PromptTemplate;
pub use runner::AgentLoop;
pub use scenario::{FollowUp, FollowUpStep, Scenario, ScenarioKind};
pub use types::*;
