//! Tool descriptors and the registry seam the agent loop calls through.

pub mod tool;
pub mod types;

pub use tool::{ToolArguments, ToolOutput, ToolRegistry};
pub use types::{ParamKind, ToolDescriptor, ToolParameter};
