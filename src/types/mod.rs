//! Core types shared by providers and the agent loop.

pub mod generation;
pub mod usage;

pub use generation::*;
pub use usage::*;
