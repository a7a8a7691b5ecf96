//! Error types for toolpilot.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

/// Primary error type for all toolpilot operations.
#[derive(Error, Debug)]
pub enum PilotError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Missing configuration: {key} is not set")]
    MissingConfiguration { key: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Unparseable response: {0}")]
    Parse(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Not enough parameters provided for {tool}: expected {expected}, got {supplied}")]
    InsufficientArguments {
        tool: String,
        expected: usize,
        supplied: usize,
    },

    #[error("Invalid value for parameter {parameter}: expected {expected}, got {value:?}")]
    ArgumentType {
        parameter: String,
        expected: String,
        value: String,
    },

    #[error("Tool execution error: {tool_name} - {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Tool server failed to start: {0}")]
    ServerStartup(String),

    #[error("Maximum iterations ({0}) exceeded without a final answer")]
    MaxIterationsExceeded(u32),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl PilotError {
    /// Create an API error from a status code and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a missing-configuration error for an environment key.
    pub fn missing(key: impl Into<String>) -> Self {
        Self::MissingConfiguration { key: key.into() }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Network(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Configuration(_) | Self::MissingConfiguration { .. } => {
                ErrorCategory::Configuration
            }
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::Generation(_) => ErrorCategory::Generation,
            Self::Parse(_) => ErrorCategory::Parse,
            Self::UnknownTool(_)
            | Self::InsufficientArguments { .. }
            | Self::ArgumentType { .. } => ErrorCategory::Arguments,
            Self::ToolExecution { .. } => ErrorCategory::ToolExecution,
            Self::ServerStartup(_) => ErrorCategory::Startup,
            Self::MaxIterationsExceeded(_) => ErrorCategory::IterationLimit,
            _ => ErrorCategory::Unknown,
        }
    }

    /// Whether this error is one of the per-command argument-coercion
    /// failures that the agent loop logs and skips.
    pub fn is_coercion_failure(&self) -> bool {
        matches!(
            self,
            Self::UnknownTool(_)
                | Self::InsufficientArguments { .. }
                | Self::ArgumentType { .. }
                | Self::MissingConfiguration { .. }
        )
    }

    /// Whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit
                | ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::Server
        )
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Authentication => RecoverySuggestion::CheckCredentials,
            ErrorCategory::RateLimit => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Network => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Timeout => RecoverySuggestion::IncreaseTimeout,
            ErrorCategory::Server => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::Startup => RecoverySuggestion::CheckToolServer,
            ErrorCategory::ToolExecution => RecoverySuggestion::CheckToolServer,
            ErrorCategory::Parse | ErrorCategory::Arguments => RecoverySuggestion::RefinePrompt,
            ErrorCategory::IterationLimit => RecoverySuggestion::RaiseIterationLimit,
            _ => RecoverySuggestion::InspectLogs,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, PilotError>;
