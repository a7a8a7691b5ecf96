//! Error classification and recovery hints.

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    RateLimit,
    Network,
    Timeout,
    Server,
    Api,
    Configuration,
    Serialization,
    Generation,
    Parse,
    Arguments,
    ToolExecution,
    Startup,
    IterationLimit,
    Unknown,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    RetryWithBackoff,
    CheckCredentials,
    CheckConfiguration,
    IncreaseTimeout,
    CheckToolServer,
    RefinePrompt,
    RaiseIterationLimit,
    InspectLogs,
}

impl RecoverySuggestion {
    /// One-line advice for the person running the agent.
    pub fn hint(self) -> &'static str {
        match self {
            Self::RetryWithBackoff => "the backend is temporarily unavailable; wait and run again",
            Self::CheckCredentials => "check GEMINI_API_KEY",
            Self::CheckConfiguration => "check the environment or .env settings",
            Self::IncreaseTimeout => "raise --timeout-secs or TOOLPILOT_STARTUP_TIMEOUT_SECS",
            Self::CheckToolServer => "check that the tool server command runs on its own",
            Self::RefinePrompt => "the model did not follow the command format; adjust the query",
            Self::RaiseIterationLimit => "raise --max-iterations",
            Self::InspectLogs => "see the log file for details",
        }
    }
}
