//! Configuration system (environment + `.env` file).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{PilotError, Result};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_FALLBACK_MODEL: &str = "gemini-1.5-pro";
pub const DEFAULT_MAX_ITERATIONS: u32 = 3;
pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

pub const CREDS_FILE_KEY: &str = "GMAIL_CREDS_FILE_PATH";
pub const TOKEN_FILE_KEY: &str = "GMAIL_TOKEN_PATH";
pub const RECIPIENT_KEY: &str = "GMAIL_RECIPIENT_EMAIL";

/// Runtime configuration for an agent session.
///
/// Built from the process environment by [`PilotConfig::from_env`], or
/// directly in code through the `with_*` setters.
#[derive(Clone)]
pub struct PilotConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub fallback_model: Option<String>,
    pub base_url: Option<String>,
    pub recipient_email: Option<String>,
    pub creds_file: Option<PathBuf>,
    pub token_file: Option<PathBuf>,
    pub max_iterations: u32,
    pub completion_timeout: Duration,
    pub startup_timeout: Duration,
    pub server_command: Option<String>,
    pub server_args: Vec<String>,
    pub log_dir: PathBuf,
}

impl fmt::Debug for PilotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PilotConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("fallback_model", &self.fallback_model)
            .field("base_url", &self.base_url)
            .field("recipient_email", &self.recipient_email.as_ref().map(|_| "***"))
            .field("creds_file", &self.creds_file)
            .field("token_file", &self.token_file)
            .field("max_iterations", &self.max_iterations)
            .field("completion_timeout", &self.completion_timeout)
            .field("startup_timeout", &self.startup_timeout)
            .field("server_command", &self.server_command)
            .field("server_args", &self.server_args)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            fallback_model: Some(DEFAULT_FALLBACK_MODEL.to_string()),
            base_url: None,
            recipient_email: None,
            creds_file: None,
            token_file: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            completion_timeout: DEFAULT_COMPLETION_TIMEOUT,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            server_command: None,
            server_args: Vec::new(),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl PilotConfig {
    /// Load from environment variables, reading `.env` first when present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_source<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.api_key = get("GEMINI_API_KEY").or_else(|| get("GOOGLE_API_KEY"));
        if let Some(model) = get("GEMINI_MODEL") {
            config.model = model;
        }
        // An explicitly empty fallback disables the second attempt.
        match lookup("GEMINI_FALLBACK_MODEL") {
            Some(v) if v.trim().is_empty() => config.fallback_model = None,
            Some(v) => config.fallback_model = Some(v),
            None => {}
        }
        config.base_url = get("GEMINI_BASE_URL");
        config.recipient_email = get(RECIPIENT_KEY);
        config.creds_file = get(CREDS_FILE_KEY).map(PathBuf::from);
        config.token_file = get(TOKEN_FILE_KEY).map(PathBuf::from);

        if let Some(raw) = get("TOOLPILOT_MAX_ITERATIONS") {
            config.max_iterations = parse_setting("TOOLPILOT_MAX_ITERATIONS", &raw)?;
        }
        if let Some(raw) = get("TOOLPILOT_COMPLETION_TIMEOUT_SECS") {
            config.completion_timeout =
                Duration::from_secs(parse_setting("TOOLPILOT_COMPLETION_TIMEOUT_SECS", &raw)?);
        }
        if let Some(raw) = get("TOOLPILOT_STARTUP_TIMEOUT_SECS") {
            config.startup_timeout =
                Duration::from_secs(parse_setting("TOOLPILOT_STARTUP_TIMEOUT_SECS", &raw)?);
        }
        config.server_command = get("TOOLPILOT_SERVER_COMMAND");
        if let Some(raw) = get("TOOLPILOT_SERVER_ARGS") {
            config.server_args = raw.split_whitespace().map(str::to_string).collect();
        }
        if let Some(dir) = get("TOOLPILOT_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }

        if config.max_iterations == 0 {
            return Err(PilotError::Configuration(
                "TOOLPILOT_MAX_ITERATIONS must be at least 1".into(),
            ));
        }

        Ok(config)
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_fallback_model(mut self, model: Option<String>) -> Self {
        self.fallback_model = model;
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_recipient_email(mut self, email: impl Into<String>) -> Self {
        self.recipient_email = Some(email.into());
        self
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = timeout;
        self
    }

    pub fn with_credential_files(mut self, creds: impl Into<PathBuf>, token: impl Into<PathBuf>) -> Self {
        self.creds_file = Some(creds.into());
        self.token_file = Some(token.into());
        self
    }

    /// API key for the completion backend, or a `MissingConfiguration` error.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| PilotError::missing("GEMINI_API_KEY"))
    }

    /// Check the email integration's credential files before startup.
    ///
    /// Both paths must be configured and the credentials file must exist.
    /// The token file is written by the mail server on first authorization,
    /// so only its path is required.
    pub fn validate_email_credentials(&self) -> Result<(&Path, &Path)> {
        let creds = self
            .creds_file
            .as_deref()
            .ok_or_else(|| PilotError::missing(CREDS_FILE_KEY))?;
        let token = self
            .token_file
            .as_deref()
            .ok_or_else(|| PilotError::missing(TOKEN_FILE_KEY))?;

        if !creds.is_file() {
            return Err(PilotError::Configuration(format!(
                "Credentials file not found: {}",
                creds.display()
            )));
        }

        tracing::debug!(creds = %creds.display(), token = %token.display(), "email credentials validated");
        Ok((creds, token))
    }
}

fn parse_setting<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| PilotError::Configuration(format!("{key} has an invalid value: {raw:?}")))
}
