//! Completion requester: one prompt in, one raw completion out.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::config::PilotConfig;
use crate::error::PilotError;
use crate::provider::{self, ModelProvider, ProviderRequest, ProviderResponse};
use crate::types::{GenerationSettings, Usage};
use crate::util::timeout::with_timeout;

/// Raw text completion returned by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Usage,
    pub model: String,
}

impl Completion {
    /// A completion with no usage information.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: Usage::default(),
            model: String::new(),
        }
    }
}

/// Anything that turns a prompt into a completion.
///
/// Fails with [`PilotError::Timeout`] or [`PilotError::Generation`].
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<Completion, PilotError>;
}

/// Sends prompts to a primary provider under a deadline, with a single
/// attempt against an alternate provider when the primary errors.
pub struct CompletionRequester {
    primary: Arc<dyn ModelProvider>,
    fallback: Option<Arc<dyn ModelProvider>>,
    timeout: Duration,
    settings: GenerationSettings,
}

impl CompletionRequester {
    pub fn new(primary: Arc<dyn ModelProvider>, timeout: Duration) -> Self {
        Self {
            primary,
            fallback: None,
            timeout,
            settings: GenerationSettings::default(),
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn ModelProvider>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build the primary and fallback Gemini providers from config.
    pub fn from_config(config: &PilotConfig) -> Result<Self, PilotError> {
        let primary: Arc<dyn ModelProvider> =
            Arc::from(provider::create_provider(&config.model, config)?);
        let mut requester = Self::new(primary, config.completion_timeout);
        if let Some(model) = &config.fallback_model {
            let fallback: Arc<dyn ModelProvider> =
                Arc::from(provider::create_provider(model, config)?);
            requester = requester.with_fallback(fallback);
        }
        Ok(requester)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn attempt(
        &self,
        provider: &dyn ModelProvider,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse, PilotError> {
        with_timeout(self.timeout, provider.generate_text(request)).await
    }
}

fn into_completion(provider: &dyn ModelProvider, response: ProviderResponse) -> Completion {
    Completion {
        text: response.text,
        usage: response.usage,
        model: provider.model_id().to_string(),
    }
}

#[async_trait]
impl CompletionBackend for CompletionRequester {
    async fn complete(&self, prompt: &str) -> Result<Completion, PilotError> {
        let request = ProviderRequest {
            prompt: prompt.to_string(),
            settings: self.settings.clone(),
        };

        info!(model = self.primary.model_id(), "Starting LLM generation");
        let primary_error = match self.attempt(self.primary.as_ref(), &request).await {
            Ok(response) => {
                info!(
                    model = self.primary.model_id(),
                    output_tokens = response.usage.output_tokens,
                    "LLM generation completed"
                );
                return Ok(into_completion(self.primary.as_ref(), response));
            }
            Err(PilotError::Timeout(ms)) => {
                error!(timeout_ms = ms, "LLM generation timed out");
                return Err(PilotError::Timeout(ms));
            }
            Err(err) => err,
        };

        error!(error = %primary_error, "Error in LLM generation");
        let Some(fallback) = self.fallback.as_ref() else {
            return Err(PilotError::Generation(primary_error.to_string()));
        };

        warn!(model = fallback.model_id(), "Trying alternate backend");
        match self.attempt(fallback.as_ref(), &request).await {
            Ok(response) => {
                info!(model = fallback.model_id(), "LLM generation completed with alternate backend");
                Ok(into_completion(fallback.as_ref(), response))
            }
            Err(PilotError::Timeout(ms)) => {
                error!(timeout_ms = ms, "Alternate backend timed out");
                Err(PilotError::Timeout(ms))
            }
            Err(err) => {
                error!(error = %err, "Error with alternate backend");
                Err(PilotError::Generation(format!(
                    "{primary_error}; alternate backend {}: {err}",
                    fallback.model_id()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behaviour {
        Reply(&'static str),
        Fail,
        Hang,
    }

    struct StubProvider {
        model: &'static str,
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn new(model: &'static str, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                model,
                behaviour,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ModelProvider for StubProvider {
        fn provider_name(&self) -> &str {
            "stub"
        }

        fn model_id(&self) -> &str {
            self.model
        }

        async fn generate_text(
            &self,
            _request: &ProviderRequest,
        ) -> Result<ProviderResponse, PilotError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Reply(text) => Ok(ProviderResponse {
                    text: text.to_string(),
                    usage: Usage::default(),
                    finish_reason: None,
                }),
                Behaviour::Fail => Err(PilotError::api(500, "backend exploded")),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(PilotError::InvalidState("unreachable".into()))
                }
            }
        }
    }

    #[tokio::test]
    async fn primary_success_skips_fallback() {
        let primary = StubProvider::new("primary", Behaviour::Reply("FINAL_ANSWER: [1]"));
        let fallback = StubProvider::new("fallback", Behaviour::Reply("unused"));
        let requester = CompletionRequester::new(primary.clone(), Duration::from_secs(30))
            .with_fallback(fallback.clone());

        let completion = requester.complete("prompt").await.unwrap();
        assert_eq!(completion.text, "FINAL_ANSWER: [1]");
        assert_eq!(completion.model, "primary");
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn primary_error_falls_back_once() {
        let primary = StubProvider::new("primary", Behaviour::Fail);
        let fallback = StubProvider::new("fallback", Behaviour::Reply("FUNCTION_CALL: add|1|2"));
        let requester = CompletionRequester::new(primary.clone(), Duration::from_secs(30))
            .with_fallback(fallback.clone());

        let completion = requester.complete("prompt").await.unwrap();
        assert_eq!(completion.model, "fallback");
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn both_backends_failing_is_a_generation_error() {
        let primary = StubProvider::new("primary", Behaviour::Fail);
        let fallback = StubProvider::new("fallback", Behaviour::Fail);
        let requester = CompletionRequester::new(primary, Duration::from_secs(30))
            .with_fallback(fallback.clone());

        let err = requester.complete("prompt").await.unwrap_err();
        assert!(matches!(err, PilotError::Generation(msg) if msg.contains("backend exploded")));
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn error_without_fallback_is_a_generation_error() {
        let primary = StubProvider::new("primary", Behaviour::Fail);
        let requester = CompletionRequester::new(primary, Duration::from_secs(30));

        let err = requester.complete("prompt").await.unwrap_err();
        assert!(matches!(err, PilotError::Generation(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_not_retried_against_fallback() {
        let primary = StubProvider::new("primary", Behaviour::Hang);
        let fallback = StubProvider::new("fallback", Behaviour::Reply("unused"));
        let requester = CompletionRequester::new(primary, Duration::from_secs(30))
            .with_fallback(fallback.clone());

        let err = requester.complete("prompt").await.unwrap_err();
        assert!(matches!(err, PilotError::Timeout(30_000)));
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }
}
