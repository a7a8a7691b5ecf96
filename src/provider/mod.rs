//! Model provider trait and the Gemini implementation.

pub mod google;
pub mod http;

use async_trait::async_trait;

use crate::config::PilotConfig;
use crate::error::PilotError;
use crate::types::{FinishReason, GenerationSettings, Usage};

/// A single-prompt request sent to a model provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub prompt: String,
    pub settings: GenerationSettings,
}

impl ProviderRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            settings: GenerationSettings::default(),
        }
    }
}

/// Response from a provider.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub text: String,
    pub usage: Usage,
    pub finish_reason: Option<FinishReason>,
}

/// Core trait implemented by text-generation backends.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name (e.g., "google").
    fn provider_name(&self) -> &str;

    /// The model ID this provider instance serves.
    fn model_id(&self) -> &str;

    /// Generate text (non-streaming).
    async fn generate_text(&self, request: &ProviderRequest)
        -> Result<ProviderResponse, PilotError>;
}

/// Create a Gemini provider for `model` using the credentials in `config`.
pub fn create_provider(
    model: &str,
    config: &PilotConfig,
) -> Result<Box<dyn ModelProvider>, PilotError> {
    let api_key = config.require_api_key()?;
    Ok(Box::new(google::GoogleProvider::new(
        model,
        api_key,
        config.base_url.clone(),
    )))
}
