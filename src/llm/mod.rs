//! AI text-generation gateway: a provider trait, concrete clients for the
//! supported external services and the policy that picks one at
//! configuration time.

pub mod anthropic;
pub mod gateway;
pub mod openai;

use async_trait::async_trait;
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{
    AiConfig, DEFAULT_ANTHROPIC_MAX_TOKENS, DEFAULT_OPENAI_MAX_TOKENS,
};
use crate::llm::anthropic::AnthropicClient;
use crate::llm::gateway::AiError;
use crate::llm::openai::OpenAIClient;
use crate::shared::state::AppState;

/// Capability contract of an external provider: generate text from a
/// prompt with a bounded output length. The model identifier and output
/// cap are fixed when the client is built.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(
        &self,
        prompt: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

/// Resolve the configured provider once, at startup. Policy: an explicit
/// `AI_PROVIDER` override wins; otherwise the first provider in fixed
/// preference order (OpenAI, Anthropic) with a credential present.
/// Returns `None` when nothing is configured; the hot path never probes
/// credentials again.
pub fn build_provider(config: &AiConfig) -> Option<Arc<dyn LLMProvider>> {
    let max_tokens = config.max_output_tokens;
    let openai = || -> Option<Arc<dyn LLMProvider>> {
        config.openai_api_key.clone().map(|key| {
            Arc::new(OpenAIClient::new(
                key,
                config.openai_model.clone(),
                max_tokens.unwrap_or(DEFAULT_OPENAI_MAX_TOKENS),
            )) as Arc<dyn LLMProvider>
        })
    };
    let anthropic = || -> Option<Arc<dyn LLMProvider>> {
        config.anthropic_api_key.clone().map(|key| {
            Arc::new(AnthropicClient::new(
                key,
                config.anthropic_model.clone(),
                max_tokens.unwrap_or(DEFAULT_ANTHROPIC_MAX_TOKENS),
            )) as Arc<dyn LLMProvider>
        })
    };

    let provider = match config.provider_override.as_deref() {
        Some("openai") => openai(),
        Some("anthropic") => anthropic(),
        Some(other) => {
            warn!("unknown AI_PROVIDER override {other:?}, treating as not configured");
            None
        }
        None => openai().or_else(anthropic),
    };

    match &provider {
        Some(p) => info!(provider = p.name(), "AI provider configured"),
        None => info!("no AI provider configured"),
    }
    provider
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub mode: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub text: String,
}

pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AiError> {
    let text = state.ai.generate(&req.text, &req.mode).await?;
    Ok(Json(GenerateResponse { text }))
}

pub fn configure_ai_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/ai/generate", post(generate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AiConfig;

    #[test]
    fn no_credentials_means_no_provider() {
        let config = AiConfig::unconfigured();
        assert!(build_provider(&config).is_none());
    }

    #[test]
    fn autodetect_prefers_openai() {
        let config = AiConfig {
            openai_api_key: Some("sk-test".to_string()),
            anthropic_api_key: Some("sk-ant-test".to_string()),
            ..AiConfig::unconfigured()
        };
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn override_selects_the_named_provider() {
        let config = AiConfig {
            provider_override: Some("anthropic".to_string()),
            openai_api_key: Some("sk-test".to_string()),
            anthropic_api_key: Some("sk-ant-test".to_string()),
            ..AiConfig::unconfigured()
        };
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.name(), "anthropic");
    }

    #[test]
    fn override_without_credential_is_not_configured() {
        let config = AiConfig {
            provider_override: Some("openai".to_string()),
            anthropic_api_key: Some("sk-ant-test".to_string()),
            ..AiConfig::unconfigured()
        };
        assert!(build_provider(&config).is_none());
    }
}
