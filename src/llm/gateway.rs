use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::config::AiConfig;
use crate::llm::{build_provider, LLMProvider};

/// Word cap the rewrite prompt asks the provider to respect.
const REWRITE_WORD_CAP: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateMode {
    Summary,
    Rewrite,
}

impl GenerateMode {
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "summary" => Some(Self::Summary),
            "rewrite" => Some(Self::Rewrite),
            _ => None,
        }
    }
}

/// Classes a failed provider invocation is translated into. Nothing else
/// crosses the gateway boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    QuotaExceeded,
    AuthFailure,
    RateLimited,
    Unknown,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuotaExceeded => "quota_exceeded",
            Self::AuthFailure => "auth_failure",
            Self::RateLimited => "rate_limited",
            Self::Unknown => "unknown",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::QuotaExceeded => {
                "The AI service quota has been exhausted. Please try again later."
            }
            Self::AuthFailure => {
                "The AI service rejected our credentials. Please contact an administrator."
            }
            Self::RateLimited => {
                "The AI service is receiving too many requests. Please try again in a moment."
            }
            Self::Unknown => "The AI service could not process the request. Please try again later.",
        }
    }
}

/// Map a stringified provider failure onto the error taxonomy by
/// substring inspection of the lowercased detail.
pub fn classify(detail: &str) -> ErrorClass {
    let lowered = detail.to_lowercase();
    if lowered.contains("quota") {
        ErrorClass::QuotaExceeded
    } else if lowered.contains("api key")
        || lowered.contains("permission")
        || lowered.contains("unauthorized")
    {
        ErrorClass::AuthFailure
    } else if lowered.contains("rate") && lowered.contains("limit") {
        ErrorClass::RateLimited
    } else {
        ErrorClass::Unknown
    }
}

#[derive(Debug, Error)]
pub enum AiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("no AI provider is configured")]
    NoProvider,

    #[error("{detail}")]
    Provider { class: ErrorClass, detail: String },
}

impl IntoResponse for AiError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(reason) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": reason })),
            )
                .into_response(),
            Self::NoProvider => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "no AI provider is configured" })),
            )
                .into_response(),
            Self::Provider { class, detail } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": detail,
                    "user_message": class.user_message(),
                })),
            )
                .into_response(),
        }
    }
}

pub fn build_prompt(mode: GenerateMode, text: &str) -> String {
    match mode {
        GenerateMode::Summary => format!(
            "Summarize the following campus support issue in exactly three \
             bullet points labelled What, Where and Impact.\n\nIssue:\n{text}"
        ),
        GenerateMode::Rewrite => format!(
            "Rewrite the following text as a clear campus support request of \
             at most {REWRITE_WORD_CAP} words. State the location, the impact, \
             the urgency and the desired fix.\n\nText:\n{text}"
        ),
    }
}

/// The gateway itself. The provider is resolved once from configuration;
/// each call is validate → build prompt → one time-boxed invocation →
/// classify.
pub struct AiGateway {
    provider: Option<Arc<dyn LLMProvider>>,
    timeout: Duration,
}

impl AiGateway {
    pub fn from_config(config: &AiConfig) -> Self {
        Self {
            provider: build_provider(config),
            timeout: config.timeout,
        }
    }

    #[cfg(test)]
    pub fn with_provider(provider: Option<Arc<dyn LLMProvider>>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub async fn generate(&self, text: &str, mode: &str) -> Result<String, AiError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AiError::BadRequest("text must not be empty".to_string()));
        }
        let mode = GenerateMode::from_str(mode)
            .ok_or_else(|| AiError::BadRequest("mode must be summary or rewrite".to_string()))?;
        let provider = self.provider.as_ref().ok_or(AiError::NoProvider)?;

        let prompt = build_prompt(mode, text);
        match tokio::time::timeout(self.timeout, provider.generate(&prompt)).await {
            Ok(Ok(generated)) => Ok(generated.trim().to_string()),
            Ok(Err(err)) => {
                let detail = err.to_string();
                let class = classify(&detail);
                warn!(
                    provider = provider.name(),
                    class = class.as_str(),
                    "provider invocation failed: {detail}"
                );
                Err(AiError::Provider { class, detail })
            }
            Err(_) => {
                let detail = format!(
                    "provider call timed out after {}s",
                    self.timeout.as_secs()
                );
                warn!(provider = provider.name(), "{detail}");
                Err(AiError::Provider {
                    class: ErrorClass::Unknown,
                    detail,
                })
            }
        }
    }
}

impl std::fmt::Debug for AiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiGateway")
            .field(
                "provider",
                &self.provider.as_ref().map(|p| p.name()).unwrap_or("none"),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct ScriptedProvider {
        result: Result<String, String>,
        delay: Option<Duration>,
    }

    impl ScriptedProvider {
        fn ok(text: &str) -> Arc<dyn LLMProvider> {
            Arc::new(Self {
                result: Ok(text.to_string()),
                delay: None,
            })
        }

        fn failing(detail: &str) -> Arc<dyn LLMProvider> {
            Arc::new(Self {
                result: Err(detail.to_string()),
                delay: None,
            })
        }

        fn slow(delay: Duration) -> Arc<dyn LLMProvider> {
            Arc::new(Self {
                result: Ok("late".to_string()),
                delay: Some(delay),
            })
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn generate(
            &self,
            _prompt: &str,
        ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.result.clone().map_err(|e| e.into())
        }
    }

    fn gateway(provider: Option<Arc<dyn LLMProvider>>) -> AiGateway {
        AiGateway::with_provider(provider, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn empty_text_is_rejected() {
        let gw = gateway(Some(ScriptedProvider::ok("out")));
        let err = gw.generate("   ", "summary").await.unwrap_err();
        assert!(matches!(err, AiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn unknown_mode_is_rejected() {
        let gw = gateway(Some(ScriptedProvider::ok("out")));
        let err = gw.generate("x", "translate").await.unwrap_err();
        assert!(matches!(err, AiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn missing_provider_is_unavailable() {
        let gw = gateway(None);
        let err = gw.generate("x", "summary").await.unwrap_err();
        assert!(matches!(err, AiError::NoProvider));
    }

    #[tokio::test]
    async fn success_is_trimmed() {
        let gw = gateway(Some(ScriptedProvider::ok("  generated text \n")));
        let out = gw.generate("wifi is down", "rewrite").await.unwrap();
        assert_eq!(out, "generated text");
    }

    #[tokio::test]
    async fn provider_failure_is_classified_and_keeps_detail() {
        let gw = gateway(Some(ScriptedProvider::failing(
            "openai error (status 429): You exceeded your current quota",
        )));
        let err = gw.generate("x", "summary").await.unwrap_err();
        match err {
            AiError::Provider { class, detail } => {
                assert_eq!(class, ErrorClass::QuotaExceeded);
                assert!(detail.contains("quota"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_provider_times_out_as_unknown() {
        let gw = AiGateway::with_provider(
            Some(ScriptedProvider::slow(Duration::from_secs(3))),
            Duration::from_millis(20),
        );
        let err = gw.generate("x", "summary").await.unwrap_err();
        match err {
            AiError::Provider { class, detail } => {
                assert_eq!(class, ErrorClass::Unknown);
                assert!(detail.contains("timed out"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn classification_covers_the_taxonomy() {
        assert_eq!(classify("Quota exhausted for project"), ErrorClass::QuotaExceeded);
        assert_eq!(classify("Invalid API key provided"), ErrorClass::AuthFailure);
        assert_eq!(classify("permission denied for model"), ErrorClass::AuthFailure);
        assert_eq!(classify("401 Unauthorized"), ErrorClass::AuthFailure);
        assert_eq!(classify("Rate limit reached, slow down"), ErrorClass::RateLimited);
        // "rate" without "limit" is not enough
        assert_eq!(classify("rate of errors increased"), ErrorClass::Unknown);
        assert_eq!(classify("connection reset by peer"), ErrorClass::Unknown);
    }

    #[test]
    fn prompts_interpolate_the_text_verbatim() {
        let summary = build_prompt(GenerateMode::Summary, "wifi <b>down</b>");
        assert!(summary.contains("wifi <b>down</b>"));
        assert!(summary.contains("What, Where and Impact"));
        let rewrite = build_prompt(GenerateMode::Rewrite, "heating broken");
        assert!(rewrite.contains("120 words"));
        assert!(rewrite.contains("heating broken"));
    }
}
