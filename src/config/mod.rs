use std::time::Duration;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database_url: String,
    pub admin: AdminConfig,
    pub ai: AiConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Credentials seeded by the idempotent bootstrap step.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// Configuration surface of the AI gateway: an optional provider
/// override, one credential and one model override per provider, a shared
/// output cap override and the invocation timeout.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub provider_override: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub max_output_tokens: Option<u32>,
    pub timeout: Duration,
}

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-latest";
pub const DEFAULT_OPENAI_MAX_TOKENS: u32 = 512;
pub const DEFAULT_ANTHROPIC_MAX_TOKENS: u32 = 600;

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let server = ServerConfig {
            host: env_opt("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: env_opt("SERVER_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
        };
        let admin = AdminConfig {
            username: env_opt("DEFAULT_ADMIN_USERNAME").unwrap_or_else(|| "admin".to_string()),
            password: env_opt("DEFAULT_ADMIN_PASSWORD")
                .unwrap_or_else(|| "admin12345".to_string()),
            email: env_opt("DEFAULT_ADMIN_EMAIL")
                .unwrap_or_else(|| "admin@example.com".to_string()),
        };
        Ok(Self {
            server,
            database_url,
            admin,
            ai: AiConfig::from_env(),
        })
    }
}

impl AiConfig {
    pub fn from_env() -> Self {
        Self {
            provider_override: env_opt("AI_PROVIDER").map(|v| v.to_lowercase()),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            openai_model: env_opt("OPENAI_MODEL")
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            anthropic_api_key: env_opt("ANTHROPIC_API_KEY"),
            anthropic_model: env_opt("ANTHROPIC_MODEL")
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string()),
            max_output_tokens: env_opt("AI_MAX_OUTPUT_TOKENS").and_then(|v| v.parse().ok()),
            timeout: Duration::from_secs(
                env_opt("AI_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            provider_override: None,
            openai_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            anthropic_api_key: None,
            anthropic_model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            max_output_tokens: None,
            timeout: Duration::from_secs(30),
        }
    }
}
