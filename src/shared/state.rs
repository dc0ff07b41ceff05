use crate::config::AppConfig;
use crate::llm::gateway::AiGateway;
use crate::shared::utils::DbPool;

/// Shared application state handed to every axum handler.
pub struct AppState {
    pub conn: DbPool,
    pub config: AppConfig,
    pub ai: AiGateway,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("conn", &"DbPool")
            .field("config", &"[redacted]")
            .field("ai", &self.ai)
            .finish()
    }
}
