//! Startup configuration from environment variables

use crate::catalog::DEFAULT_CATALOG_URL;
use crate::llm::LlmConfig;
use crate::runtime::DEFAULT_CADENCE;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8000;

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Completion proxy settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub llm: LlmConfig,
}

impl ServerConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(env_var)
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            port: get("SHOPCHAT_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            llm: LlmConfig {
                openai_api_key: get("OPENAI_API_KEY"),
                gateway: get("LLM_GATEWAY"),
                model: get("SHOPCHAT_MODEL"),
            },
        }
    }
}

/// Terminal chat settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Completion proxy base URL; without one the client calls the LLM directly
    pub chat_url: Option<String>,
    pub catalog_url: String,
    pub db_path: PathBuf,
    pub typing_cadence: Duration,
    pub llm: LlmConfig,
}

impl ClientConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(env_var)
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = get("SHOPCHAT_DB_PATH").map_or_else(
            || {
                let home = get("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".shopchat").join("history.db")
            },
            PathBuf::from,
        );

        let typing_cadence = get("SHOPCHAT_TYPING_MS")
            .and_then(|ms| ms.parse().ok())
            .map_or(DEFAULT_CADENCE, Duration::from_millis);

        Self {
            chat_url: get("SHOPCHAT_CHAT_URL"),
            catalog_url: get("SHOPCHAT_CATALOG_URL")
                .unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string()),
            db_path,
            typing_cadence,
            llm: ServerConfig::from_lookup(&get).llm,
        }
    }
}
