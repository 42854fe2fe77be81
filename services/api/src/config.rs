//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub data_dir: PathBuf,
    pub cors_origin: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub chat_model: String,
    pub mind_map_model: String,
    pub notion_client_id: Option<String>,
    pub notion_client_secret: Option<String>,
    pub notion_redirect_uri: String,
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Server, Storage and Database ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let cors_origin =
            std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:5173".to_string());

        // --- Chat Completion ---
        let openai_api_key = optional("OPENAI_API_KEY");
        let openai_base_url = optional("OPENAI_BASE_URL");
        let chat_model = std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
        let mind_map_model =
            std::env::var("MIND_MAP_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        // --- Notion OAuth (optional; the redirect flow is disabled without it) ---
        let notion_client_id = optional("NOTION_CLIENT_ID");
        let notion_client_secret = optional("NOTION_CLIENT_SECRET");
        let notion_redirect_uri = std::env::var("NOTION_REDIRECT_URI")
            .unwrap_or_else(|_| "http://localhost:3000/auth/notion/callback".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            data_dir,
            cors_origin,
            openai_api_key,
            openai_base_url,
            chat_model,
            mind_map_model,
            notion_client_id,
            notion_client_secret,
            notion_redirect_uri,
        })
    }

    /// A configuration with every default filled in, for tests and tooling.
    pub fn for_tests(data_dir: PathBuf) -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 0)),
            database_url: String::new(),
            log_level: Level::INFO,
            data_dir,
            cors_origin: "http://localhost:5173".to_string(),
            openai_api_key: None,
            openai_base_url: None,
            chat_model: "gpt-4o".to_string(),
            mind_map_model: "gpt-4o-mini".to_string(),
            notion_client_id: Some("test-client".to_string()),
            notion_client_secret: Some("test-secret".to_string()),
            notion_redirect_uri: "http://localhost:3000/auth/notion/callback".to_string(),
        }
    }
}
