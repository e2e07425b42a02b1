use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Default number of rules fetched per page.
pub const DEFAULT_RULES_PAGE_SIZE: usize = 12;
/// Default location of the MCP listing data file.
pub const DEFAULT_MCP_DIRECTORY_PATH: &str = "data/mcp_servers.json";
/// Default browser origin allowed by CORS (local front-end dev server).
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the catalog service.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the hosted data/auth service.
    pub supabase_url: String,
    /// Public API key sent with every request to the hosted service.
    pub supabase_anon_key: String,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Number of rules returned per page.
    pub rules_page_size: usize,
    /// Path of the JSON file holding MCP server listings.
    pub mcp_directory_path: String,
    /// Browser origins allowed to call the HTTP API.
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            supabase_url: load_env("SUPABASE_URL")?,
            supabase_anon_key: load_env("SUPABASE_ANON_KEY")?,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
            rules_page_size: load_env_optional("RULES_PAGE_SIZE")
                .map(|value| match value.parse::<usize>() {
                    Ok(size) if size > 0 => Ok(size),
                    _ => Err(ConfigError::InvalidValue("RULES_PAGE_SIZE".into())),
                })
                .transpose()?
                .unwrap_or(DEFAULT_RULES_PAGE_SIZE),
            mcp_directory_path: load_env_optional("MCP_DIRECTORY_PATH")
                .unwrap_or_else(|| DEFAULT_MCP_DIRECTORY_PATH.to_string()),
            cors_origins: load_env_optional("CORS_ORIGINS")
                .map(|value| parse_origins(&value))
                .unwrap_or_else(|| vec![DEFAULT_CORS_ORIGIN.to_string()]),
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        supabase_url = %config.supabase_url,
        server_port = ?config.server_port,
        rules_page_size = config.rules_page_size,
        mcp_directory = %config.mcp_directory_path,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
