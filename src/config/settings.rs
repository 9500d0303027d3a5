//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub telegram: TelegramConfig,
    pub cors: CorsConfig,
    pub rate_limit: RateLimitConfig,
    pub messages: MessagesConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Telegram API credentials and session storage
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub api_id: i32,
    #[serde(default)]
    pub api_hash: String,
    /// Account served by the chat endpoints
    #[serde(default)]
    pub phone_number: String,
    #[serde(default = "default_session_dir")]
    pub session_dir: String,
    #[serde(default = "default_login_db")]
    pub login_db: String,
}

fn default_session_dir() -> String {
    "sessions".to_string()
}

fn default_login_db() -> String {
    "sessions/pending_logins.db".to_string()
}

impl TelegramConfig {
    /// Session file for a phone number: `<session_dir>/user_session_<digits>.session`
    pub fn session_file(&self, phone: &str) -> PathBuf {
        Path::new(&self.session_dir).join(format!("{}.session", session_name(phone)))
    }

    /// Session file of the configured account
    pub fn account_session_file(&self) -> PathBuf {
        self.session_file(&self.phone_number)
    }
}

/// Derived session identifier for a phone number
pub fn session_name(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    format!("user_session_{}", digits)
}

/// CORS configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://127.0.0.1:5173".to_string(),
    ]
}

fn default_true() -> bool {
    true
}

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,
    #[serde(default = "default_burst")]
    pub burst_size: u32,
}

fn default_rps() -> u32 {
    10
}

fn default_burst() -> u32 {
    20
}

/// Message history paging limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessagesConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

fn default_limit() -> usize {
    20
}

fn default_max_limit() -> usize {
    100
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Settings {
    /// Load settings from `config/gateway.yaml`, `.env` and environment variables
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::load_from_path("config/gateway.yaml")
    }

    /// Load settings from a specific configuration file (YAML or TOML)
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let format = if path.extension().map_or(false, |ext| ext == "yaml" || ext == "yml") {
            FileFormat::Yaml
        } else {
            FileFormat::Toml
        };

        let mut config_builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("telegram.api_id", 0i64)?
            .set_default("telegram.api_hash", "")?
            .set_default("telegram.phone_number", "")?
            .set_default("telegram.session_dir", default_session_dir())?
            .set_default("telegram.login_db", default_login_db())?
            .set_default("cors.allowed_origins", default_allowed_origins())?
            .set_default("rate_limit.enabled", true)?
            .set_default("rate_limit.requests_per_second", default_rps() as i64)?
            .set_default("rate_limit.burst_size", default_burst() as i64)?
            .set_default("messages.default_limit", default_limit() as i64)?
            .set_default("messages.max_limit", default_max_limit() as i64)?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?;

        if path.exists() {
            config_builder = config_builder.add_source(File::from(path).format(format));
        }

        // Nested overrides, e.g. TG_GATEWAY__SERVER__PORT=9000
        config_builder = config_builder.add_source(
            Environment::with_prefix("TG_GATEWAY")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("cors.allowed_origins")
                .try_parsing(true),
        );

        // Flat credential variables used by .env files
        config_builder = config_builder
            .set_override_option("telegram.api_id", std::env::var("TELEGRAM_API_ID").ok())?
            .set_override_option("telegram.api_hash", std::env::var("TELEGRAM_API_HASH").ok())?
            .set_override_option("telegram.phone_number", std::env::var("PHONE_NUMBER").ok())?;

        let settings: Settings = config_builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(invalid("Server port cannot be 0"));
        }

        if self.telegram.api_id == 0 {
            return Err(invalid("TELEGRAM_API_ID must be set to a non-zero integer"));
        }

        if self.telegram.api_hash.trim().is_empty() {
            return Err(invalid("TELEGRAM_API_HASH must be set"));
        }

        if self.telegram.phone_number.trim().is_empty() {
            return Err(invalid("PHONE_NUMBER must be set"));
        }

        if self.messages.default_limit == 0 || self.messages.default_limit > self.messages.max_limit {
            return Err(invalid(
                "messages.default_limit must be between 1 and messages.max_limit",
            ));
        }

        if self.rate_limit.enabled
            && (self.rate_limit.requests_per_second == 0 || self.rate_limit.burst_size == 0)
        {
            return Err(invalid(
                "rate_limit.requests_per_second and rate_limit.burst_size must be non-zero",
            ));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> AppError {
    AppError::Config(config::ConfigError::Message(message.to_string()))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            telegram: TelegramConfig {
                api_id: 0,
                api_hash: String::new(),
                phone_number: String::new(),
                session_dir: default_session_dir(),
                login_db: default_login_db(),
            },
            cors: CorsConfig {
                allowed_origins: default_allowed_origins(),
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                requests_per_second: default_rps(),
                burst_size: default_burst(),
            },
            messages: MessagesConfig {
                default_limit: default_limit(),
                max_limit: default_max_limit(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
        }
    }
}
