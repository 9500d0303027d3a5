//! Configuration loading

pub mod settings;

pub use settings::{
    session_name, CorsConfig, LoggingConfig, MessagesConfig, RateLimitConfig, ServerConfig,
    Settings, TelegramConfig,
};
