//! Telegram Gateway
//!
//! An HTTP JSON gateway over a Telegram user account: dialogs, message
//! history, sending messages, joining chats, media downloads, and a
//! phone-code login flow that provisions session files.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod response;
pub mod telegram;

pub use error::{AppError, Result};

use std::sync::Arc;

use auth::LoginService;
use telegram::{ClientSlot, Connector};

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Arc<config::Settings>,
    /// Shared client serving the chat endpoints
    pub telegram: Arc<ClientSlot>,
    pub connector: Arc<dyn Connector>,
    pub login: Arc<LoginService>,
}
