//! Application error type and its HTTP mapping

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::telegram::TelegramError;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Rate limit exceeded: retry after {retry_after} seconds")]
    RateLimited { retry_after: u32 },

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_)
            | AppError::Storage(_)
            | AppError::Io(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TelegramError> for AppError {
    fn from(err: TelegramError) -> Self {
        match err {
            TelegramError::PeerIdInvalid => {
                AppError::NotFound("Chat not found or invalid.".to_string())
            }
            TelegramError::ChannelPrivate | TelegramError::ChannelInvalid => AppError::NotFound(
                "Channel not found, private, or not accessible.".to_string(),
            ),
            TelegramError::UserNotParticipant => AppError::Forbidden(
                "User is not a participant of this chat.".to_string(),
            ),
            TelegramError::WriteForbidden => AppError::Forbidden(
                "Sending messages to this chat is restricted.".to_string(),
            ),
            TelegramError::AuthKeyUnregistered => AppError::Unauthorized(
                "Telegram session expired or was revoked. Log in again.".to_string(),
            ),
            TelegramError::InviteHashExpired | TelegramError::InviteHashInvalid => {
                AppError::InvalidRequest("Invite link is invalid or has expired.".to_string())
            }
            TelegramError::AlreadyParticipant => {
                AppError::Conflict("User is already a participant of this chat.".to_string())
            }
            TelegramError::FloodWait { seconds } => AppError::RateLimited {
                retry_after: seconds,
            },
            TelegramError::PhoneNumberInvalid => {
                AppError::InvalidRequest("Invalid phone number.".to_string())
            }
            TelegramError::PhoneCodeInvalid => {
                AppError::InvalidRequest("Invalid verification code.".to_string())
            }
            TelegramError::PhoneCodeExpired => AppError::InvalidRequest(
                "Verification code expired. Request a new code.".to_string(),
            ),
            TelegramError::PasswordRequired => AppError::Unauthorized(
                "Two-factor authentication is enabled. Password required.".to_string(),
            ),
            TelegramError::PasswordInvalid => {
                AppError::InvalidRequest("Invalid two-factor password.".to_string())
            }
            TelegramError::SignUpRequired => AppError::InvalidRequest(
                "This phone number is not registered with Telegram.".to_string(),
            ),
            TelegramError::Disconnected(reason) => AppError::ServiceUnavailable(format!(
                "Telegram connection is not available: {}",
                reason
            )),
            TelegramError::Other(message) => AppError::Internal(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let body = Json(json!({ "detail": self.to_string() }));
        let mut response = (status, body).into_response();

        if let AppError::RateLimited { retry_after } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}
