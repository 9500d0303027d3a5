//! Classified failures reported by the Telegram client library

use thiserror::Error;

/// Failures surfaced by the Telegram client library, classified by RPC error name
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TelegramError {
    #[error("peer id or username is invalid or unknown")]
    PeerIdInvalid,

    #[error("channel is private")]
    ChannelPrivate,

    #[error("channel is invalid")]
    ChannelInvalid,

    #[error("account is not a participant of this chat")]
    UserNotParticipant,

    #[error("writing to this chat is forbidden")]
    WriteForbidden,

    #[error("authorization key is not registered")]
    AuthKeyUnregistered,

    #[error("invite link has expired")]
    InviteHashExpired,

    #[error("invite link is invalid")]
    InviteHashInvalid,

    #[error("account is already a participant of this chat")]
    AlreadyParticipant,

    #[error("flood wait of {seconds} seconds required")]
    FloodWait { seconds: u32 },

    #[error("phone number is invalid")]
    PhoneNumberInvalid,

    #[error("verification code is invalid")]
    PhoneCodeInvalid,

    #[error("verification code has expired")]
    PhoneCodeExpired,

    #[error("two-factor password is required")]
    PasswordRequired,

    #[error("two-factor password is invalid")]
    PasswordInvalid,

    #[error("phone number is not registered")]
    SignUpRequired,

    #[error("connection to Telegram is unavailable: {0}")]
    Disconnected(String),

    #[error("{0}")]
    Other(String),
}

impl TelegramError {
    /// Classify an RPC error by its name (numeric suffixes already stripped)
    pub fn from_rpc(name: &str, value: Option<u32>) -> Self {
        match name {
            "PEER_ID_INVALID" | "USERNAME_INVALID" | "USERNAME_NOT_OCCUPIED" | "CHAT_ID_INVALID"
            | "MSG_ID_INVALID" => Self::PeerIdInvalid,
            "CHANNEL_PRIVATE" => Self::ChannelPrivate,
            "CHANNEL_INVALID" => Self::ChannelInvalid,
            "USER_NOT_PARTICIPANT" => Self::UserNotParticipant,
            "CHAT_WRITE_FORBIDDEN" | "CHAT_ADMIN_REQUIRED" | "USER_BANNED_IN_CHANNEL" => {
                Self::WriteForbidden
            }
            "AUTH_KEY_UNREGISTERED" | "AUTH_KEY_INVALID" | "SESSION_REVOKED" | "SESSION_EXPIRED"
            | "USER_DEACTIVATED" | "USER_DEACTIVATED_BAN" => Self::AuthKeyUnregistered,
            "INVITE_HASH_EXPIRED" => Self::InviteHashExpired,
            "INVITE_HASH_INVALID" | "INVITE_HASH_EMPTY" => Self::InviteHashInvalid,
            "USER_ALREADY_PARTICIPANT" => Self::AlreadyParticipant,
            "FLOOD_WAIT" | "FLOOD_PREMIUM_WAIT" | "SLOWMODE_WAIT" => Self::FloodWait {
                seconds: value.unwrap_or(0),
            },
            "PHONE_NUMBER_INVALID" | "PHONE_NUMBER_BANNED" => Self::PhoneNumberInvalid,
            "PHONE_CODE_INVALID" | "PHONE_CODE_EMPTY" => Self::PhoneCodeInvalid,
            "PHONE_CODE_EXPIRED" => Self::PhoneCodeExpired,
            "SESSION_PASSWORD_NEEDED" => Self::PasswordRequired,
            "PASSWORD_HASH_INVALID" => Self::PasswordInvalid,
            "PHONE_NUMBER_UNOCCUPIED" => Self::SignUpRequired,
            other => Self::Other(other.to_string()),
        }
    }

    /// Seconds the caller must wait before retrying, for flood waits
    pub fn retry_after(&self) -> Option<u32> {
        match self {
            Self::FloodWait { seconds } => Some(*seconds),
            _ => None,
        }
    }
}
