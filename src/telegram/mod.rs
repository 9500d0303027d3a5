//! Telegram client seam: records, traits, and the shared client slot

pub mod error;
pub mod grammers;
mod login_tokens;
pub mod media;
pub mod peer;

pub use error::TelegramError;
pub use media::{MediaKind, MediaRecord};
pub use peer::{ChatTarget, JoinTarget, PeerRef};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::AppError;

/// Result of a call into the Telegram client library
pub type TgResult<T> = std::result::Result<T, TelegramError>;

/// Chunks of a media download
pub type ByteStream = BoxStream<'static, TgResult<Vec<u8>>>;

/// Kind of chat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Bot,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatKind::Private => "private",
            ChatKind::Bot => "bot",
            ChatKind::Group => "group",
            ChatKind::Supergroup => "supergroup",
            ChatKind::Channel => "channel",
        }
    }
}

/// A chat as reported by the library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRecord {
    pub id: i64,
    pub kind: ChatKind,
    pub title: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    /// Only filled by `get_chat`
    pub description: Option<String>,
    /// Only filled by `get_chat`
    pub members_count: Option<i32>,
}

impl ChatRecord {
    /// A chat with only an id, kind and title set
    pub fn titled(id: i64, kind: ChatKind, title: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            title: Some(title.into()),
            first_name: None,
            last_name: None,
            username: None,
            description: None,
            members_count: None,
        }
    }
}

/// Author of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sender {
    User {
        id: i64,
        first_name: Option<String>,
        last_name: Option<String>,
    },
    Chat {
        id: i64,
        title: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOptionRecord {
    pub text: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRecord {
    pub question: String,
    pub options: Vec<PollOptionRecord>,
    pub total_voters: Option<i32>,
    pub is_closed: bool,
    pub is_anonymous: bool,
    pub is_quiz: bool,
    pub allows_multiple_answers: bool,
    pub correct_option_id: Option<i32>,
}

/// A message as reported by the library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub id: i32,
    /// Text or caption
    pub text: Option<String>,
    pub sender: Option<Sender>,
    pub date: Option<DateTime<Utc>>,
    pub media: Option<MediaRecord>,
    pub poll: Option<PollRecord>,
    pub outgoing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: i64,
    pub message_id: i32,
}

/// The signed-in account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
}

/// Operations the gateway needs from an authorized Telegram client
#[async_trait]
pub trait TelegramClient: Send + Sync {
    /// Dialogs in the order the service returns them
    async fn dialogs(&self) -> TgResult<Vec<ChatRecord>>;

    /// Full chat information, including description and member count
    async fn get_chat(&self, peer: &PeerRef) -> TgResult<ChatRecord>;

    /// Message history, newest first; `offset_id` 0 starts from the latest
    async fn history(&self, peer: &PeerRef, limit: usize, offset_id: i32) -> TgResult<Vec<MessageRecord>>;

    async fn send_message(&self, peer: &PeerRef, text: &str) -> TgResult<SentMessage>;

    /// Join by invite hash or public username, returning the joined chat
    async fn join_chat(&self, target: &JoinTarget) -> TgResult<ChatRecord>;

    async fn get_message(&self, peer: &PeerRef, message_id: i32) -> TgResult<Option<MessageRecord>>;

    /// Stream the media attached to a message
    async fn download_media(&self, peer: &PeerRef, message_id: i32) -> TgResult<ByteStream>;

    async fn is_authorized(&self) -> TgResult<bool>;

    async fn disconnect(&self);
}

/// A short-lived connection used for one step of the login handshake
#[async_trait]
pub trait LoginConnection: Send + Sync {
    /// Request a verification code, returning the code hash to submit it with
    async fn send_code(&self, phone: &str) -> TgResult<String>;

    async fn sign_in(&self, phone: &str, code_hash: &str, code: &str) -> TgResult<Account>;

    /// Complete a sign-in that failed with `PasswordRequired`
    async fn check_password(&self, password: &str) -> TgResult<Account>;

    /// Persist the session and close the connection
    async fn disconnect(self: Box<Self>);
}

/// Opens Telegram connections backed by a session file
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect the long-lived client used by the chat endpoints
    async fn connect(&self, session_file: &Path) -> TgResult<Arc<dyn TelegramClient>>;

    /// Open a fresh connection for a login step
    async fn open_login(&self, session_file: &Path) -> TgResult<Box<dyn LoginConnection>>;
}

/// Holds the shared client, if one is attached
#[derive(Default)]
pub struct ClientSlot {
    inner: RwLock<Option<Arc<dyn TelegramClient>>>,
}

impl ClientSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Arc<dyn TelegramClient>) -> Self {
        Self {
            inner: RwLock::new(Some(client)),
        }
    }

    /// The attached client, or 401 when no session is attached
    pub fn get(&self) -> Result<Arc<dyn TelegramClient>, AppError> {
        self.inner.read().clone().ok_or_else(|| {
            AppError::Unauthorized(
                "No authorized Telegram session. Log in via /api/auth or run create-session."
                    .to_string(),
            )
        })
    }

    /// Attach a client, returning the one it replaces
    pub fn attach(&self, client: Arc<dyn TelegramClient>) -> Option<Arc<dyn TelegramClient>> {
        self.inner.write().replace(client)
    }

    pub fn take(&self) -> Option<Arc<dyn TelegramClient>> {
        self.inner.write().take()
    }

    pub fn is_attached(&self) -> bool {
        self.inner.read().is_some()
    }
}

/// Connect the long-lived client from `session_file` at startup.
///
/// Returns `None` when there is no usable session: the file is missing, or
/// its authorization key was revoked (the file is then deleted). Every other
/// failure, flood waits included, is returned to the caller.
pub async fn connect_account(
    connector: &dyn Connector,
    session_file: &Path,
) -> TgResult<Option<Arc<dyn TelegramClient>>> {
    if !session_file.exists() {
        warn!(
            session = %session_file.display(),
            "Session file not found; chat endpoints return 401 until a login completes"
        );
        return Ok(None);
    }

    match connector.connect(session_file).await {
        Ok(client) => {
            info!(session = %session_file.display(), "Shared Telegram client ready");
            Ok(Some(client))
        }
        Err(TelegramError::AuthKeyUnregistered) => {
            warn!(
                session = %session_file.display(),
                "Session authorization key is unregistered; deleting the session file"
            );
            match tokio::fs::remove_file(session_file).await {
                Ok(()) => Ok(None),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(TelegramError::Other(format!(
                    "Failed to delete session file {}: {}",
                    session_file.display(),
                    e
                ))),
            }
        }
        Err(e) => Err(e),
    }
}
