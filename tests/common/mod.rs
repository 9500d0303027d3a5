//! Scripted Telegram client and connector shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tg_gateway::auth::{LoginService, PendingLoginStore};
use tg_gateway::config::Settings;
use tg_gateway::telegram::{
    Account, ByteStream, ChatKind, ChatRecord, ClientSlot, Connector, JoinTarget,
    LoginConnection, MediaKind, MediaRecord, MessageRecord, PeerRef, Sender, SentMessage,
    TelegramClient, TelegramError, TgResult,
};
use tg_gateway::AppState;

/// A client that answers from canned records, or fails every call with `error`
#[derive(Default)]
pub struct MockClient {
    pub dialogs: Vec<ChatRecord>,
    pub chat: Option<ChatRecord>,
    pub messages: Vec<MessageRecord>,
    pub sent: Option<SentMessage>,
    pub joined: Option<ChatRecord>,
    pub media: Vec<Vec<u8>>,
    pub error: Option<TelegramError>,
    pub authorized: bool,
    pub calls: Mutex<Vec<String>>,
}

impl MockClient {
    pub fn failing(error: TelegramError) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }

    fn record(&self, call: String) -> TgResult<()> {
        self.calls.lock().push(call);
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl TelegramClient for MockClient {
    async fn dialogs(&self) -> TgResult<Vec<ChatRecord>> {
        self.record("dialogs".to_string())?;
        Ok(self.dialogs.clone())
    }

    async fn get_chat(&self, peer: &PeerRef) -> TgResult<ChatRecord> {
        self.record(format!("get_chat {}", peer))?;
        self.chat.clone().ok_or(TelegramError::PeerIdInvalid)
    }

    async fn history(&self, peer: &PeerRef, limit: usize, offset_id: i32) -> TgResult<Vec<MessageRecord>> {
        self.record(format!("history {} {} {}", peer, limit, offset_id))?;
        Ok(self.messages.iter().take(limit).cloned().collect())
    }

    async fn send_message(&self, peer: &PeerRef, text: &str) -> TgResult<SentMessage> {
        self.record(format!("send_message {} {}", peer, text))?;
        self.sent.ok_or(TelegramError::PeerIdInvalid)
    }

    async fn join_chat(&self, target: &JoinTarget) -> TgResult<ChatRecord> {
        self.record(format!("join_chat {:?}", target))?;
        self.joined.clone().ok_or(TelegramError::InviteHashInvalid)
    }

    async fn get_message(&self, peer: &PeerRef, message_id: i32) -> TgResult<Option<MessageRecord>> {
        self.record(format!("get_message {} {}", peer, message_id))?;
        Ok(self.messages.iter().find(|m| m.id == message_id).cloned())
    }

    async fn download_media(&self, peer: &PeerRef, message_id: i32) -> TgResult<ByteStream> {
        self.record(format!("download_media {} {}", peer, message_id))?;
        let chunks: Vec<TgResult<Vec<u8>>> = self.media.iter().cloned().map(Ok).collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn is_authorized(&self) -> TgResult<bool> {
        Ok(self.authorized)
    }

    async fn disconnect(&self) {
        self.calls.lock().push("disconnect".to_string());
    }
}

/// Outcomes a scripted login connection replays
#[derive(Clone)]
pub struct LoginScript {
    pub send_code: TgResult<String>,
    pub sign_in: TgResult<Account>,
    pub check_password: TgResult<Account>,
}

impl Default for LoginScript {
    fn default() -> Self {
        Self {
            send_code: Ok("code-hash".to_string()),
            sign_in: Ok(account()),
            check_password: Ok(account()),
        }
    }
}

/// Connector handing out the mock client and scripted login connections
#[derive(Default)]
pub struct MockConnector {
    pub client: Option<Arc<MockClient>>,
    pub connect_error: Option<TelegramError>,
    pub script: Mutex<LoginScript>,
    pub opened: AtomicUsize,
    pub closed: Arc<AtomicUsize>,
    pub sessions: Mutex<Vec<PathBuf>>,
    pub passwords: Arc<Mutex<Vec<String>>>,
}

impl MockConnector {
    pub fn with_script(script: LoginScript) -> Self {
        Self {
            script: Mutex::new(script),
            ..Default::default()
        }
    }

    pub fn set_script(&self, script: LoginScript) {
        *self.script.lock() = script;
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, session_file: &Path) -> TgResult<Arc<dyn TelegramClient>> {
        self.sessions.lock().push(session_file.to_path_buf());
        if let Some(err) = &self.connect_error {
            return Err(err.clone());
        }
        match &self.client {
            Some(client) => Ok(client.clone()),
            None => Err(TelegramError::AuthKeyUnregistered),
        }
    }

    async fn open_login(&self, session_file: &Path) -> TgResult<Box<dyn LoginConnection>> {
        self.sessions.lock().push(session_file.to_path_buf());
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockLogin {
            script: self.script.lock().clone(),
            closed: self.closed.clone(),
            passwords: self.passwords.clone(),
        }))
    }
}

struct MockLogin {
    script: LoginScript,
    closed: Arc<AtomicUsize>,
    passwords: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl LoginConnection for MockLogin {
    async fn send_code(&self, _phone: &str) -> TgResult<String> {
        self.script.send_code.clone()
    }

    async fn sign_in(&self, _phone: &str, _code_hash: &str, _code: &str) -> TgResult<Account> {
        self.script.sign_in.clone()
    }

    async fn check_password(&self, password: &str) -> TgResult<Account> {
        self.passwords.lock().push(password.to_string());
        self.script.check_password.clone()
    }

    async fn disconnect(self: Box<Self>) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

pub const ACCOUNT_PHONE: &str = "+15550001111";

pub fn account() -> Account {
    Account {
        id: 777,
        first_name: Some("Ada".to_string()),
        last_name: Some("Lovelace".to_string()),
        username: Some("ada".to_string()),
        phone: Some("15550001111".to_string()),
    }
}

pub fn settings(dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.telegram.api_id = 12345;
    settings.telegram.api_hash = "hash".to_string();
    settings.telegram.phone_number = ACCOUNT_PHONE.to_string();
    settings.telegram.session_dir = dir.join("sessions").display().to_string();
    settings.telegram.login_db = dir.join("sessions/pending.db").display().to_string();
    settings.rate_limit.enabled = false;
    settings
}

/// Build application state around a connector; the slot holds `client` if given
pub async fn app_state(
    dir: &Path,
    connector: Arc<MockConnector>,
    client: Option<Arc<MockClient>>,
) -> Arc<AppState> {
    let settings = settings(dir);
    let store = PendingLoginStore::connect(&settings.telegram.login_db)
        .await
        .unwrap();
    let connector: Arc<dyn Connector> = connector;
    let login = Arc::new(LoginService::new(
        store,
        connector.clone(),
        settings.telegram.clone(),
    ));

    let slot = match client {
        Some(client) => ClientSlot::with_client(client),
        None => ClientSlot::new(),
    };

    Arc::new(AppState {
        settings: Arc::new(settings),
        telegram: Arc::new(slot),
        connector,
        login,
    })
}

pub fn channel(id: i64, title: &str) -> ChatRecord {
    ChatRecord::titled(id, ChatKind::Channel, title)
}

pub fn photo_message(id: i32) -> MessageRecord {
    MessageRecord {
        id,
        text: Some("caption".to_string()),
        sender: Some(Sender::User {
            id: 5,
            first_name: Some("Grace".to_string()),
            last_name: Some("Hopper".to_string()),
        }),
        date: Utc.timestamp_opt(1_700_000_000, 0).single(),
        media: Some(MediaRecord {
            kind: MediaKind::Photo,
            file_id: Some("9001".to_string()),
            file_name: None,
            mime_type: None,
        }),
        poll: None,
        outgoing: false,
    }
}
