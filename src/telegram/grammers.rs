//! `grammers` implementation of the Telegram client seam

use async_trait::async_trait;
use dashmap::DashMap;
use grammers_client::grammers_tl_types as tl;
use grammers_client::session::{PackedType, Session};
use grammers_client::types::{
    Chat, Downloadable, LoginToken, Message, PackedChat, PasswordToken, User,
};
use grammers_client::{Client, Config, InitParams, InvocationError, SignInError};
use grammers_mtsender::AuthorizationError;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::telegram::login_tokens::{LoginTokens, LOGIN_TOKEN_TTL};
use crate::telegram::media::{classify_document, DocumentTraits, MediaKind, MediaRecord};
use crate::telegram::{
    Account, ByteStream, ChatKind, ChatRecord, Connector, JoinTarget, LoginConnection,
    MessageRecord, PeerRef, PollOptionRecord, PollRecord, Sender, SentMessage, TelegramClient,
    TelegramError, TgResult,
};

/// Opens `grammers` clients from session files
pub struct GrammersConnector {
    api_id: i32,
    api_hash: String,
    /// Login tokens issued by `send_code`, one per phone number
    login_tokens: Arc<LoginTokens<LoginToken>>,
}

impl GrammersConnector {
    pub fn new(api_id: i32, api_hash: impl Into<String>) -> Self {
        Self {
            api_id,
            api_hash: api_hash.into(),
            login_tokens: Arc::new(LoginTokens::new(LOGIN_TOKEN_TTL)),
        }
    }

    async fn open_client(&self, session_file: &Path) -> TgResult<Client> {
        if let Some(parent) = session_file.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                TelegramError::Other(format!("Failed to create session directory: {}", e))
            })?;
        }

        let session = Session::load_file_or_create(session_file).map_err(|e| {
            TelegramError::Other(format!(
                "Failed to load session {}: {}",
                session_file.display(),
                e
            ))
        })?;

        debug!(session = %session_file.display(), "Connecting to Telegram");

        Client::connect(Config {
            session,
            api_id: self.api_id,
            api_hash: self.api_hash.clone(),
            params: InitParams::default(),
        })
        .await
        .map_err(from_authorization)
    }
}

#[async_trait]
impl Connector for GrammersConnector {
    async fn connect(&self, session_file: &Path) -> TgResult<Arc<dyn TelegramClient>> {
        let client = self.open_client(session_file).await?;

        if !client.is_authorized().await.map_err(from_invocation)? {
            return Err(TelegramError::AuthKeyUnregistered);
        }

        info!(session = %session_file.display(), "Telegram client connected and authorized");
        Ok(Arc::new(GrammersClient::new(client, session_file.to_path_buf())))
    }

    async fn open_login(&self, session_file: &Path) -> TgResult<Box<dyn LoginConnection>> {
        let client = self.open_client(session_file).await?;

        Ok(Box::new(GrammersLogin {
            client,
            session_file: session_file.to_path_buf(),
            login_tokens: self.login_tokens.clone(),
            password_token: Mutex::new(None),
        }))
    }
}

/// The shared, authorized client
pub struct GrammersClient {
    client: Client,
    session_file: PathBuf,
    /// Chats seen so far; numeric ids can only be resolved through these.
    /// Users and channels may share a bare id, hence the type in the key.
    peers: DashMap<(PackedType, i64), Chat>,
}

impl GrammersClient {
    pub fn new(client: Client, session_file: PathBuf) -> Self {
        Self {
            client,
            session_file,
            peers: DashMap::new(),
        }
    }

    fn remember(&self, chat: &Chat) {
        self.peers.insert((chat.pack().ty, chat.id()), chat.clone());
    }

    fn cached(&self, id: i64) -> Option<Chat> {
        let candidates = self
            .peers
            .iter()
            .filter(|entry| entry.key().1 == id)
            .map(|entry| (entry.key().0, entry.value().clone()))
            .collect::<Vec<_>>();

        if candidates.len() > 1 {
            debug!(id, candidates = candidates.len(), "Ambiguous bare id, preferring chats over users");
        }
        pick_peer(candidates)
    }

    async fn resolve(&self, peer: &PeerRef) -> TgResult<Chat> {
        match peer {
            PeerRef::Id(id) => {
                if let Some(chat) = self.cached(*id) {
                    return Ok(chat);
                }

                debug!(peer = %peer, "Peer not cached, scanning dialogs");
                self.dialogs().await?;

                self.cached(*id).ok_or(TelegramError::PeerIdInvalid)
            }
            PeerRef::Username(username) => {
                let chat = self
                    .client
                    .resolve_username(username)
                    .await
                    .map_err(from_invocation)?
                    .ok_or(TelegramError::PeerIdInvalid)?;
                self.remember(&chat);
                Ok(chat)
            }
        }
    }

    async fn fetch_message(&self, chat: &Chat, message_id: i32) -> TgResult<Option<Message>> {
        let mut messages = self
            .client
            .get_messages_by_id(chat.pack(), &[message_id])
            .await
            .map_err(from_invocation)?;
        Ok(messages.pop().flatten())
    }
}

#[async_trait]
impl TelegramClient for GrammersClient {
    async fn dialogs(&self) -> TgResult<Vec<ChatRecord>> {
        let mut iter = self.client.iter_dialogs();
        let mut chats = Vec::new();

        while let Some(dialog) = iter.next().await.map_err(from_invocation)? {
            let chat = dialog.chat();
            self.remember(chat);
            chats.push(chat_record(chat));
        }

        Ok(chats)
    }

    async fn get_chat(&self, peer: &PeerRef) -> TgResult<ChatRecord> {
        let chat = self.resolve(peer).await?;
        let packed = chat.pack();
        let mut record = chat_record(&chat);

        match packed.ty {
            PackedType::Megagroup | PackedType::Broadcast | PackedType::Gigagroup => {
                let response = self
                    .client
                    .invoke(&tl::functions::channels::GetFullChannel {
                        channel: input_channel(&packed),
                    })
                    .await
                    .map_err(from_invocation)?;
                let full = match response {
                    tl::enums::messages::ChatFull::Full(full) => full,
                };
                if let tl::enums::ChatFull::ChannelFull(channel) = full.full_chat {
                    record.description = non_empty(&channel.about);
                    record.members_count = channel.participants_count;
                }
            }
            PackedType::Chat => {
                let response = self
                    .client
                    .invoke(&tl::functions::messages::GetFullChat { chat_id: packed.id })
                    .await
                    .map_err(from_invocation)?;
                let full = match response {
                    tl::enums::messages::ChatFull::Full(full) => full,
                };
                if let tl::enums::ChatFull::Full(group) = full.full_chat {
                    record.description = non_empty(&group.about);
                    record.members_count = match group.participants {
                        tl::enums::ChatParticipants::Participants(p) => {
                            Some(p.participants.len() as i32)
                        }
                        _ => None,
                    };
                }
            }
            PackedType::User | PackedType::Bot => {
                let response = self
                    .client
                    .invoke(&tl::functions::users::GetFullUser {
                        id: tl::enums::InputUser::User(tl::types::InputUser {
                            user_id: packed.id,
                            access_hash: packed.access_hash.unwrap_or(0),
                        }),
                    })
                    .await
                    .map_err(from_invocation)?;
                let full = match response {
                    tl::enums::users::UserFull::Full(full) => full,
                };
                let tl::enums::UserFull::Full(user) = full.full_user;
                record.description = user.about.as_deref().and_then(non_empty);
            }
        }

        Ok(record)
    }

    async fn history(
        &self,
        peer: &PeerRef,
        limit: usize,
        offset_id: i32,
    ) -> TgResult<Vec<MessageRecord>> {
        let chat = self.resolve(peer).await?;

        let mut iter = self.client.iter_messages(chat.pack()).limit(limit);
        if offset_id > 0 {
            iter = iter.offset_id(offset_id);
        }

        let mut messages = Vec::with_capacity(limit);
        while let Some(message) = iter.next().await.map_err(from_invocation)? {
            messages.push(message_record(&message));
        }

        Ok(messages)
    }

    async fn send_message(&self, peer: &PeerRef, text: &str) -> TgResult<SentMessage> {
        let chat = self.resolve(peer).await?;
        let message = self
            .client
            .send_message(chat.pack(), text)
            .await
            .map_err(from_invocation)?;

        Ok(SentMessage {
            chat_id: chat.id(),
            message_id: message.id(),
        })
    }

    async fn join_chat(&self, target: &JoinTarget) -> TgResult<ChatRecord> {
        match target {
            JoinTarget::Invite(hash) => {
                let updates = self
                    .client
                    .invoke(&tl::functions::messages::ImportChatInvite { hash: hash.clone() })
                    .await
                    .map_err(from_invocation)?;

                let chats = match updates {
                    tl::enums::Updates::Updates(updates) => updates.chats,
                    tl::enums::Updates::Combined(updates) => updates.chats,
                    _ => Vec::new(),
                };

                chats
                    .iter()
                    .find_map(raw_chat_record)
                    .ok_or_else(|| TelegramError::Other("Join returned no chat".to_string()))
            }
            JoinTarget::Username(username) => {
                let chat = self.resolve(&PeerRef::Username(username.clone())).await?;
                let packed = chat.pack();

                if !matches!(
                    packed.ty,
                    PackedType::Megagroup | PackedType::Broadcast | PackedType::Gigagroup
                ) {
                    return Err(TelegramError::ChannelInvalid);
                }

                self.client
                    .invoke(&tl::functions::channels::JoinChannel {
                        channel: input_channel(&packed),
                    })
                    .await
                    .map_err(from_invocation)?;

                Ok(chat_record(&chat))
            }
        }
    }

    async fn get_message(&self, peer: &PeerRef, message_id: i32) -> TgResult<Option<MessageRecord>> {
        let chat = self.resolve(peer).await?;
        let message = self.fetch_message(&chat, message_id).await?;
        Ok(message.as_ref().map(message_record))
    }

    async fn download_media(&self, peer: &PeerRef, message_id: i32) -> TgResult<ByteStream> {
        let chat = self.resolve(peer).await?;
        let media = self
            .fetch_message(&chat, message_id)
            .await?
            .and_then(|message| message.media())
            .ok_or_else(|| TelegramError::Other("Message has no downloadable media".to_string()))?;

        let download = self.client.iter_download(&Downloadable::Media(media));
        let stream = futures::stream::try_unfold(download, |mut download| async move {
            match download.next().await {
                Ok(Some(chunk)) => Ok(Some((chunk, download))),
                Ok(None) => Ok(None),
                Err(err) => Err(from_invocation(err)),
            }
        });

        Ok(Box::pin(stream))
    }

    async fn is_authorized(&self) -> TgResult<bool> {
        self.client.is_authorized().await.map_err(from_invocation)
    }

    async fn disconnect(&self) {
        if let Err(e) = self.client.session().save_to_file(&self.session_file) {
            warn!(session = %self.session_file.display(), error = %e, "Failed to save session");
        }
        info!(session = %self.session_file.display(), "Telegram client disconnected");
    }
}

/// One login step over a fresh connection
struct GrammersLogin {
    client: Client,
    session_file: PathBuf,
    login_tokens: Arc<LoginTokens<LoginToken>>,
    password_token: Mutex<Option<PasswordToken>>,
}

#[async_trait]
impl LoginConnection for GrammersLogin {
    async fn send_code(&self, phone: &str) -> TgResult<String> {
        let token = self
            .client
            .request_login_code(phone)
            .await
            .map_err(from_authorization)?;

        let code_hash = self.login_tokens.issue(phone, token);
        debug!(pending_tokens = self.login_tokens.len(), "Login token issued");
        Ok(code_hash)
    }

    async fn sign_in(&self, phone: &str, code_hash: &str, code: &str) -> TgResult<Account> {
        let token = self
            .login_tokens
            .take(phone, code_hash)
            .ok_or(TelegramError::PhoneCodeExpired)?;

        match self.client.sign_in(&token, code).await {
            Ok(user) => Ok(account(&user)),
            Err(SignInError::PasswordRequired(password_token)) => {
                *self.password_token.lock() = Some(password_token);
                // The same code is submitted again together with the password
                self.login_tokens.restore(phone, code_hash, token);
                Err(TelegramError::PasswordRequired)
            }
            Err(err) => {
                let err = from_sign_in(err);
                if err == TelegramError::PhoneCodeInvalid {
                    self.login_tokens.restore(phone, code_hash, token);
                }
                Err(err)
            }
        }
    }

    async fn check_password(&self, password: &str) -> TgResult<Account> {
        let password_token = self
            .password_token
            .lock()
            .take()
            .ok_or(TelegramError::PasswordRequired)?;

        self.client
            .check_password(password_token, password.as_bytes())
            .await
            .map(|user| account(&user))
            .map_err(from_sign_in)
    }

    async fn disconnect(self: Box<Self>) {
        if let Err(e) = self.client.session().save_to_file(&self.session_file) {
            warn!(session = %self.session_file.display(), error = %e, "Failed to save session");
        }
        debug!(session = %self.session_file.display(), "Login connection closed");
    }
}

fn from_invocation(err: InvocationError) -> TelegramError {
    match err {
        InvocationError::Rpc(rpc) => TelegramError::from_rpc(&rpc.name, rpc.value),
        other => TelegramError::Disconnected(other.to_string()),
    }
}

fn from_authorization(err: AuthorizationError) -> TelegramError {
    match err {
        AuthorizationError::Invoke(err) => from_invocation(err),
        AuthorizationError::Gen(err) => TelegramError::Disconnected(err.to_string()),
    }
}

fn from_sign_in(err: SignInError) -> TelegramError {
    match err {
        SignInError::PasswordRequired(_) => TelegramError::PasswordRequired,
        SignInError::InvalidCode => TelegramError::PhoneCodeInvalid,
        SignInError::InvalidPassword => TelegramError::PasswordInvalid,
        SignInError::SignUpRequired { .. } => TelegramError::SignUpRequired,
        SignInError::Other(err) => from_invocation(err),
    }
}

fn account(user: &User) -> Account {
    Account {
        id: user.id(),
        first_name: non_empty(user.first_name()),
        last_name: user.last_name().and_then(non_empty),
        username: user.username().map(String::from),
        phone: user.phone().map(String::from),
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn input_channel(packed: &PackedChat) -> tl::enums::InputChannel {
    tl::enums::InputChannel::Channel(tl::types::InputChannel {
        channel_id: packed.id,
        access_hash: packed.access_hash.unwrap_or(0),
    })
}

fn chat_kind(ty: PackedType) -> ChatKind {
    match ty {
        PackedType::User => ChatKind::Private,
        PackedType::Bot => ChatKind::Bot,
        PackedType::Chat => ChatKind::Group,
        PackedType::Megagroup | PackedType::Gigagroup => ChatKind::Supergroup,
        PackedType::Broadcast => ChatKind::Channel,
    }
}

/// Among chats sharing a bare id, channels win over basic groups, which win
/// over users.
fn pick_peer<T>(candidates: Vec<(PackedType, T)>) -> Option<T> {
    candidates
        .into_iter()
        .min_by_key(|(ty, _)| match ty {
            PackedType::Broadcast | PackedType::Megagroup | PackedType::Gigagroup => 0,
            PackedType::Chat => 1,
            PackedType::User | PackedType::Bot => 2,
        })
        .map(|(_, chat)| chat)
}

fn chat_record(chat: &Chat) -> ChatRecord {
    let packed = chat.pack();
    let mut record = ChatRecord {
        id: chat.id(),
        kind: chat_kind(packed.ty),
        title: None,
        first_name: None,
        last_name: None,
        username: chat.username().map(String::from),
        description: None,
        members_count: None,
    };

    match chat {
        Chat::User(user) => {
            record.first_name = non_empty(user.first_name());
            record.last_name = user.last_name().and_then(non_empty);
        }
        Chat::Group(group) => record.title = non_empty(group.title()),
        Chat::Channel(channel) => record.title = non_empty(channel.title()),
    }

    record
}

/// Chat summary from a raw TL chat, as returned inside join updates
fn raw_chat_record(chat: &tl::enums::Chat) -> Option<ChatRecord> {
    match chat {
        tl::enums::Chat::Chat(group) => Some(ChatRecord::titled(group.id, ChatKind::Group, &group.title)),
        tl::enums::Chat::Forbidden(group) => {
            Some(ChatRecord::titled(group.id, ChatKind::Group, &group.title))
        }
        tl::enums::Chat::Channel(channel) => {
            let kind = if channel.megagroup || channel.gigagroup {
                ChatKind::Supergroup
            } else {
                ChatKind::Channel
            };
            let mut record = ChatRecord::titled(channel.id, kind, &channel.title);
            record.username = channel.username.clone();
            Some(record)
        }
        tl::enums::Chat::ChannelForbidden(channel) => {
            let kind = if channel.megagroup {
                ChatKind::Supergroup
            } else {
                ChatKind::Channel
            };
            Some(ChatRecord::titled(channel.id, kind, &channel.title))
        }
        tl::enums::Chat::Empty(_) => None,
    }
}

fn message_record(message: &Message) -> MessageRecord {
    let sender = message.sender().map(|chat| match chat {
        Chat::User(user) => Sender::User {
            id: user.id(),
            first_name: non_empty(user.first_name()),
            last_name: user.last_name().and_then(non_empty),
        },
        other => Sender::Chat {
            id: other.id(),
            title: non_empty(other.name()),
        },
    });

    let media = message.raw.media.as_ref();

    MessageRecord {
        id: message.id(),
        text: non_empty(message.text()),
        sender,
        date: Some(message.date()),
        media: media.and_then(media_record),
        poll: media.and_then(poll_record),
        outgoing: message.outgoing(),
    }
}

fn media_record(media: &tl::enums::MessageMedia) -> Option<MediaRecord> {
    use tl::enums::MessageMedia as M;

    let bare = |kind: MediaKind| MediaRecord {
        kind,
        file_id: None,
        file_name: None,
        mime_type: None,
    };

    let record = match media {
        M::Photo(photo) => MediaRecord {
            file_id: match &photo.photo {
                Some(tl::enums::Photo::Photo(p)) => Some(p.id.to_string()),
                _ => None,
            },
            ..bare(MediaKind::Photo)
        },
        M::Document(document) => match &document.document {
            Some(tl::enums::Document::Document(doc)) => document_record(doc),
            _ => bare(MediaKind::Document),
        },
        M::Poll(_) => bare(MediaKind::Poll),
        M::Contact(_) => bare(MediaKind::Contact),
        M::Geo(_) | M::GeoLive(_) => bare(MediaKind::Location),
        M::Venue(_) => bare(MediaKind::Venue),
        M::Dice(_) => bare(MediaKind::Dice),
        M::WebPage(_) => bare(MediaKind::WebPage),
        _ => return None,
    };

    Some(record)
}

fn document_record(doc: &tl::types::Document) -> MediaRecord {
    use tl::enums::DocumentAttribute as A;

    let mut traits = DocumentTraits::default();
    let mut file_name = None;
    let mut sticker = false;

    for attribute in &doc.attributes {
        match attribute {
            A::Filename(name) => file_name = non_empty(&name.file_name),
            A::Video(_) => traits.video = true,
            A::Audio(audio) => {
                traits.audio = true;
                traits.voice = audio.voice;
            }
            A::Animated => traits.animated = true,
            A::Sticker(_) => sticker = true,
            _ => {}
        }
    }

    let mime_type = non_empty(&doc.mime_type);
    let kind = if sticker {
        MediaKind::Sticker
    } else {
        classify_document(traits, mime_type.as_deref())
    };

    MediaRecord {
        kind,
        file_id: Some(doc.id.to_string()),
        file_name,
        mime_type,
    }
}

/// Plain text of a TL string, whichever form the layer uses
trait PlainText {
    fn plain_text(&self) -> String;
}

impl PlainText for String {
    fn plain_text(&self) -> String {
        self.clone()
    }
}

impl PlainText for tl::enums::TextWithEntities {
    fn plain_text(&self) -> String {
        match self {
            tl::enums::TextWithEntities::Entities(text) => text.text.clone(),
        }
    }
}

fn poll_record(media: &tl::enums::MessageMedia) -> Option<PollRecord> {
    let tl::enums::MessageMedia::Poll(media_poll) = media else {
        return None;
    };

    let poll = match &media_poll.poll {
        tl::enums::Poll::Poll(poll) => poll,
    };
    let results = match &media_poll.results {
        tl::enums::PollResults::Results(results) => results,
    };

    let options: Vec<PollOptionRecord> = poll
        .answers
        .iter()
        .map(|answer| match answer {
            tl::enums::PollAnswer::Answer(answer) => PollOptionRecord {
                text: answer.text.plain_text(),
                data: answer.option.clone(),
            },
        })
        .collect();

    let correct_option_id = results
        .results
        .iter()
        .flatten()
        .find_map(|voters| match voters {
            tl::enums::PollAnswerVoters::Voters(v) if v.correct => Some(v.option.clone()),
            _ => None,
        })
        .and_then(|option| options.iter().position(|o| o.data == option))
        .map(|index| index as i32);

    Some(PollRecord {
        question: poll.question.plain_text(),
        options,
        total_voters: results.total_voters,
        is_closed: poll.closed,
        is_anonymous: !poll.public_voters,
        is_quiz: poll.quiz,
        allows_multiple_answers: poll.multiple_choice,
        correct_option_id,
    })
}
