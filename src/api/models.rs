//! API request and response models

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::telegram::{
    Account, ChatRecord, ChatTarget, MessageRecord, PollRecord, Sender,
};

/// Error body returned by every failing route
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Plain message response
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Health check response
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "healthy" when the shared client is authorized, "degraded" otherwise
    pub status: String,
    pub version: String,
    pub telegram: TelegramHealth,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct TelegramHealth {
    pub authorized: bool,
    pub phone_number: String,
}

/// A dialog entry
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct DialogItem {
    pub id: i64,
    pub title: String,
    /// private, bot, group, supergroup or channel
    #[serde(rename = "type")]
    pub chat_type: String,
}

impl From<&ChatRecord> for DialogItem {
    fn from(chat: &ChatRecord) -> Self {
        Self {
            id: chat.id,
            title: display_title(chat),
            chat_type: chat.kind.as_str().to_string(),
        }
    }
}

/// Chat details
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ChannelInfo {
    pub id: i64,
    pub title: String,
    pub username: Option<String>,
    pub description: Option<String>,
    pub members_count: Option<i32>,
    #[serde(rename = "type")]
    pub chat_type: String,
}

impl From<&ChatRecord> for ChannelInfo {
    fn from(chat: &ChatRecord) -> Self {
        Self {
            id: chat.id,
            title: display_title(chat),
            username: chat.username.clone(),
            description: chat.description.clone(),
            members_count: chat.members_count,
            chat_type: chat.kind.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct PollOption {
    pub text: String,
    /// Raw option bytes, base64 encoded
    pub data: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct PollDetails {
    pub question: String,
    pub options: Vec<PollOption>,
    pub total_voters: Option<i32>,
    pub is_closed: bool,
    pub is_anonymous: bool,
    /// "regular" or "quiz"
    #[serde(rename = "type")]
    pub poll_type: String,
    pub allows_multiple_answers: bool,
    pub quiz_correct_option_id: Option<i32>,
}

impl From<&PollRecord> for PollDetails {
    fn from(poll: &PollRecord) -> Self {
        Self {
            question: poll.question.clone(),
            options: poll
                .options
                .iter()
                .map(|option| PollOption {
                    text: option.text.clone(),
                    data: STANDARD.encode(&option.data),
                })
                .collect(),
            total_voters: poll.total_voters,
            is_closed: poll.is_closed,
            is_anonymous: poll.is_anonymous,
            poll_type: if poll.is_quiz { "quiz" } else { "regular" }.to_string(),
            allows_multiple_answers: poll.allows_multiple_answers,
            quiz_correct_option_id: poll.correct_option_id,
        }
    }
}

/// A message in a chat's history
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct MessageItem {
    pub id: i32,
    pub text: Option<String>,
    pub sender: String,
    /// Unix timestamp, 0 when unknown
    pub date: i64,
    pub media_type: Option<String>,
    pub file_id: Option<String>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub poll_data: Option<PollDetails>,
    pub is_outgoing: bool,
}

impl From<&MessageRecord> for MessageItem {
    fn from(message: &MessageRecord) -> Self {
        let media = message.media.as_ref();

        Self {
            id: message.id,
            text: message.text.clone(),
            sender: sender_label(message.sender.as_ref()),
            date: message.date.map(|d| d.timestamp()).unwrap_or(0),
            media_type: media.map(|m| m.kind.as_str().to_string()),
            file_id: media.and_then(|m| m.file_id.clone()),
            file_name: media.and_then(|m| m.file_name.clone()),
            mime_type: media.and_then(|m| m.mime_type.clone()),
            poll_data: message.poll.as_ref().map(PollDetails::from),
            is_outgoing: message.outgoing,
        }
    }
}

/// Paging parameters for message history
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MessagesQuery {
    /// Number of messages, 1 to the configured maximum
    pub limit: Option<usize>,
    /// Return messages older than this id; 0 starts from the latest
    #[serde(default)]
    pub offset_message_id: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct JoinChannelRequest {
    /// Invite link (`https://t.me/+HASH`), public link or `@username`
    pub invite_link: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct JoinChannelResponse {
    pub message: String,
    pub chat_id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub chat_type: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SendMessageRequest {
    /// Numeric chat id or username
    pub chat_id: ChatTarget,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SendMessageResponse {
    pub message: String,
    pub chat_id: i64,
    pub message_id: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct RequestCodeRequest {
    pub phone_number: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct RequestCodeResponse {
    pub message: String,
    pub phone_number: String,
    /// Pass back to `submit_code` to continue this login
    pub login_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SubmitCodeRequest {
    pub phone_number: String,
    pub code: String,
    /// Two-factor password, when the account has one
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub login_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UserInfo {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
}

impl From<Account> for UserInfo {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            first_name: account.first_name,
            last_name: account.last_name,
            username: account.username,
            phone: account.phone,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SubmitCodeResponse {
    pub message: String,
    pub user: UserInfo,
}

fn full_name(first_name: Option<&str>, last_name: Option<&str>) -> Option<String> {
    let name = [first_name, last_name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    (!name.is_empty()).then_some(name)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Chat title, else the user's full name, else the username, else "N/A"
pub fn display_title(chat: &ChatRecord) -> String {
    non_blank(chat.title.as_deref())
        .or_else(|| full_name(chat.first_name.as_deref(), chat.last_name.as_deref()))
        .or_else(|| non_blank(chat.username.as_deref()))
        .unwrap_or_else(|| "N/A".to_string())
}

/// User full name or id, else sender chat title or id, else "N/A"
pub fn sender_label(sender: Option<&Sender>) -> String {
    match sender {
        Some(Sender::User {
            id,
            first_name,
            last_name,
        }) => full_name(first_name.as_deref(), last_name.as_deref())
            .unwrap_or_else(|| id.to_string()),
        Some(Sender::Chat { id, title }) => {
            non_blank(title.as_deref()).unwrap_or_else(|| id.to_string())
        }
        None => "N/A".to_string(),
    }
}
