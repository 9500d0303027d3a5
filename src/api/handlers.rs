//! HTTP request handlers for the chat endpoints

use crate::api::models::{
    display_title, ChannelInfo, DialogItem, HealthResponse, JoinChannelRequest,
    JoinChannelResponse, MessageItem, MessageResponse, MessagesQuery, SendMessageRequest,
    SendMessageResponse, TelegramHealth,
};
use crate::error::AppError;
use crate::response::media::attachment;
use crate::telegram::media::select_media;
use crate::telegram::{JoinTarget, PeerRef};
use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::Response,
    Json,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Unwrap an extractor, turning its rejection into a 400 with a `detail` body
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::InvalidRequest(rejection.body_text()))
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| AppError::InvalidRequest(rejection.body_text()))
}

/// Welcome message
#[utoipa::path(
    get,
    path = "/",
    tag = "Health",
    responses((status = 200, description = "Welcome message", body = MessageResponse))
)]
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Welcome to the Telegram Gateway API".to_string(),
    })
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service health", body = HealthResponse))
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let authorized = match state.telegram.get() {
        Ok(client) => client.is_authorized().await.unwrap_or(false),
        Err(_) => false,
    };

    Json(HealthResponse {
        status: if authorized { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        telegram: TelegramHealth {
            authorized,
            phone_number: state.settings.telegram.phone_number.clone(),
        },
    })
}

/// List the account's dialogs
#[utoipa::path(
    get,
    path = "/api/dialogs",
    tag = "Chats",
    responses(
        (status = 200, description = "Dialogs in service order", body = [DialogItem]),
        (status = 401, description = "No authorized session", body = ErrorResponse),
        (status = 429, description = "Flood wait", body = ErrorResponse)
    )
)]
pub async fn list_dialogs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DialogItem>>, AppError> {
    let client = state.telegram.get()?;
    let dialogs = client.dialogs().await?;

    debug!(count = dialogs.len(), "Fetched dialogs");

    Ok(Json(dialogs.iter().map(DialogItem::from).collect()))
}

/// Chat details
#[utoipa::path(
    get,
    path = "/api/channels/{id}/info",
    tag = "Chats",
    params(("id" = String, Path, description = "Numeric chat id or username")),
    responses(
        (status = 200, description = "Chat details", body = ChannelInfo),
        (status = 404, description = "Chat not found or inaccessible", body = ErrorResponse)
    )
)]
pub async fn channel_info(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ChannelInfo>, AppError> {
    let peer = PeerRef::parse(&id)?;
    let client = state.telegram.get()?;

    let chat = client.get_chat(&peer).await?;
    Ok(Json(ChannelInfo::from(&chat)))
}

/// Message history, newest first
#[utoipa::path(
    get,
    path = "/api/channels/{id}/messages",
    tag = "Chats",
    params(
        ("id" = String, Path, description = "Numeric chat id or username"),
        MessagesQuery
    ),
    responses(
        (status = 200, description = "Messages", body = [MessageItem]),
        (status = 400, description = "Invalid paging parameters", body = ErrorResponse),
        (status = 403, description = "Not a participant", body = ErrorResponse),
        (status = 404, description = "Chat not found or inaccessible", body = ErrorResponse)
    )
)]
pub async fn channel_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    query: Result<Query<MessagesQuery>, QueryRejection>,
) -> Result<Json<Vec<MessageItem>>, AppError> {
    let query = query_params(query)?;
    let peer = PeerRef::parse(&id)?;

    let max_limit = state.settings.messages.max_limit;
    let limit = query.limit.unwrap_or(state.settings.messages.default_limit);
    if limit == 0 || limit > max_limit {
        return Err(AppError::InvalidRequest(format!(
            "limit must be between 1 and {}",
            max_limit
        )));
    }
    if query.offset_message_id < 0 {
        return Err(AppError::InvalidRequest(
            "offset_message_id cannot be negative".to_string(),
        ));
    }

    let client = state.telegram.get()?;
    let messages = client
        .history(&peer, limit, query.offset_message_id)
        .await?;

    debug!(peer = %peer, count = messages.len(), "Fetched message history");

    Ok(Json(messages.iter().map(MessageItem::from).collect()))
}

/// Join a chat by invite link or public username
#[utoipa::path(
    post,
    path = "/api/channels/join",
    tag = "Chats",
    request_body = JoinChannelRequest,
    responses(
        (status = 200, description = "Joined", body = JoinChannelResponse),
        (status = 400, description = "Invalid or expired invite", body = ErrorResponse),
        (status = 409, description = "Already a participant", body = ErrorResponse)
    )
)]
pub async fn join_channel(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<JoinChannelRequest>, JsonRejection>,
) -> Result<Json<JoinChannelResponse>, AppError> {
    let request = json_body(payload)?;
    let target = JoinTarget::parse(&request.invite_link)?;
    let client = state.telegram.get()?;

    info!(target = ?target, "Joining chat");
    let chat = client.join_chat(&target).await?;

    Ok(Json(JoinChannelResponse {
        message: "Successfully joined chat".to_string(),
        chat_id: chat.id,
        title: display_title(&chat),
        chat_type: chat.kind.as_str().to_string(),
    }))
}

/// Send a text message
#[utoipa::path(
    post,
    path = "/api/send_message",
    tag = "Chats",
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message sent", body = SendMessageResponse),
        (status = 400, description = "Empty text or invalid chat", body = ErrorResponse),
        (status = 403, description = "Writing is forbidden", body = ErrorResponse)
    )
)]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SendMessageResponse>), AppError> {
    let request = json_body(payload)?;
    if request.text.trim().is_empty() {
        return Err(AppError::InvalidRequest("Message text cannot be empty".to_string()));
    }

    let peer = request.chat_id.to_peer()?;
    let client = state.telegram.get()?;

    let sent = client.send_message(&peer, &request.text).await?;
    info!(peer = %peer, message_id = sent.message_id, "Message sent");

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            message: "Message sent successfully".to_string(),
            chat_id: sent.chat_id,
            message_id: sent.message_id,
        }),
    ))
}

/// Download the media attached to a message
#[utoipa::path(
    get,
    path = "/api/media/{chat}/{message}/{selector}",
    tag = "Media",
    params(
        ("chat" = String, Path, description = "Numeric chat id or username"),
        ("message" = i32, Path, description = "Message id"),
        ("selector" = String, Path, description = "photo, video, audio, document or a file id")
    ),
    responses(
        (status = 200, description = "Media stream", content_type = "application/octet-stream"),
        (status = 404, description = "Message or media not found", body = ErrorResponse)
    )
)]
pub async fn download_media(
    State(state): State<Arc<AppState>>,
    Path((chat, message, selector)): Path<(String, String, String)>,
) -> Result<Response, AppError> {
    let peer = PeerRef::parse(&chat)?;
    let message_id: i32 = message
        .trim()
        .parse()
        .map_err(|_| AppError::InvalidRequest(format!("Invalid message id: '{}'", message)))?;
    let client = state.telegram.get()?;

    let record = client
        .get_message(&peer, message_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Message not found.".to_string()))?;
    let media = record
        .media
        .as_ref()
        .ok_or_else(|| AppError::NotFound("Message has no media.".to_string()))?;
    let plan = select_media(media, &selector).ok_or_else(|| {
        AppError::NotFound(format!("No media matching '{}' in this message.", selector))
    })?;

    info!(
        peer = %peer,
        message_id,
        file_name = %plan.file_name,
        mime_type = %plan.mime_type,
        "Streaming media"
    );

    let stream = client.download_media(&peer, message_id).await?;
    Ok(attachment(&plan, stream))
}
