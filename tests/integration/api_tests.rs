//! API endpoint integration tests against a scripted Telegram client

#[path = "../common/mod.rs"]
mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use common::{app_state, channel, photo_message, MockClient, MockConnector};
use serde_json::{json, Value};
use std::sync::Arc;
use tg_gateway::api::routes::create_router;
use tg_gateway::telegram::{
    ChatKind, ChatRecord, MediaKind, MediaRecord, MessageRecord, PollOptionRecord, PollRecord,
    SentMessage, TelegramError,
};
use tower::ServiceExt;

async fn router_with(client: MockClient) -> (Router, Arc<MockClient>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(client);
    let state = app_state(
        dir.path(),
        Arc::new(MockConnector::default()),
        Some(client.clone()),
    )
    .await;
    (create_router(state), client, dir)
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_root_and_health() {
    let (router, _, _dir) = router_with(MockClient {
        authorized: true,
        ..Default::default()
    })
    .await;

    let (status, body) = send(router.clone(), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("Welcome"));

    let (status, body) = send(router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["telegram"]["authorized"], true);
    assert_eq!(body["telegram"]["phone_number"], common::ACCOUNT_PHONE);
}

#[tokio::test]
async fn test_dialogs_pass_through() {
    let user = ChatRecord {
        id: 42,
        kind: ChatKind::Private,
        title: None,
        first_name: Some("Ada".to_string()),
        last_name: Some("Lovelace".to_string()),
        username: None,
        description: None,
        members_count: None,
    };
    let (router, _, _dir) = router_with(MockClient {
        dialogs: vec![channel(-1001, "News"), user],
        ..Default::default()
    })
    .await;

    let (status, body) = send(router, get("/api/dialogs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            {"id": -1001, "title": "News", "type": "channel"},
            {"id": 42, "title": "Ada Lovelace", "type": "private"}
        ])
    );
}

#[tokio::test]
async fn test_channel_info_fields() {
    let mut chat = channel(100, "Rust News");
    chat.username = Some("rustnews".to_string());
    chat.description = Some("All things Rust".to_string());
    chat.members_count = Some(1234);
    let (router, client, _dir) = router_with(MockClient {
        chat: Some(chat),
        ..Default::default()
    })
    .await;

    let (status, body) = send(router, get("/api/channels/@rustnews/info")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "id": 100,
            "title": "Rust News",
            "username": "rustnews",
            "description": "All things Rust",
            "members_count": 1234,
            "type": "channel"
        })
    );
    assert_eq!(client.calls(), vec!["get_chat @rustnews".to_string()]);
}

#[tokio::test]
async fn test_channel_info_not_found() {
    let (router, _, _dir) = router_with(MockClient::failing(TelegramError::ChannelPrivate)).await;

    let (status, body) = send(router, get("/api/channels/100/info")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_messages_fields_and_paging() {
    let (router, client, _dir) = router_with(MockClient {
        messages: vec![photo_message(7)],
        ..Default::default()
    })
    .await;

    let (status, body) = send(
        router,
        get("/api/channels/-1001/messages?limit=5&offset_message_id=50"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{
            "id": 7,
            "text": "caption",
            "sender": "Grace Hopper",
            "date": 1_700_000_000,
            "media_type": "photo",
            "file_id": "9001",
            "file_name": null,
            "mime_type": null,
            "poll_data": null,
            "is_outgoing": false
        }])
    );
    assert_eq!(client.calls(), vec!["history -1001 5 50".to_string()]);
}

#[tokio::test]
async fn test_messages_default_limit() {
    let (router, client, _dir) = router_with(MockClient::default()).await;

    let (status, _) = send(router, get("/api/channels/@chan/messages")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(client.calls(), vec!["history @chan 20 0".to_string()]);
}

#[tokio::test]
async fn test_messages_poll_data() {
    let poll_message = MessageRecord {
        id: 8,
        text: None,
        sender: None,
        date: None,
        media: Some(MediaRecord {
            kind: MediaKind::Poll,
            file_id: None,
            file_name: None,
            mime_type: None,
        }),
        poll: Some(PollRecord {
            question: "Best language?".to_string(),
            options: vec![
                PollOptionRecord {
                    text: "Rust".to_string(),
                    data: b"0".to_vec(),
                },
                PollOptionRecord {
                    text: "Other".to_string(),
                    data: b"1".to_vec(),
                },
            ],
            total_voters: Some(10),
            is_closed: true,
            is_anonymous: false,
            is_quiz: false,
            allows_multiple_answers: true,
            correct_option_id: None,
        }),
        outgoing: true,
    };
    let (router, _, _dir) = router_with(MockClient {
        messages: vec![poll_message],
        ..Default::default()
    })
    .await;

    let (status, body) = send(router, get("/api/channels/1/messages")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["sender"], "N/A");
    assert_eq!(body[0]["date"], 0);
    assert_eq!(body[0]["is_outgoing"], true);
    assert_eq!(
        body[0]["poll_data"],
        json!({
            "question": "Best language?",
            "options": [{"text": "Rust", "data": "MA=="}, {"text": "Other", "data": "MQ=="}],
            "total_voters": 10,
            "is_closed": true,
            "is_anonymous": false,
            "type": "regular",
            "allows_multiple_answers": true,
            "quiz_correct_option_id": null
        })
    );
}

#[tokio::test]
async fn test_messages_limit_out_of_range() {
    let (router, client, _dir) = router_with(MockClient::default()).await;

    let (status, body) = send(router.clone(), get("/api/channels/1/messages?limit=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("limit"));

    let (status, _) = send(router.clone(), get("/api/channels/1/messages?limit=101")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(router, get("/api/channels/1/messages?limit=abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_library_errors_map_to_status() {
    let cases = [
        (TelegramError::PeerIdInvalid, StatusCode::NOT_FOUND),
        (TelegramError::ChannelInvalid, StatusCode::NOT_FOUND),
        (TelegramError::UserNotParticipant, StatusCode::FORBIDDEN),
        (TelegramError::AuthKeyUnregistered, StatusCode::UNAUTHORIZED),
        (TelegramError::Disconnected("reset".to_string()), StatusCode::SERVICE_UNAVAILABLE),
        (TelegramError::Other("boom".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
    ];

    for (error, expected) in cases {
        let (router, _, _dir) = router_with(MockClient::failing(error.clone())).await;
        let (status, body) = send(router, get("/api/channels/1/messages")).await;
        assert_eq!(status, expected, "{:?}", error);
        assert!(body["detail"].is_string());
    }
}

#[tokio::test]
async fn test_flood_wait_sets_retry_after() {
    let (router, _, _dir) =
        router_with(MockClient::failing(TelegramError::FloodWait { seconds: 30 })).await;

    let response = router.oneshot(get("/api/dialogs")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[header::RETRY_AFTER], "30");
}

#[tokio::test]
async fn test_join_by_invite_link() {
    let (router, client, _dir) = router_with(MockClient {
        joined: Some(ChatRecord::titled(555, ChatKind::Supergroup, "Secret Club")),
        ..Default::default()
    })
    .await;

    let (status, body) = send(
        router,
        post(
            "/api/channels/join",
            json!({"invite_link": "https://t.me/+AbCdEf123"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "message": "Successfully joined chat",
            "chat_id": 555,
            "title": "Secret Club",
            "type": "supergroup"
        })
    );
    assert_eq!(
        client.calls(),
        vec!["join_chat Invite(\"AbCdEf123\")".to_string()]
    );
}

#[tokio::test]
async fn test_join_errors() {
    let cases = [
        (TelegramError::UserNotParticipant, StatusCode::FORBIDDEN),
        (TelegramError::AlreadyParticipant, StatusCode::CONFLICT),
        (TelegramError::InviteHashExpired, StatusCode::BAD_REQUEST),
        (TelegramError::InviteHashInvalid, StatusCode::BAD_REQUEST),
    ];

    for (error, expected) in cases {
        let (router, _, _dir) = router_with(MockClient::failing(error.clone())).await;
        let (status, _) = send(
            router,
            post("/api/channels/join", json!({"invite_link": "@somechannel"})),
        )
        .await;
        assert_eq!(status, expected, "{:?}", error);
    }
}

#[tokio::test]
async fn test_join_rejects_malformed_link() {
    let (router, client, _dir) = router_with(MockClient::default()).await;

    let (status, _) = send(
        router,
        post("/api/channels/join", json!({"invite_link": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_send_message_created() {
    let (router, client, _dir) = router_with(MockClient {
        sent: Some(SentMessage {
            chat_id: -1001,
            message_id: 99,
        }),
        ..Default::default()
    })
    .await;

    let (status, body) = send(
        router.clone(),
        post("/api/send_message", json!({"chat_id": -1001, "text": "hello"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body,
        json!({"message": "Message sent successfully", "chat_id": -1001, "message_id": 99})
    );

    let (status, _) = send(
        router,
        post("/api/send_message", json!({"chat_id": "@friend", "text": "hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    assert_eq!(
        client.calls(),
        vec![
            "send_message -1001 hello".to_string(),
            "send_message @friend hi".to_string()
        ]
    );
}

#[tokio::test]
async fn test_send_message_validation_and_errors() {
    let (router, client, _dir) = router_with(MockClient::default()).await;

    let (status, _) = send(
        router.clone(),
        post("/api/send_message", json!({"chat_id": 1, "text": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(router, post("/api/send_message", json!({"text": "hi"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
    assert!(client.calls().is_empty());

    let (router, _, _dir) = router_with(MockClient::failing(TelegramError::WriteForbidden)).await;
    let (status, _) = send(
        router,
        post("/api/send_message", json!({"chat_id": 1, "text": "hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_media_stream_headers() {
    let (router, client, _dir) = router_with(MockClient {
        messages: vec![photo_message(7)],
        media: vec![b"abc".to_vec(), b"def".to_vec()],
        ..Default::default()
    })
    .await;

    let response = router
        .oneshot(get("/api/media/-1001/7/photo"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"9001.jpg\""
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"abcdef");
    assert_eq!(
        client.calls(),
        vec![
            "get_message -1001 7".to_string(),
            "download_media -1001 7".to_string()
        ]
    );
}

#[tokio::test]
async fn test_media_not_found() {
    let (router, client, _dir) = router_with(MockClient {
        messages: vec![photo_message(7)],
        ..Default::default()
    })
    .await;

    let (status, _) = send(router.clone(), get("/api/media/1/8/photo")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(router.clone(), get("/api/media/1/7/video")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(router.clone(), get("/api/media/1/7/9001")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(router, get("/api/media/1/notanumber/photo")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(!client
        .calls()
        .iter()
        .any(|call| call == "download_media 1 8"));
}

#[tokio::test]
async fn test_empty_slot_is_unauthorized() {
    let dir = tempfile::tempdir().unwrap();
    let state = app_state(dir.path(), Arc::new(MockConnector::default()), None).await;
    let router = create_router(state);

    for uri in ["/api/dialogs", "/api/channels/1/info", "/api/channels/1/messages"] {
        let (status, body) = send(router.clone(), get(uri)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert!(body["detail"].is_string());
    }

    let (status, body) = send(router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["telegram"]["authorized"], false);
}

#[tokio::test]
async fn test_rate_limit_rejects_burst() {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(MockClient::default());
    let state = app_state(dir.path(), Arc::new(MockConnector::default()), Some(client)).await;

    let mut settings = (*state.settings).clone();
    settings.rate_limit.enabled = true;
    settings.rate_limit.requests_per_second = 1;
    settings.rate_limit.burst_size = 1;
    let state = Arc::new(tg_gateway::AppState {
        settings: Arc::new(settings),
        telegram: state.telegram.clone(),
        connector: state.connector.clone(),
        login: state.login.clone(),
    });
    let router = create_router(state);

    let (status, _) = send(router.clone(), get("/api/dialogs")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(router.clone(), get("/api/dialogs")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["detail"].is_string());

    // Health is outside the limited routes
    let (status, _) = send(router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_openapi_document_served() {
    let (router, _, _dir) = router_with(MockClient::default()).await;

    let (status, body) = send(router, get("/api-docs/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/dialogs"].is_object());
}
