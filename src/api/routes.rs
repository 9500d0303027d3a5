//! HTTP route definitions

use crate::api::models::*;
use crate::api::{auth_handlers, handlers};
use crate::config::CorsConfig;
use crate::middleware::{rate_limit, RateLimit};
use crate::telegram::ChatTarget;
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Telegram Gateway API",
        description = "HTTP JSON gateway over a Telegram user account.",
        license(name = "MIT"),
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server")
    ),
    paths(
        handlers::root,
        handlers::health_check,
        handlers::list_dialogs,
        handlers::channel_info,
        handlers::channel_messages,
        handlers::join_channel,
        handlers::send_message,
        handlers::download_media,
        auth_handlers::request_code,
        auth_handlers::submit_code,
    ),
    components(schemas(
        ErrorResponse,
        MessageResponse,
        HealthResponse,
        TelegramHealth,
        DialogItem,
        ChannelInfo,
        MessageItem,
        PollDetails,
        PollOption,
        JoinChannelRequest,
        JoinChannelResponse,
        SendMessageRequest,
        SendMessageResponse,
        ChatTarget,
        RequestCodeRequest,
        RequestCodeResponse,
        SubmitCodeRequest,
        SubmitCodeResponse,
        UserInfo,
    )),
    tags(
        (name = "Chats", description = "Dialogs, history, joining and messaging"),
        (name = "Media", description = "Media downloads"),
        (name = "Auth", description = "Phone-code login"),
        (name = "Health", description = "Health and monitoring endpoints"),
    )
)]
pub struct ApiDoc;

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION]);

    if config.allowed_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(origins).allow_credentials(true)
}

/// Create the main application router
pub fn create_router(state: Arc<crate::AppState>) -> Router {
    let settings = state.settings.clone();

    let api_routes = Router::new()
        .route("/dialogs", get(handlers::list_dialogs))
        .route("/channels/join", post(handlers::join_channel))
        .route("/channels/:id/info", get(handlers::channel_info))
        .route("/channels/:id/messages", get(handlers::channel_messages))
        .route("/send_message", post(handlers::send_message))
        .route(
            "/media/:chat/:message/:selector",
            get(handlers::download_media),
        )
        .route("/auth/request_code", post(auth_handlers::request_code))
        .route("/auth/submit_code", post(auth_handlers::submit_code));

    let api_routes = if settings.rate_limit.enabled {
        let limit = RateLimit::new(
            settings.rate_limit.requests_per_second,
            settings.rate_limit.burst_size,
        );
        api_routes.layer(middleware::from_fn_with_state(limit, rate_limit))
    } else {
        api_routes
    };

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api_routes)
        .with_state(state)
        .layer(cors_layer(&settings.cors))
        .layer(TraceLayer::new_for_http())
}
