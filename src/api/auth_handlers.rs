//! HTTP login endpoints

use crate::api::handlers::json_body;
use crate::api::models::{
    RequestCodeRequest, RequestCodeResponse, SubmitCodeRequest, SubmitCodeResponse,
};
use crate::auth::normalize_phone;
use crate::error::AppError;
use crate::AppState;
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use std::sync::Arc;
use tracing::{info, warn};

/// Send a verification code to a phone number
#[utoipa::path(
    post,
    path = "/api/auth/request_code",
    tag = "Auth",
    request_body = RequestCodeRequest,
    responses(
        (status = 200, description = "Code sent", body = RequestCodeResponse),
        (status = 400, description = "Invalid phone number", body = ErrorResponse),
        (status = 429, description = "Flood wait", body = ErrorResponse)
    )
)]
pub async fn request_code(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RequestCodeRequest>, JsonRejection>,
) -> Result<Json<RequestCodeResponse>, AppError> {
    let request = json_body(payload)?;
    let sent = state.login.request_code(&request.phone_number).await?;

    Ok(Json(RequestCodeResponse {
        message: "Verification code sent".to_string(),
        phone_number: sent.phone_number,
        login_id: sent.login_id,
    }))
}

/// Submit the verification code (and two-factor password, if any)
#[utoipa::path(
    post,
    path = "/api/auth/submit_code",
    tag = "Auth",
    request_body = SubmitCodeRequest,
    responses(
        (status = 200, description = "Logged in", body = SubmitCodeResponse),
        (status = 400, description = "Invalid code, password or pending login", body = ErrorResponse),
        (status = 401, description = "Two-factor password required", body = ErrorResponse)
    )
)]
pub async fn submit_code(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SubmitCodeRequest>, JsonRejection>,
) -> Result<Json<SubmitCodeResponse>, AppError> {
    let request = json_body(payload)?;
    let account = state
        .login
        .submit_code(
            &request.phone_number,
            &request.code,
            request.password.as_deref(),
            request.login_id.as_deref(),
        )
        .await?;

    if is_account_phone(&state, &request.phone_number) {
        attach_account_client(&state).await;
    }

    Ok(Json(SubmitCodeResponse {
        message: "Login successful".to_string(),
        user: account.into(),
    }))
}

fn is_account_phone(state: &AppState, phone: &str) -> bool {
    match (
        normalize_phone(phone),
        normalize_phone(&state.settings.telegram.phone_number),
    ) {
        (Ok(phone), Ok(configured)) => {
            phone.trim_start_matches('+') == configured.trim_start_matches('+')
        }
        _ => false,
    }
}

/// Connect the shared client from the configured account's session file
async fn attach_account_client(state: &AppState) {
    let session_file = state.settings.telegram.account_session_file();

    match state.connector.connect(&session_file).await {
        Ok(client) => {
            if let Some(previous) = state.telegram.attach(client) {
                previous.disconnect().await;
            }
            info!(session = %session_file.display(), "Shared Telegram client attached");
        }
        Err(e) => {
            warn!(session = %session_file.display(), error = %e, "Failed to attach shared Telegram client");
        }
    }
}
