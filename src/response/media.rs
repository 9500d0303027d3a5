//! Streamed media download responses

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use tracing::warn;

use crate::telegram::media::MediaDownloadPlan;
use crate::telegram::ByteStream;

/// File name safe to place inside a quoted `Content-Disposition` parameter
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.trim().is_empty() {
        "downloaded_media".to_string()
    } else {
        cleaned
    }
}

/// `attachment; filename="<name>"`
pub fn content_disposition(name: &str) -> String {
    format!("attachment; filename=\"{}\"", sanitize_file_name(name))
}

/// Build a streaming attachment response
pub fn attachment(plan: &MediaDownloadPlan, stream: ByteStream) -> Response {
    let stream = stream.inspect_err(|e| warn!(error = %e, "Media download interrupted"));
    let mut response = (StatusCode::OK, Body::from_stream(stream)).into_response();
    let headers = response.headers_mut();

    let content_type = HeaderValue::from_str(&plan.mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CONTENT_TYPE, content_type);

    // Non-ASCII names cannot go into a header value verbatim
    let disposition = HeaderValue::from_str(&content_disposition(&plan.file_name))
        .or_else(|_| {
            let ascii: String = plan
                .file_name
                .chars()
                .map(|c| if c.is_ascii() { c } else { '_' })
                .collect();
            HeaderValue::from_str(&content_disposition(&ascii))
        })
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    headers.insert(header::CONTENT_DISPOSITION, disposition);

    response
}
