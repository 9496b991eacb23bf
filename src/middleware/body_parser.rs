// Request body parsing for JSON and url-encoded forms.

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    middleware::Next,
    response::Response,
};
use http_body_util::LengthLimitError;
use serde_json::{Map, Value};

use crate::config::state::AppState;
use crate::middleware::error_handler::{find_cause, AppError};

/// Parsed request body, stored in request extensions. Form bodies are
/// exposed as a JSON object (last value wins for repeated keys).
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedBody(pub Value);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
}

fn body_kind(req: &Request) -> Option<BodyKind> {
    let content_type: &str = req.headers().get(CONTENT_TYPE)?.to_str().ok()?;
    let mime: String = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json")) {
        Some(BodyKind::Json)
    } else if mime == "application/x-www-form-urlencoded" {
        Some(BodyKind::Form)
    } else {
        None
    }
}

fn parse(kind: BodyKind, bytes: &Bytes) -> Result<Value, AppError> {
    match kind {
        BodyKind::Json => serde_json::from_slice(bytes)
            .map_err(|err| AppError::http(StatusCode::BAD_REQUEST, err.to_string())),
        BodyKind::Form => {
            let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(bytes)
                .map_err(|err| AppError::http(StatusCode::BAD_REQUEST, err.to_string()))?;
            let object: Map<String, Value> = pairs
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect();
            Ok(Value::Object(object))
        }
    }
}

/// Buffers JSON and url-encoded bodies up to the configured limit, parses
/// them into `ParsedBody` and hands the original bytes on downstream.
pub async fn parse_body(State(state): State<AppState>, req: Request, next: Next) -> Result<Response, AppError> {
    let Some(kind) = body_kind(&req) else {
        return Ok(next.run(req).await);
    };

    let (parts, body) = req.into_parts();
    let bytes: Bytes = to_bytes(body, state.environment.max_request_body_size)
        .await
        .map_err(|err| {
            if find_cause::<LengthLimitError>(&err).is_some() {
                AppError::http(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large")
            } else {
                AppError::http(StatusCode::BAD_REQUEST, format!("Failed to read request body: {err}"))
            }
        })?;

    let mut req: Request = Request::from_parts(parts, Body::from(bytes.clone()));
    if !bytes.is_empty() {
        let value: Value = parse(kind, &bytes)?;
        req.extensions_mut().insert(ParsedBody(value));
    }

    Ok(next.run(req).await)
}
