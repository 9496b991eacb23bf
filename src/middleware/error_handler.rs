// Centralized error handling: the request error type and the middleware that
// turns it into the client-visible JSON body.

use std::{any::Any, error::Error, sync::Arc};

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    BoxError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
// tower's error type for timeouts
use tower::timeout::error::Elapsed;
use tracing::error;

/// Message sent for every failure that does not carry an HTTP status.
pub const INTERNAL_SERVER_ERROR_MESSAGE: &str = "Internal server error";

/// Error surfaced by any stage of the request pipeline.
#[derive(Debug, Error)]
pub enum AppError {
    /// A failure tagged with the HTTP status the client should see.
    #[error("{message}")]
    Http { status: StatusCode, message: String },

    /// Anything else. Its message is logged, never sent.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::http(StatusCode::NOT_FOUND, "Not Found")
    }

    /// The status to relay, if this is a recognized HTTP error (4xx or 5xx).
    pub fn http_status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } if status.is_client_error() || status.is_server_error() => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// The JSON body the client receives for this error.
    pub fn to_body(&self) -> ErrorBody {
        match self.http_status() {
            Some(status) => ErrorBody {
                code: status.as_u16(),
                message: self.to_string(),
            },
            None => ErrorBody {
                code: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                message: INTERNAL_SERVER_ERROR_MESSAGE.to_string(),
            },
        }
    }
}

/// Marker left on a response whose handler failed.
/// `handle_server_error` renders it and the access log reads it.
#[derive(Clone, Debug)]
pub struct ServerError(pub Arc<AppError>);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status: StatusCode = self.http_status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response: Response = status.into_response();
        response.extensions_mut().insert(ServerError(Arc::new(self)));
        response
    }
}

/// Client-visible error shape.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

/// Last stage before the response leaves the application: logs the error and
/// writes `{code, message}`. Responses without an error pass through untouched.
pub async fn handle_server_error(req: Request, next: Next) -> Response {
    let response: Response = next.run(req).await;

    let Some(ServerError(err)) = response.extensions().get::<ServerError>().cloned() else {
        return response;
    };

    // Runs inside the request span, so this is the request-scoped logger
    error!(error = %err, details = ?err, "request failed");

    let body: ErrorBody = err.to_body();
    let json_body: Vec<u8> = serde_json::to_vec(&body).unwrap_or_else(|_| b"{}".to_vec());

    let (mut parts, _) = response.into_parts();
    parts.status = StatusCode::from_u16(body.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Response::from_parts(parts, Body::from(json_body))
}

/// Maps errors raised by tower layers into `AppError`. Body limits are
/// enforced by `parse_body`, which answers 413 itself.
pub async fn handle_global_error(err: BoxError) -> AppError {
    // 408 if the request took too long
    if err.is::<Elapsed>() {
        return AppError::http(StatusCode::REQUEST_TIMEOUT, "Request Timeout");
    }

    AppError::Internal(anyhow::anyhow!("Unhandled internal error: {err}"))
}

/// Response for a handler that panicked. The payload only goes to the log.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail: String = if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    AppError::Internal(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}

/// Helper function to find specific error type in error chain
pub fn find_cause<T: Error + 'static>(err: &dyn Error) -> Option<&T> {
    let mut source: Option<&dyn Error> = err.source();

    while let Some(s) = source {
        if let Some(typed) = s.downcast_ref::<T>() {
            return Some(typed);
        }
        source = s.source();
    }

    None
}
