// Access logging. Every request runs inside its own span on the application
// logger, and one entry is written when the response is ready.

use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tracing::{error, info, info_span, instrument::WithSubscriber, warn, Instrument, Level, Span};
use uuid::Uuid;

use crate::config::state::AppState;
use crate::middleware::error_handler::ServerError;

/// Request-scoped logger handle, available to handlers through request
/// extensions and the SSR load context.
#[derive(Clone, Debug)]
pub struct RequestLogger {
    pub id: Uuid,
    pub span: Span,
}

impl RequestLogger {
    /// Handle for code running outside the logging middleware.
    pub fn detached() -> Self {
        Self {
            id: Uuid::new_v4(),
            span: Span::none(),
        }
    }
}

/// Severity of the access log entry for a finished response.
pub fn access_log_level(status: StatusCode, has_error: bool) -> Level {
    if status.is_client_error() {
        return Level::WARN;
    }
    if status.is_server_error() || has_error {
        return Level::ERROR;
    }
    Level::INFO
}

pub async fn log_requests(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let start_time: Instant = Instant::now();
    let id: Uuid = Uuid::new_v4();
    let method: String = req.method().to_string();
    let path: String = req.uri().path().to_owned();

    let span: Span = state
        .logger
        .in_scope(|| info_span!("request", %id, method = %method, path = %path));

    req.extensions_mut().insert(RequestLogger {
        id,
        span: span.clone(),
    });

    let response: Response = next
        .run(req)
        .instrument(span.clone())
        .with_subscriber(state.logger.dispatch().clone())
        .await;

    if state.environment.ignores_path(&path) {
        return response;
    }

    let status: StatusCode = response.status();
    let has_error: bool = response.extensions().get::<ServerError>().is_some();
    let elapsed_ms: u64 = start_time.elapsed().as_millis() as u64;
    let status_code: u16 = status.as_u16();

    let level: Level = access_log_level(status, has_error);
    state.logger.in_scope(|| {
        span.in_scope(|| {
            if level == Level::ERROR {
                error!(status = status_code, elapsed_ms, "request errored");
            } else if level == Level::WARN {
                warn!(status = status_code, elapsed_ms, "request completed");
            } else {
                info!(status = status_code, elapsed_ms, "request completed");
            }
        })
    });

    response
}
