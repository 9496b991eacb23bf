// Application assembly: the middleware chain in front of the SSR handler

use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer,
    http::Method,
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use tower::{timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
};

use crate::config::state::AppState;
use crate::core::lifecycle::recoverable_request;
use crate::middleware::{
    body_parser::parse_body,
    error_handler::{handle_global_error, handle_panic, handle_server_error},
    request_logger::log_requests,
    security_headers::security_headers,
    static_assets::serve_assets,
};
use crate::render::handler::ssr_handler;

/// Any origin, the common methods, whatever headers the browser asks for.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers(Any)
}

/// Builds the application router. Nothing is bound or read until the caller serves it.
///
/// Stages, outermost first:
/// request logging, security headers, compression, CORS, the error mapper,
/// panic catching, request timeout, body parsing, static assets (or the dev
/// asset server) and finally the SSR handler for every remaining route.
/// The request logger wraps everything so each request (errors included)
/// runs inside its span, and the error mapper sits inside compression so the
/// JSON it writes is what gets encoded.
pub fn create_app(state: AppState) -> Router {
    let request_timeout: Duration = Duration::from_secs(state.environment.default_timeout_seconds);

    Router::new()
        .fallback(ssr_handler)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn_with_state(state.clone(), log_requests))
                .layer(from_fn_with_state(state.clone(), security_headers))
                .layer(CompressionLayer::new())
                .layer(cors_layer())
                .layer(from_fn(handle_server_error))
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(from_fn(recoverable_request))
                .layer(HandleErrorLayer::new(handle_global_error))
                .layer(TimeoutLayer::new(request_timeout))
                .layer(from_fn_with_state(state.clone(), parse_body))
                .layer(from_fn_with_state(state.clone(), serve_assets)),
        )
        .with_state(state)
}
