// Static file serving in front of the SSR handler. Files that exist are
// served with cache headers; anything else falls through to the next stage.

use std::path::Path;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{self, header::CACHE_CONTROL, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::error;

use crate::config::state::AppState;
use crate::render::build::BuildSource;

/// Fingerprinted build output lives under this prefix.
pub const ASSETS_PREFIX: &str = "/assets/";
pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";
pub const SHORT_CACHE_CONTROL: &str = "public, max-age=3600";

/// The compiled client bundle (`build/client`).
#[derive(Clone, Debug)]
pub struct StaticAssets {
    dir: ServeDir,
}

impl StaticAssets {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            dir: ServeDir::new(root).append_index_html_on_directories(false),
        }
    }

    /// Serves the file for `req`, or returns `None` when there is none.
    pub async fn serve(&self, req: &http::Request<()>) -> Option<Response> {
        let mut response: Response = try_serve_dir(&self.dir, req).await?;

        let cache_control: &'static str = if req.uri().path().starts_with(ASSETS_PREFIX) {
            IMMUTABLE_CACHE_CONTROL
        } else {
            SHORT_CACHE_CONTROL
        };
        response
            .headers_mut()
            .insert(CACHE_CONTROL, HeaderValue::from_static(cache_control));

        Some(response)
    }
}

/// Runs `dir` against a body-less copy of the request head. Only GET and HEAD
/// are served; misses, directories and other methods yield `None`.
pub async fn try_serve_dir(dir: &ServeDir, req: &http::Request<()>) -> Option<Response> {
    if req.method() != Method::GET && req.method() != Method::HEAD {
        return None;
    }

    let mut lookup = http::Request::builder()
        .method(req.method().clone())
        .uri(req.uri().clone())
        .version(req.version());
    if let Some(headers) = lookup.headers_mut() {
        headers.extend(req.headers().clone());
    }
    let lookup: Request = lookup.body(Body::empty()).ok()?;

    match dir.clone().oneshot(lookup).await {
        Ok(response) if response.status() == StatusCode::NOT_FOUND => None,
        Ok(response) if response.status() == StatusCode::METHOD_NOT_ALLOWED => None,
        Ok(response) => Some(response.map(Body::new)),
        Err(err) => {
            error!("Static file lookup failed: {err}");
            None
        }
    }
}

/// Static assets in production, the dev asset server otherwise.
/// The body stays aside while files are looked up; only the head is borrowed
/// across the lookup.
pub async fn serve_assets(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let (parts, body) = req.into_parts();
    let head: http::Request<()> = http::Request::from_parts(parts, ());

    let served: Option<Response> = match &state.build {
        BuildSource::Dev(dev_server) => dev_server.serve(&head).await,
        BuildSource::Compiled(_) => state.static_assets.serve(&head).await,
    };

    match served {
        Some(response) => response,
        None => {
            let (parts, ()) = head.into_parts();
            next.run(Request::from_parts(parts, body)).await
        }
    }
}
