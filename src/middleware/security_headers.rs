// Security response headers (the usual hardening set plus a Content-Security-Policy).

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::config::state::AppState;

const X_POWERED_BY: HeaderName = HeaderName::from_static("x-powered-by");

/// Precomputed header set, built once when the application is assembled.
#[derive(Clone, Debug)]
pub struct SecurityHeaders {
    headers: Arc<HeaderMap>,
}

impl SecurityHeaders {
    /// `dev_socket_origin` is the live-reload WebSocket origin of the
    /// development asset server, when one is running.
    pub fn new(dev_socket_origin: Option<&str>) -> Self {
        let csp: String = content_security_policy(dev_socket_origin);

        let mut headers: HeaderMap = HeaderMap::new();
        let pairs: [(&'static str, String); 12] = [
            ("content-security-policy", csp),
            ("cross-origin-opener-policy", "same-origin".into()),
            ("cross-origin-resource-policy", "same-origin".into()),
            ("origin-agent-cluster", "?1".into()),
            ("referrer-policy", "no-referrer".into()),
            ("strict-transport-security", "max-age=15552000; includeSubDomains".into()),
            ("x-content-type-options", "nosniff".into()),
            ("x-dns-prefetch-control", "off".into()),
            ("x-download-options", "noopen".into()),
            ("x-frame-options", "SAMEORIGIN".into()),
            ("x-permitted-cross-domain-policies", "none".into()),
            ("x-xss-protection", "0".into()),
        ];

        for (name, value) in pairs {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(HeaderName::from_static(name), value);
            }
        }

        Self {
            headers: Arc::new(headers),
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Adds every header the response does not already set and strips
    /// framework fingerprinting.
    pub fn apply(&self, response: &mut Response) {
        let target: &mut HeaderMap = response.headers_mut();
        target.remove(X_POWERED_BY);

        for (name, value) in self.headers.iter() {
            if !target.contains_key(name) {
                target.insert(name.clone(), value.clone());
            }
        }
    }
}

fn content_security_policy(dev_socket_origin: Option<&str>) -> String {
    let connect_src: String = match dev_socket_origin {
        Some(origin) => format!("connect-src 'self' {origin}"),
        None => "connect-src 'self'".to_string(),
    };

    [
        "default-src 'self'",
        "base-uri 'self'",
        connect_src.as_str(),
        "font-src 'self' https: data:",
        "form-action 'self'",
        "frame-ancestors 'self'",
        "img-src 'self' data:",
        "object-src 'none'",
        "script-src 'self' 'unsafe-inline'",
        "script-src-attr 'none'",
        "style-src 'self' 'unsafe-inline'",
        "upgrade-insecure-requests",
    ]
    .join(";")
}

pub async fn security_headers(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let mut response: Response = next.run(req).await;
    state.security_headers.apply(&mut response);
    response
}
