// Rendering builds: what the SSR handler renders with, and where it comes from.

use std::{path::Path, sync::Arc};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use axum::{
    extract::Request,
    http::{Method, StatusCode},
    response::{Html, IntoResponse, Response},
};

use crate::database::Database;
use crate::middleware::{body_parser::ParsedBody, error_handler::AppError, request_logger::RequestLogger};
use crate::render::{dev_server::DevAssetServer, pages};

/// Marker replaced with page-specific `<head>` content.
pub const HEAD_OUTLET: &str = "<!--app-head-->";
/// Marker replaced with the rendered page markup.
pub const BODY_OUTLET: &str = "<!--app-html-->";

/// Per-request dependencies handed to route code.
#[derive(Clone, Debug)]
pub struct LoadContext {
    pub logger: RequestLogger,
    pub database: Option<Database>,
    pub body: Option<ParsedBody>,
}

/// A compiled front end able to answer SSR requests.
#[async_trait]
pub trait ServerBuild: Send + Sync {
    async fn handle_request(&self, request: Request, context: LoadContext) -> Result<Response, AppError>;
}

/// HTML document every page is rendered into.
#[derive(Clone, Debug)]
pub struct DocumentShell {
    template: Arc<str>,
}

impl DocumentShell {
    pub fn parse(template: impl Into<String>) -> Result<Self> {
        let template: String = template.into();
        for outlet in [HEAD_OUTLET, BODY_OUTLET] {
            if !template.contains(outlet) {
                bail!("Document shell is missing the {outlet} marker");
            }
        }

        Ok(Self {
            template: template.into(),
        })
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path: &Path = path.as_ref();
        let template: String = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read document shell {}", path.display()))?;

        Self::parse(template).with_context(|| format!("Invalid document shell {}", path.display()))
    }

    /// Returns a shell with `markup` placed right before the head outlet.
    pub fn with_head_markup(&self, markup: &str) -> Self {
        Self {
            template: self
                .template
                .replacen(HEAD_OUTLET, &format!("{markup}{HEAD_OUTLET}"), 1)
                .into(),
        }
    }

    pub fn render(&self, head: &str, body: &str) -> String {
        self.template
            .replacen(HEAD_OUTLET, head, 1)
            .replacen(BODY_OUTLET, body, 1)
    }
}

/// The application's pages rendered into a document shell.
#[derive(Clone, Debug)]
pub struct ShellBuild {
    shell: DocumentShell,
}

impl ShellBuild {
    pub fn new(shell: DocumentShell) -> Self {
        Self { shell }
    }

    /// Loads the precompiled production build.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(DocumentShell::load(path).await?))
    }
}

#[async_trait]
impl ServerBuild for ShellBuild {
    async fn handle_request(&self, request: Request, context: LoadContext) -> Result<Response, AppError> {
        if request.method() != Method::GET && request.method() != Method::HEAD {
            return Err(AppError::http(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed"));
        }

        // Owned so the request itself is not held across the render
        let path: String = request.uri().path().to_owned();
        let page: pages::Page = pages::render_route(&path, &context).await?;
        let html: String = self.shell.render(&page.head, &page.body);

        Ok((page.status, Html(html)).into_response())
    }
}

/// Where the SSR handler gets its build from.
#[derive(Clone)]
pub enum BuildSource {
    /// Loaded once at startup.
    Compiled(Arc<dyn ServerBuild>),
    /// Reloaded through the development asset server on every request.
    Dev(DevAssetServer),
}

impl BuildSource {
    pub async fn resolve(&self) -> Result<Arc<dyn ServerBuild>> {
        match self {
            Self::Compiled(build) => Ok(build.clone()),
            Self::Dev(dev_server) => dev_server.ssr_load_build().await,
        }
    }

    pub fn dev_server(&self) -> Option<&DevAssetServer> {
        match self {
            Self::Dev(dev_server) => Some(dev_server),
            Self::Compiled(_) => None,
        }
    }
}
