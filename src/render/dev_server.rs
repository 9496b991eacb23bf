// Development asset server, used whenever NODE_ENV is not "production".
// Serves the front end's public files without caching, reloads the document
// shell on every request and injects a small live-reload client into it.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::UNIX_EPOCH,
};

use anyhow::{bail, Context, Result};
use axum::{
    http::{
        self,
        header::{CACHE_CONTROL, CONTENT_TYPE},
        HeaderValue, Method,
    },
    response::{IntoResponse, Response},
};
use tower_http::services::ServeDir;
use tracing::{debug, info};

use crate::config::environment::EnvironmentVariables;
use crate::middleware::static_assets::try_serve_dir;
use crate::render::build::{DocumentShell, ServerBuild, ShellBuild};

pub const CLIENT_PATH: &str = "/@dev/client.js";
pub const VERSION_PATH: &str = "/@dev/version";
const NO_CACHE: &str = "no-cache";

const CLIENT_SCRIPT: &str = r#"const versionUrl = '/@dev/version';
const current = await fetch(versionUrl, { cache: 'no-store' }).then((res) => res.text());
setInterval(async () => {
  try {
    const latest = await fetch(versionUrl, { cache: 'no-store' }).then((res) => res.text());
    if (latest !== current) location.reload();
  } catch (_) {
    // server restarting
  }
}, 1000);
"#;

#[derive(Clone, Debug)]
pub struct DevAssetServer {
    root: Arc<PathBuf>,
    public: ServeDir,
    hmr_port: u16,
}

impl DevAssetServer {
    /// Starts the dev server in middleware mode. Fails when the front-end
    /// source directory or its document shell is missing.
    pub async fn create(env: &EnvironmentVariables) -> Result<Self> {
        let root: PathBuf = env.app_dir.clone();
        let metadata = tokio::fs::metadata(&root)
            .await
            .with_context(|| format!("Front-end source directory {} is not readable", root.display()))?;
        if !metadata.is_dir() {
            bail!("Front-end source path {} is not a directory", root.display());
        }

        let server: Self = Self {
            public: ServeDir::new(root.join("public")).append_index_html_on_directories(false),
            root: Arc::new(root),
            hmr_port: env.hmr_port,
        };

        // Fail at startup rather than on the first request
        DocumentShell::load(server.shell_path()).await?;

        info!(root = %server.root.display(), "Development asset server ready");
        Ok(server)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn shell_path(&self) -> PathBuf {
        self.root.join("index.html")
    }

    /// Origin of the live-reload socket, allowed by the content security policy.
    pub fn socket_origin(&self) -> String {
        format!("ws://localhost:{}", self.hmr_port)
    }

    /// Loads the rendering build from source, picking up any edit since the last request.
    pub async fn ssr_load_build(&self) -> Result<Arc<dyn ServerBuild>> {
        let shell: DocumentShell = DocumentShell::load(self.shell_path()).await?;
        Ok(Arc::new(ShellBuild::new(self.transform_shell(&shell))))
    }

    pub fn transform_shell(&self, shell: &DocumentShell) -> DocumentShell {
        shell.with_head_markup(&format!("<script type=\"module\" src=\"{CLIENT_PATH}\"></script>"))
    }

    /// Answers dev endpoints and public files, `None` for everything else.
    pub async fn serve(&self, req: &http::Request<()>) -> Option<Response> {
        if req.method() == Method::GET && req.uri().path() == CLIENT_PATH {
            let headers = [(CONTENT_TYPE, "text/javascript; charset=utf-8")];
            return Some(no_cache((headers, CLIENT_SCRIPT)));
        }

        if req.method() == Method::GET && req.uri().path() == VERSION_PATH {
            let version: String = match self.source_version().await {
                Ok(version) => version.to_string(),
                Err(err) => {
                    debug!("Could not compute source version: {err:#}");
                    "0".to_string()
                }
            };
            let headers = [(CONTENT_TYPE, "text/plain; charset=utf-8")];
            return Some(no_cache((headers, version)));
        }

        let mut response: Response = try_serve_dir(&self.public, req).await?;
        response
            .headers_mut()
            .insert(CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));
        Some(response)
    }

    /// Latest modification time (ms since epoch) across the source tree.
    pub async fn source_version(&self) -> Result<u128> {
        let mut latest: u128 = 0;
        let mut pending: Vec<PathBuf> = vec![self.root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .with_context(|| format!("Failed to list {}", dir.display()))?;

            while let Some(entry) = entries.next_entry().await? {
                let metadata = entry.metadata().await?;
                if metadata.is_dir() {
                    pending.push(entry.path());
                    continue;
                }
                let modified: u128 = metadata
                    .modified()?
                    .duration_since(UNIX_EPOCH)
                    .map(|elapsed| elapsed.as_millis())
                    .unwrap_or_default();
                latest = latest.max(modified);
            }
        }

        Ok(latest)
    }
}

fn no_cache(response: impl IntoResponse) -> Response {
    let mut response: Response = response.into_response();
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));
    response
}
