//! tests/mod.rs
//! Shared test helpers: spawn the application on an ephemeral port with a
//! throwaway build directory, optionally capturing its JSON log lines.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    io::Write,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    extract::Request,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json, Router,
};
use axum_ssr_server::{
    config::{environment::EnvironmentVariables, state::AppState},
    core::{app::create_app, lifecycle::ServerHandle, logging::Logger, server::load_build},
    middleware::error_handler::AppError,
    render::build::{BuildSource, LoadContext, ServerBuild},
};
use serde_json::Value;
use tokio::net::TcpListener;

pub const SHELL: &str = "<!DOCTYPE html><html><head><!--app-head--></head><body><!--app-html--></body></html>";
pub const SECRET: &str = "connection refused for postgres://app:hunter2@db/app";

/// How long `/slow` takes to answer.
pub const SLOW_RESPONSE: Duration = Duration::from_millis(1_500);

/// Log sink shared between the logger and the test.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    /// Every JSON log line written so far.
    pub fn lines(&self) -> Vec<Value> {
        let bytes: Vec<u8> = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    /// Access log entries (`request completed` / `request errored`) for `path`.
    pub fn access_entries(&self, path: &str) -> Vec<Value> {
        self.lines()
            .into_iter()
            .filter(|line| {
                let message: &str = line["fields"]["message"].as_str().unwrap_or_default();
                message.starts_with("request ") && message != "request failed"
            })
            .filter(|line| line["span"]["path"] == path)
            .collect()
    }
}

/// Build answering fixed routes, used to drive every error path.
pub struct ScriptedBuild;

#[async_trait]
impl ServerBuild for ScriptedBuild {
    async fn handle_request(&self, request: Request, context: LoadContext) -> Result<Response, AppError> {
        let path: String = request.uri().path().to_owned();
        match path.as_str() {
            "/" => Ok(Html("<h1>Hello!</h1>").into_response()),
            "/boom" => Err(AppError::Internal(anyhow::anyhow!(SECRET))),
            "/teapot" => Err(AppError::http(StatusCode::IM_A_TEAPOT, "Short and stout")),
            "/redirect-error" => Err(AppError::http(StatusCode::FOUND, "not an error status")),
            "/panic" => panic!("render exploded"),
            "/slow" => {
                tokio::time::sleep(SLOW_RESPONSE).await;
                Ok(Html("<h1>Finally</h1>").into_response())
            }
            "/echo" => {
                let body: Value = context.body.map(|parsed| parsed.0).unwrap_or(Value::Null);
                Ok(Json(body).into_response())
            }
            _ => Err(AppError::not_found()),
        }
    }
}

pub struct TestApp {
    pub address: String,
    pub logs: LogBuffer,
    pub build_dir: PathBuf,
}

/// Writes a production build (client assets plus the server document shell)
/// to a fresh temporary directory.
pub fn create_build_dir() -> PathBuf {
    let build_dir: PathBuf = std::env::temp_dir().join(format!("ssr-build-{}", uuid::Uuid::new_v4()));
    let client: PathBuf = build_dir.join("client");

    std::fs::create_dir_all(client.join("assets")).unwrap();
    std::fs::create_dir_all(build_dir.join("server")).unwrap();
    std::fs::write(client.join("assets").join("app-abc123.js"), "console.log('app');").unwrap();
    std::fs::write(client.join("favicon.ico"), b"icon").unwrap();
    std::fs::write(client.join("robots.txt"), "User-agent: *").unwrap();
    std::fs::write(build_dir.join("server").join("index.html"), SHELL).unwrap();

    build_dir
}

/// Production configuration rooted at `build_dir`, with `overrides` applied.
pub fn test_environment(build_dir: &PathBuf, overrides: &[(&str, &str)]) -> EnvironmentVariables {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("NODE_ENV".to_string(), "production".to_string()),
        ("BUILD_DIR".to_string(), build_dir.display().to_string()),
    ]);
    for (key, value) in overrides {
        vars.insert(key.to_string(), value.to_string());
    }

    EnvironmentVariables::from_vars(&vars).expect("Invalid test environment")
}

/// Router for `env`, using the scripted build unless `shell_build` is set.
pub async fn build_router(env: EnvironmentVariables, logger: Logger, shell_build: bool) -> Router {
    let build: BuildSource = if shell_build {
        load_build(&env).await.expect("Failed to load production build")
    } else {
        BuildSource::Compiled(Arc::new(ScriptedBuild))
    };

    create_app(AppState::new(Arc::new(env), logger, build, None))
}

/// Binds an ephemeral port and starts serving `app`.
pub async fn serve(app: Router) -> ServerHandle {
    let listener: TcpListener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    ServerHandle::serve(listener, app).expect("Failed to start server")
}

/// Writes a front-end source directory: the document shell and one public file.
pub fn create_app_dir() -> PathBuf {
    let app_dir: PathBuf = std::env::temp_dir().join(format!("ssr-app-{}", uuid::Uuid::new_v4()));

    std::fs::create_dir_all(app_dir.join("public")).unwrap();
    std::fs::write(app_dir.join("index.html"), SHELL).unwrap();
    std::fs::write(app_dir.join("public").join("logo.txt"), "logo").unwrap();

    app_dir
}

/// Spawns the app in development mode, rendering through the dev asset server.
pub async fn spawn_dev_app(hmr_port: u16) -> (String, PathBuf) {
    let app_dir: PathBuf = create_app_dir();
    let hmr_port: String = hmr_port.to_string();
    let vars: HashMap<String, String> = HashMap::from([
        ("NODE_ENV".to_string(), "development".to_string()),
        ("APP_DIR".to_string(), app_dir.display().to_string()),
        ("HMR_PORT".to_string(), hmr_port),
    ]);
    let env: EnvironmentVariables = EnvironmentVariables::from_vars(&vars).expect("Invalid dev environment");

    let build: BuildSource = load_build(&env).await.expect("Failed to start the dev asset server");
    let logger: Logger = Logger::with_writer("off", std::io::sink);
    let app: Router = create_app(AppState::new(Arc::new(env), logger, build, None));

    let server: ServerHandle = serve(app).await;
    let address: String = format!("http://{}", server.local_addr());
    std::mem::forget(server);

    (address, app_dir)
}

/// Spawns the app with the scripted build and returns its base URL.
pub async fn spawn_app() -> String {
    spawn_app_with(&[], false).await.address
}

/// Spawns the app with configuration `overrides`, capturing logs at `info`.
pub async fn spawn_app_with(overrides: &[(&str, &str)], shell_build: bool) -> TestApp {
    let build_dir: PathBuf = create_build_dir();
    let env: EnvironmentVariables = test_environment(&build_dir, overrides);

    let logs: LogBuffer = LogBuffer::default();
    let writer: LogBuffer = logs.clone();
    let logger: Logger = Logger::with_writer("info", move || writer.clone());

    let app: Router = build_router(env, logger, shell_build).await;
    let server: ServerHandle = serve(app).await;
    let address: String = format!("http://{}", server.local_addr());

    // Stays up for the rest of the test
    std::mem::forget(server);

    TestApp {
        address,
        logs,
        build_dir,
    }
}
