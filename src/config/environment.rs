// Start of file: /src/config/environment.rs

// * Environment configuration, read once at startup and shared through AppState.
// * Parsing is kept separate from reading the process environment so it can be tested.

use std::{borrow::Cow, collections::HashMap, path::PathBuf};
// * anyhow for convenient error handling
use anyhow::{Context, Result};
use tracing::warn;

// ! Default values for environment variables (used if variables aren't set):
const DEFAULT_ENVIRONMENT: &str = "development";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_BODY_SIZE: usize = 2_097_152; // 2MB
const DEFAULT_TIMEOUT: u64 = 30; // 30 seconds
const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_BUILD_DIR: &str = "build";
const DEFAULT_APP_DIR: &str = "app";
const DEFAULT_HMR_PORT: u16 = 24678;
const DEFAULT_LOG_IGNORE_PATHS: &str = "/favicon.ico";

// * A struct containing all environment variables used by the app
#[derive(Clone, Debug)]
pub struct EnvironmentVariables {
    pub environment: Cow<'static, str>,
    pub host: Cow<'static, str>,
    pub port: u16,
    pub database_url: Option<String>,
    pub max_request_body_size: usize,
    pub default_timeout_seconds: u64,
    pub shutdown_timeout_ms: u64,
    pub build_dir: PathBuf,
    pub app_dir: PathBuf,
    pub hmr_port: u16,
    pub log_ignore_paths: Vec<String>,
}

impl Default for EnvironmentVariables {
    fn default() -> Self {
        Self {
            environment: Cow::Borrowed(DEFAULT_ENVIRONMENT),
            host: Cow::Borrowed(DEFAULT_HOST),
            port: DEFAULT_PORT,
            database_url: None,
            max_request_body_size: DEFAULT_MAX_BODY_SIZE,
            default_timeout_seconds: DEFAULT_TIMEOUT,
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT_MS,
            build_dir: PathBuf::from(DEFAULT_BUILD_DIR),
            app_dir: PathBuf::from(DEFAULT_APP_DIR),
            hmr_port: DEFAULT_HMR_PORT,
            log_ignore_paths: vec![DEFAULT_LOG_IGNORE_PATHS.to_string()],
        }
    }
}

impl EnvironmentVariables {
    // * Loads environment variables from the process.
    // * Only reads .env if NODE_ENV != "production".
    pub fn load() -> Result<Self> {
        // ? In non-production environments, attempt to load .env
        if std::env::var("NODE_ENV").unwrap_or_default() != "production" {
            dotenv::dotenv().ok();
        }

        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    // * Builds the configuration from a plain key/value map, providing defaults if missing
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let get_var = |key: &str| {
            vars.get(key)
                .map(String::as_str)
                .filter(|value| !value.trim().is_empty())
        };

        Ok(Self {
            environment: get_var("NODE_ENV")
                .map(|s| Cow::Owned(s.into()))
                .unwrap_or_else(|| {
                    warn!("Missing NODE_ENV, defaulting to '{DEFAULT_ENVIRONMENT}'");
                    Cow::Borrowed(DEFAULT_ENVIRONMENT)
                }),

            host: get_var("HOST")
                .map(|s| Cow::Owned(s.into()))
                .unwrap_or(Cow::Borrowed(DEFAULT_HOST)),

            port: get_var("PORT")
                .map(|s| s.parse().context("Invalid PORT value"))
                .transpose()?
                .unwrap_or(DEFAULT_PORT),

            database_url: get_var("DATABASE_URL").map(str::to_owned),

            max_request_body_size: get_var("MAX_REQUEST_BODY_SIZE")
                .map(|s| s.parse().context("Invalid MAX_REQUEST_BODY_SIZE"))
                .transpose()?
                .unwrap_or(DEFAULT_MAX_BODY_SIZE),

            default_timeout_seconds: get_var("DEFAULT_TIMEOUT_SECONDS")
                .map(|s| s.parse().context("Invalid DEFAULT_TIMEOUT_SECONDS"))
                .transpose()?
                .unwrap_or(DEFAULT_TIMEOUT),

            shutdown_timeout_ms: get_var("SHUTDOWN_TIMEOUT_MS")
                .map(|s| s.parse().context("Invalid SHUTDOWN_TIMEOUT_MS"))
                .transpose()?
                .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_MS),

            build_dir: PathBuf::from(get_var("BUILD_DIR").unwrap_or(DEFAULT_BUILD_DIR)),

            app_dir: PathBuf::from(get_var("APP_DIR").unwrap_or(DEFAULT_APP_DIR)),

            hmr_port: get_var("HMR_PORT")
                .map(|s| s.parse().context("Invalid HMR_PORT"))
                .transpose()?
                .unwrap_or(DEFAULT_HMR_PORT),

            log_ignore_paths: get_var("LOG_IGNORE_PATHS")
                .unwrap_or(DEFAULT_LOG_IGNORE_PATHS)
                .split(',')
                .map(str::trim)
                .filter(|path| !path.is_empty())
                .map(str::to_owned)
                .collect(),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_test(&self) -> bool {
        self.environment == "test"
    }

    /// Address the listener binds to when no socket is handed over.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Directory with the compiled client bundle (`build/client`).
    pub fn client_dir(&self) -> PathBuf {
        self.build_dir.join("client")
    }

    /// Document shell produced by the production build.
    pub fn server_build_path(&self) -> PathBuf {
        self.build_dir.join("server").join("index.html")
    }

    /// Paths that never produce an access log entry.
    pub fn ignores_path(&self, path: &str) -> bool {
        self.log_ignore_paths.iter().any(|ignored| ignored == path)
    }
}


// End of file: /src/config/environment.rs
