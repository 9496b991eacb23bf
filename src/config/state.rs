// Application state shared by every middleware and handler

use std::sync::Arc;

use crate::config::environment::EnvironmentVariables;
use crate::core::logging::Logger;
use crate::database::Database;
use crate::middleware::{security_headers::SecurityHeaders, static_assets::StaticAssets};
use crate::render::build::BuildSource;

#[derive(Clone)]
pub struct AppState {
    pub environment: Arc<EnvironmentVariables>,
    pub logger: Logger,
    pub database: Option<Database>,
    pub build: BuildSource,
    pub security_headers: SecurityHeaders,
    pub static_assets: StaticAssets,
}

impl AppState {
    /// Bundles the startup products. The dev asset server, if any, is the one
    /// carried by `build`.
    pub fn new(
        environment: Arc<EnvironmentVariables>,
        logger: Logger,
        build: BuildSource,
        database: Option<Database>,
    ) -> Self {
        let dev_socket_origin: Option<String> = build.dev_server().map(|dev| dev.socket_origin());
        let security_headers: SecurityHeaders = SecurityHeaders::new(dev_socket_origin.as_deref());
        let static_assets: StaticAssets = StaticAssets::new(environment.client_dir());

        Self {
            environment,
            logger,
            database,
            build,
            security_headers,
            static_assets,
        }
    }
}
