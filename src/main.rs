// Start of file: src/main.rs

use std::sync::Arc;

use tracing::error;

use axum_ssr_server::{
    config::environment::EnvironmentVariables,
    core::{lifecycle::install_process_handlers, logging::Logger, server},
};

#[tokio::main]
async fn main() {
    let environment: EnvironmentVariables = match EnvironmentVariables::load() {
        Ok(environment) => environment,
        Err(err) => {
            // No configuration yet, so log with the development defaults
            let fallback: Logger = Logger::for_environment(&EnvironmentVariables::default());
            fallback.in_scope(|| error!("Failed to load configuration: {err:#}"));
            std::process::exit(1);
        }
    };

    let logger: Logger = Logger::for_environment(&environment);
    if let Err(err) = logger.install_global() {
        logger.in_scope(|| error!("{err:#}"));
    }
    install_process_handlers(&logger);

    match server::start(Arc::new(environment), logger.clone()).await {
        Ok(outcome) => std::process::exit(outcome.exit_code()),
        Err(err) => {
            logger.in_scope(|| error!("Failed to start server: {err:#}"));
            std::process::exit(1);
        }
    }
}

// End of file: src/main.rs
