// Server entry point: builds the application and runs it until shutdown

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::Router;
use listenfd::ListenFd;
use tokio::net::TcpListener;
use tracing::{info, instrument::WithSubscriber};

use crate::config::{environment::EnvironmentVariables, state::AppState};
use crate::core::{
    app::create_app,
    lifecycle::{shutdown_signal, spawn_background, LifecycleManager, ServerHandle, ShutdownOutcome},
    logging::Logger,
};
use crate::database::Database;
use crate::render::{
    build::{BuildSource, ShellBuild},
    dev_server::DevAssetServer,
};

/// Takes the listener handed over by a socket-activation parent, or binds a new one.
pub async fn setup_listener(env: &EnvironmentVariables) -> Result<TcpListener> {
    let mut listenfd: ListenFd = ListenFd::from_env();

    let listener: TcpListener = match listenfd.take_tcp_listener(0)? {
        Some(std_listener) => {
            std_listener.set_nonblocking(true)?;
            TcpListener::from_std(std_listener)?
        }
        None => {
            let addr: String = env.bind_address();
            TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {addr}"))?
        }
    };

    Ok(listener)
}

/// Production serves the precompiled build; every other environment goes
/// through the development asset server.
pub async fn load_build(env: &EnvironmentVariables) -> Result<BuildSource> {
    if env.is_production() {
        let build: ShellBuild = ShellBuild::load(env.server_build_path()).await?;
        return Ok(BuildSource::Compiled(Arc::new(build)));
    }

    let dev_server: DevAssetServer = DevAssetServer::create(env).await?;
    dev_server.ssr_load_build().await?;
    Ok(BuildSource::Dev(dev_server))
}

/// Creates the pool when `DATABASE_URL` is set and warms it up in the background.
/// A bad URL is fatal; an unreachable database only gets logged.
pub fn connect_database(env: &EnvironmentVariables) -> Result<Option<Database>> {
    let Some(database_url) = env.database_url.as_deref() else {
        info!("DATABASE_URL not set, running without a database");
        return Ok(None);
    };

    let database: Database = Database::connect(database_url)?;
    let warm_up: Database = database.clone();
    spawn_background("database warm-up", async move { warm_up.ping().await });

    Ok(Some(database))
}

/// The address is only shown when the dev asset server is running.
pub fn ready_message(build: &BuildSource, local_addr: SocketAddr) -> String {
    match build.dev_server() {
        Some(_) => format!("Server is running! http://localhost:{}", local_addr.port()),
        None => "Server is running!".to_string(),
    }
}

/// Starts the server and blocks until it has shut down.
pub async fn start(environment: Arc<EnvironmentVariables>, logger: Logger) -> Result<ShutdownOutcome> {
    let dispatch = logger.dispatch().clone();

    async move {
        let build: BuildSource = load_build(&environment).await?;
        let database: Option<Database> = connect_database(&environment)?;

        let ready_build: BuildSource = build.clone();
        let state: AppState = AppState::new(environment.clone(), logger.clone(), build, database.clone());
        let app: Router = create_app(state);

        let listener: TcpListener = setup_listener(&environment).await?;
        let server: ServerHandle = ServerHandle::serve(listener, app)?;

        info!("{}", ready_message(&ready_build, server.local_addr()));

        let outcome: ShutdownOutcome = LifecycleManager::new(logger)
            .with_database(database)
            .with_timeout(Duration::from_millis(environment.shutdown_timeout_ms))
            .run(server, shutdown_signal())
            .await;

        Ok(outcome)
    }
    .with_subscriber(dispatch)
    .await
}
