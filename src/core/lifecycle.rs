// Server lifecycle: graceful shutdown on signals with a hard deadline, and
// process-level handling of background failures and uncaught panics.

use std::{
    any::Any,
    future::Future,
    io,
    net::SocketAddr,
    time::Duration,
};

use axum::{extract::Request, middleware::Next, response::Response, Router};
use tokio::{
    net::TcpListener,
    signal,
    sync::{oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, instrument::WithSubscriber};

use crate::core::logging::Logger;
use crate::database::Database;

/// How long a graceful shutdown may take before the process is forced out.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Running,
    ShuttingDown,
    Closed,
    ForcedExit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Listener closed and pool drained.
    Closed,
    /// The listener failed while running or closing.
    Failed,
    /// The deadline fired first.
    TimedOut,
}

impl ShutdownOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Closed => 0,
            Self::Failed | Self::TimedOut => 1,
        }
    }
}

/// Resolves on Ctrl+C (SIGINT) or SIGTERM.
pub async fn shutdown_signal() -> ShutdownSignal {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!("Failed to install terminate signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => ShutdownSignal::Interrupt,
        _ = terminate => ShutdownSignal::Terminate,
    }
}

/// A running HTTP server that can be asked to stop accepting connections.
pub struct ServerHandle {
    local_addr: SocketAddr,
    close_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<io::Result<()>>,
}

impl ServerHandle {
    /// Starts serving `app` on `listener` in a background task.
    pub fn serve(listener: TcpListener, app: Router) -> io::Result<Self> {
        let local_addr: SocketAddr = listener.local_addr()?;
        let (close_tx, close_rx) = oneshot::channel::<()>();

        let task: JoinHandle<io::Result<()>> = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = close_rx.await;
                })
                .await
        });

        Ok(Self {
            local_addr,
            close_tx: Some(close_tx),
            task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting new connections; in-flight requests keep running.
    pub fn close(&mut self) {
        if let Some(close_tx) = self.close_tx.take() {
            let _ = close_tx.send(());
        }
    }

    /// Waits until the server task has finished.
    pub async fn closed(&mut self) -> io::Result<()> {
        match (&mut self.task).await {
            Ok(result) => result,
            Err(join_err) => Err(io::Error::other(join_err)),
        }
    }
}

/// Drives shutdown: `Running → ShuttingDown → {Closed | ForcedExit}`.
pub struct LifecycleManager {
    logger: Logger,
    database: Option<Database>,
    timeout: Duration,
    state: watch::Sender<LifecycleState>,
}

impl LifecycleManager {
    pub fn new(logger: Logger) -> Self {
        let (state, _) = watch::channel(LifecycleState::Running);

        Self {
            logger,
            database: None,
            timeout: SHUTDOWN_TIMEOUT,
            state,
        }
    }

    /// Pool drained after the listener closes.
    pub fn with_database(mut self, database: Option<Database>) -> Self {
        self.database = database;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    fn transition(&self, next: LifecycleState) {
        let previous: LifecycleState = self.state.send_replace(next);
        debug!(?previous, ?next, "Lifecycle transition");
    }

    /// Waits for `signal`, then shuts `server` down within the deadline.
    /// The caller exits the process with the outcome's exit code.
    pub async fn run<F>(self, server: ServerHandle, signal: F) -> ShutdownOutcome
    where
        F: Future<Output = ShutdownSignal>,
    {
        let dispatch = self.logger.dispatch().clone();
        self.drive(server, signal).with_subscriber(dispatch).await
    }

    async fn drive<F>(&self, mut server: ServerHandle, signal: F) -> ShutdownOutcome
    where
        F: Future<Output = ShutdownSignal>,
    {
        tokio::select! {
            received = signal => {
                info!(signal = ?received, "Received shutdown signal, shutting down gracefully");
            }
            result = server.closed() => {
                match result {
                    Ok(()) => error!("Server stopped unexpectedly"),
                    Err(err) => error!("Server failed: {err}"),
                }
                self.transition(LifecycleState::ForcedExit);
                return ShutdownOutcome::Failed;
            }
        }

        self.transition(LifecycleState::ShuttingDown);
        server.close();

        // The deadline covers both the listener and the pool
        let graceful = async {
            server.closed().await?;
            if let Some(database) = &self.database {
                database.shutdown().await;
            }
            Ok::<(), io::Error>(())
        };

        match tokio::time::timeout(self.timeout, graceful).await {
            Ok(Ok(())) => {
                info!("Server closed successfully");
                self.transition(LifecycleState::Closed);
                ShutdownOutcome::Closed
            }
            Ok(Err(err)) => {
                error!("Error during server close: {err}");
                self.transition(LifecycleState::ForcedExit);
                ShutdownOutcome::Failed
            }
            Err(_) => {
                error!(timeout_ms = self.timeout.as_millis() as u64, "Forced shutdown due to timeout");
                self.transition(LifecycleState::ForcedExit);
                ShutdownOutcome::TimedOut
            }
        }
    }
}

/* ------------------------------------------------------------------------
   PROCESS-LEVEL FAILURES
   ------------------------------------------------------------------------ */

/// Pipeline stages whose panics are already reported elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureScope {
    /// Caught by the request pipeline and answered with a 500.
    Request,
    /// Reported by `spawn_background`.
    Background,
}

tokio::task_local! {
    static FAILURE_SCOPE: FailureScope;
}

/// Runs `future` inside `scope`.
pub async fn recoverable<F: Future>(scope: FailureScope, future: F) -> F::Output {
    FAILURE_SCOPE.scope(scope, future).await
}

/// The scope of the task currently running on this thread, if any.
pub fn current_failure_scope() -> Option<FailureScope> {
    FAILURE_SCOPE.try_with(|scope| *scope).ok()
}

/// Marks the rest of the request pipeline as a recoverable scope.
pub async fn recoverable_request(req: Request, next: Next) -> Response {
    recoverable(FailureScope::Request, next.run(req)).await
}

/// Spawns a task whose failure (an error or a panic) is logged and otherwise ignored.
pub fn spawn_background<F>(name: &'static str, task: F) -> JoinHandle<()>
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let handle: JoinHandle<anyhow::Result<()>> =
        tokio::spawn(recoverable(FailureScope::Background, task).with_current_subscriber());

    let watcher = async move {
        match handle.await {
            Ok(Ok(())) => debug!(task = name, "Background task finished"),
            Ok(Err(err)) => error!(task = name, "Unhandled rejection: {err:#}"),
            Err(join_err) if join_err.is_panic() => {
                error!(task = name, "Unhandled rejection: background task panicked")
            }
            Err(_) => debug!(task = name, "Background task cancelled"),
        }
    };

    tokio::spawn(watcher.with_current_subscriber())
}

/// Installs the panic hook. A panic inside a tokio task is logged and the
/// task's owner decides what happens next; a panic anywhere else (the main
/// future, a plain thread) is logged and ends the process with status 1.
pub fn install_process_handlers(logger: &Logger) {
    install_panic_hook_with(logger.clone(), exit_process);
}

fn exit_process(code: i32) {
    std::process::exit(code)
}

/// Same as `install_process_handlers` with a custom exit action.
pub fn install_panic_hook_with(logger: Logger, exit: fn(i32)) {
    std::panic::set_hook(Box::new(move |info| {
        let message: String = panic_message(info.payload());
        let location: String = info
            .location()
            .map(|location| location.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        match (current_failure_scope(), tokio::task::try_id()) {
            (Some(scope), _) => logger.in_scope(|| {
                debug!(?scope, %location, "Panic in recoverable scope: {message}");
            }),
            (None, Some(task)) => logger.in_scope(|| {
                error!(%task, %location, "Unhandled rejection: task panicked: {message}");
            }),
            (None, None) => {
                logger.in_scope(|| error!(%location, "Uncaught exception: {message}"));
                exit(1);
            }
        }
    }));
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
