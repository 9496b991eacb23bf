// Start of file: /src/core/logging.rs

// * The application logger. It is built once from the environment and handed
// * to every component that logs, instead of living in a module-level global.

use tracing::{dispatcher, Dispatch};
use tracing_subscriber::{fmt, fmt::MakeWriter, EnvFilter};

use crate::config::environment::EnvironmentVariables;

/// Structured logger backed by its own `tracing` dispatcher.
#[derive(Clone, Debug)]
pub struct Logger {
    dispatch: Dispatch,
}

impl Logger {
    /// Silent in test mode, `info` (or `RUST_LOG`) otherwise.
    /// Production writes JSON lines, other environments a readable format.
    pub fn for_environment(env: &EnvironmentVariables) -> Self {
        let env_filter: EnvFilter = if env.is_test() {
            EnvFilter::new("off")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        };

        let dispatch: Dispatch = if env.is_production() {
            Dispatch::new(fmt().json().with_env_filter(env_filter).finish())
        } else {
            Dispatch::new(fmt().with_env_filter(env_filter).finish())
        };

        Self { dispatch }
    }

    /// JSON logger writing to an arbitrary sink, filtered by `directives`.
    pub fn with_writer<W>(directives: &str, writer: W) -> Self
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        let subscriber = fmt()
            .json()
            .with_ansi(false)
            .with_env_filter(EnvFilter::new(directives))
            .with_writer(writer)
            .finish();

        Self {
            dispatch: Dispatch::new(subscriber),
        }
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Runs `f` with this logger as the current default.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        dispatcher::with_default(&self.dispatch, f)
    }

    /// Makes this logger the process-wide default. Only `main` should call this.
    pub fn install_global(&self) -> anyhow::Result<()> {
        dispatcher::set_global_default(self.dispatch.clone())
            .map_err(|err| anyhow::anyhow!("Failed to install global logger: {err}"))
    }
}


// End of file: /src/core/logging.rs
