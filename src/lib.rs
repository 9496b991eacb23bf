// Library root for the server-rendered web application

pub mod config;
pub mod core;
pub mod database;
pub mod middleware;
pub mod render;

pub use crate::config::environment::EnvironmentVariables;
pub use crate::config::state::AppState;
pub use crate::core::app::create_app;
pub use crate::core::lifecycle::{LifecycleManager, LifecycleState, ServerHandle, ShutdownOutcome};
pub use crate::core::logging::Logger;
pub use crate::core::server::start;
pub use crate::database::Database;
pub use crate::middleware::error_handler::AppError;
