// =============================================================================
// DATABASE - Postgres connection pool shared with route code
// =============================================================================

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use tracing::{debug, info, log::LevelFilter};

// =============================================================================
// DATABASE HANDLE
// =============================================================================

/// Handle over a single PostgreSQL connection pool.
/// Cloning is cheap; every clone shares the same pool.
#[derive(Clone, Debug)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Builds the pool from a connection string.
    /// Connections are opened on first use, so this only fails for an invalid URL.
    pub fn connect(database_url: &str) -> Result<Self> {
        let connect_options: PgConnectOptions = Self::create_connect_options(database_url)?;

        let pool: PgPool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(0)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(30))
            .connect_lazy_with(connect_options);

        info!("Database connection pool created");
        Ok(Self { pool })
    }

    /// Returns the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round-trips a trivial query to verify connectivity.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database ping failed")?;

        debug!("Database ping succeeded");
        Ok(())
    }

    /// Current time according to the database server.
    pub async fn now(&self) -> Result<DateTime<Utc>> {
        sqlx::query_scalar::<_, DateTime<Utc>>("SELECT NOW()")
            .fetch_one(&self.pool)
            .await
            .context("Failed to query the database clock")
    }

    /// Waits for checked-out connections to return, then closes the pool.
    pub async fn shutdown(&self) {
        info!("Draining database connection pool...");
        self.pool.close().await;
        info!("Database connection pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

// =============================================================================
// INTERNAL HELPERS
// =============================================================================

impl Database {
    /// Parses the URL and applies the defaults every connection should have.
    fn create_connect_options(database_url: &str) -> Result<PgConnectOptions> {
        let options: PgConnectOptions = PgConnectOptions::from_str(database_url)
            .context("Invalid DATABASE_URL")?
            .log_statements(LevelFilter::Debug)
            .options([("timezone", "UTC")])
            .application_name("axum-ssr-server");

        Ok(options)
    }
}
