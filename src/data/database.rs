//! SQLite connection bootstrap
//!
//! All database access goes through the pool created here.
//! The pool is built once at startup and handed to the stores;
//! a missing or unreachable database is a startup error.

use std::str::FromStr;

use sqlx::ConnectOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};

use crate::config::DatabaseConfig;
use crate::error::AppError;
use crate::metrics::DB_CONNECTIONS_ACTIVE;

/// Database connection pool wrapper.
#[derive(Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the configured database and run migrations
    ///
    /// When `database.debug` is set, every SQL statement is logged at
    /// info level.
    ///
    /// # Errors
    /// Returns error if the URL is empty, the connection fails,
    /// or migration fails
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let url = config.url.trim();
        if url.is_empty() {
            return Err(AppError::Config("database.url must be set".to_string()));
        }

        let mut options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        options = if config.debug {
            // sqlx takes a `log` level here; the tracing bridge picks
            // the statement records up.
            options.log_statements(log::LevelFilter::Info)
        } else {
            options.disable_statement_logging()
        };

        let pool = SqlitePool::connect_with(options).await?;

        // Run migrations
        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
            tracing::error!("Migration failed: {}", e);
            AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
        })?;

        DB_CONNECTIONS_ACTIVE.set(pool.size() as i64);
        tracing::info!(
            statement_logging = config.debug,
            "Database connected and migrated successfully"
        );

        Ok(Self { pool })
    }

    /// Shared connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool, waiting for checked-out connections to finish
    pub async fn close(&self) {
        self.pool.close().await;
        DB_CONNECTIONS_ACTIVE.set(0);
        tracing::info!("Database connection pool closed");
    }
}
