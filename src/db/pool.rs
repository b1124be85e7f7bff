//! Database connection pool abstraction
//!
//! A unified interface over SQLite and MySQL pools. Repositories ask the pool
//! for its backend and borrow the concrete sqlx pool for their queries.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions},
    sqlite::{SqlitePool, SqlitePoolOptions},
};
use std::path::Path;
use std::sync::Arc;

use crate::config::{DatabaseConfig, DatabaseDriver};

const SQLITE_MAX_CONNECTIONS: u32 = 20;
const MYSQL_MAX_CONNECTIONS: u32 = 30;

/// Borrowed handle to the concrete pool behind a [`DatabasePool`].
///
/// Repositories match on this to pick the SQLite or MySQL query path.
#[derive(Clone, Copy)]
pub enum Backend<'a> {
    Sqlite(&'a SqlitePool),
    Mysql(&'a MySqlPool),
}

/// Shared database handle.
///
/// Only [`backend`](DatabasePool::backend) is required; everything else is
/// derived from it.
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Borrow the concrete pool for driver-specific queries
    fn backend(&self) -> Backend<'_>;

    fn driver(&self) -> DatabaseDriver {
        match self.backend() {
            Backend::Sqlite(_) => DatabaseDriver::Sqlite,
            Backend::Mysql(_) => DatabaseDriver::Mysql,
        }
    }

    /// The SQLite pool, if this is a SQLite database
    fn as_sqlite(&self) -> Option<&SqlitePool> {
        match self.backend() {
            Backend::Sqlite(pool) => Some(pool),
            Backend::Mysql(_) => None,
        }
    }

    /// Round-trip a trivial query
    async fn ping(&self) -> Result<()> {
        let result = match self.backend() {
            Backend::Sqlite(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
            Backend::Mysql(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
        };
        result.context("Database ping failed")
    }

    /// Wait for in-flight queries and close every connection
    async fn close(&self) {
        match self.backend() {
            Backend::Sqlite(pool) => pool.close().await,
            Backend::Mysql(pool) => pool.close().await,
        }
    }
}

/// A connected SQLite or MySQL pool
pub enum Database {
    Sqlite(SqlitePool),
    Mysql(MySqlPool),
}

impl DatabasePool for Database {
    fn backend(&self) -> Backend<'_> {
        match self {
            Database::Sqlite(pool) => Backend::Sqlite(pool),
            Database::Mysql(pool) => Backend::Mysql(pool),
        }
    }
}

/// Type alias for a shared database pool
pub type DynDatabasePool = Arc<dyn DatabasePool>;

/// Connect to the database named by `config`.
///
/// SQLite accepts `:memory:`, a `sqlite:` URL or a plain file path; the
/// parent directory of a file database is created when missing. MySQL
/// accepts a URL with or without the `mysql://` scheme.
pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool> {
    let database = match config.driver {
        DatabaseDriver::Sqlite => Database::Sqlite(connect_sqlite(&config.url).await?),
        DatabaseDriver::Mysql => Database::Mysql(connect_mysql(&config.url).await?),
    };
    Ok(Arc::new(database))
}

/// In-memory SQLite pool for tests
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    create_pool(&DatabaseConfig {
        driver: DatabaseDriver::Sqlite,
        url: ":memory:".to_string(),
    })
    .await
}

async fn connect_sqlite(url: &str) -> Result<SqlitePool> {
    let in_memory = url == ":memory:" || url.starts_with("sqlite::memory:");

    let connection_url = if in_memory {
        "sqlite::memory:".to_string()
    } else {
        let path = url.strip_prefix("sqlite:").unwrap_or(url);
        let path = path.split('?').next().unwrap_or(path);
        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }

        match (url.starts_with("sqlite:"), url.contains('?')) {
            (true, true) => url.to_string(),
            (true, false) => format!("{}?mode=rwc", url),
            (false, _) => format!("sqlite:{}?mode=rwc", url),
        }
    };

    // Every connection to `:memory:` opens its own database
    let options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(SQLITE_MAX_CONNECTIONS)
    };

    let pool = options
        .connect(&connection_url)
        .await
        .with_context(|| format!("Failed to connect to SQLite database: {}", url))?;

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .context("Failed to enable foreign keys")?;

    Ok(pool)
}

async fn connect_mysql(url: &str) -> Result<MySqlPool> {
    let connection_url = if url.starts_with("mysql://") {
        url.to_string()
    } else {
        format!("mysql://{}", url)
    };

    MySqlPoolOptions::new()
        .max_connections(MYSQL_MAX_CONNECTIONS)
        .connect(&connection_url)
        .await
        .with_context(|| format!("Failed to connect to MySQL database: {}", url))
}
