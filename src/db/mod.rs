//! Database layer
//!
//! Persistence for posts, tags, comments, subscribers, users and sessions.
//! SQLite is the default backend; MySQL is selected through configuration.
//!
//! ```ignore
//! use penpost::config::DatabaseConfig;
//! use penpost::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, Backend, Database, DatabasePool, DynDatabasePool,
};

/// Whether `err` was caused by a UNIQUE constraint rejecting a write
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::Database(db)) if db.is_unique_violation()
        )
    })
}
