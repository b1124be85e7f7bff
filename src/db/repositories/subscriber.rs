//! Subscriber repository
//!
//! Database operations for newsletter subscribers.

use crate::db::{Backend, DynDatabasePool};
use crate::models::Subscriber;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

/// Subscriber repository trait
#[async_trait]
pub trait SubscriberRepository: Send + Sync {
    /// Add a subscriber. Returns `None` when the email is already on the
    /// list; the check and the insert are one statement.
    async fn create_if_absent(&self, email: &str) -> Result<Option<Subscriber>>;

    /// Get subscriber by email
    async fn get_by_email(&self, email: &str) -> Result<Option<Subscriber>>;

    /// Total number of subscribers
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based subscriber repository implementation
pub struct SqlxSubscriberRepository {
    pool: DynDatabasePool,
}

impl SqlxSubscriberRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SubscriberRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SubscriberRepository for SqlxSubscriberRepository {
    async fn create_if_absent(&self, email: &str) -> Result<Option<Subscriber>> {
        let now = Utc::now();
        let inserted = match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let result = sqlx::query(
                    "INSERT OR IGNORE INTO subscribers (email, created) VALUES (?, ?)",
                )
                .bind(email)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create subscriber")?;
                (result.rows_affected() > 0).then(|| result.last_insert_rowid())
            }
            Backend::Mysql(pool) => {
                let result =
                    sqlx::query("INSERT IGNORE INTO subscribers (email, created) VALUES (?, ?)")
                        .bind(email)
                        .bind(now)
                        .execute(pool)
                        .await
                        .context("Failed to create subscriber")?;
                (result.rows_affected() > 0).then(|| result.last_insert_id() as i64)
            }
        };

        Ok(inserted.map(|id| Subscriber {
            id,
            email: email.to_string(),
            created: now,
        }))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Subscriber>> {
        let sql = "SELECT id, email, created FROM subscribers WHERE email = ?";
        let subscriber = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(email)
                .fetch_optional(pool)
                .await
                .context("Failed to get subscriber")?
                .map(|row| Subscriber {
                    id: row.get("id"),
                    email: row.get("email"),
                    created: row.get("created"),
                }),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(email)
                .fetch_optional(pool)
                .await
                .context("Failed to get subscriber")?
                .map(|row| Subscriber {
                    id: row.get("id"),
                    email: row.get("email"),
                    created: row.get("created"),
                }),
        };
        Ok(subscriber)
    }

    async fn count(&self) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM subscribers";
        let count = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .fetch_one(pool)
                .await
                .context("Failed to count subscribers")?
                .get("count"),
            Backend::Mysql(pool) => sqlx::query(sql)
                .fetch_one(pool)
                .await
                .context("Failed to count subscribers")?
                .get("count"),
        };
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxSubscriberRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxSubscriberRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_find_subscriber() {
        let repo = setup_test_repo().await;
        let subscriber = repo
            .create_if_absent("reader@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(subscriber.id > 0);

        let found = repo.get_by_email("reader@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, subscriber.id);
        assert!(repo.get_by_email("other@example.com").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_ignored() {
        let repo = setup_test_repo().await;
        assert!(repo.create_if_absent("reader@example.com").await.unwrap().is_some());
        assert!(repo.create_if_absent("reader@example.com").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
