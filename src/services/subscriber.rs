//! Newsletter subscription service

use crate::db::repositories::SubscriberRepository;
use std::sync::Arc;

/// Error types for subscriber service operations
#[derive(Debug, thiserror::Error)]
pub enum SubscriberServiceError {
    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Outcome of a subscribe request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Subscribed,
    AlreadySubscribed,
}

/// Subscriber service
pub struct SubscriberService {
    repo: Arc<dyn SubscriberRepository>,
}

impl SubscriberService {
    pub fn new(repo: Arc<dyn SubscriberRepository>) -> Self {
        Self { repo }
    }

    /// Subscribe an address; an address already on the list is left alone,
    /// also when two requests for it race
    pub async fn subscribe(&self, email: &str) -> Result<SubscribeOutcome, SubscriberServiceError> {
        match self.repo.create_if_absent(email).await? {
            Some(subscriber) => {
                tracing::info!(subscriber_id = subscriber.id, "Newsletter subscription added");
                Ok(SubscribeOutcome::Subscribed)
            }
            None => Ok(SubscribeOutcome::AlreadySubscribed),
        }
    }

    /// Number of subscribers
    pub async fn count(&self) -> Result<i64, SubscriberServiceError> {
        Ok(self.repo.count().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxSubscriberRepository;
    use crate::config::{DatabaseConfig, DatabaseDriver};
    use crate::db::{create_pool, create_test_pool, migrations};

    async fn setup_test_service() -> SubscriberService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SubscriberService::new(SqlxSubscriberRepository::boxed(pool))
    }

    #[tokio::test]
    async fn test_subscribe_twice_keeps_one_subscriber() {
        let service = setup_test_service().await;

        let first = service.subscribe("reader@example.com").await.unwrap();
        let second = service.subscribe("reader@example.com").await.unwrap();

        assert_eq!(first, SubscribeOutcome::Subscribed);
        assert_eq!(second, SubscribeOutcome::AlreadySubscribed);
        assert_eq!(service.count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_subscribes_keep_one_subscriber() {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_pool(&DatabaseConfig {
            driver: DatabaseDriver::Sqlite,
            url: dir.path().join("subscribers.db").to_string_lossy().to_string(),
        })
        .await
        .unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let service = Arc::new(SubscriberService::new(SqlxSubscriberRepository::boxed(pool)));

        for round in 0..5 {
            let email = format!("reader{}@example.com", round);
            let tasks: Vec<_> = (0..8)
                .map(|_| {
                    let service = service.clone();
                    let email = email.clone();
                    tokio::spawn(async move { service.subscribe(&email).await })
                })
                .collect();

            let mut subscribed = 0;
            for task in tasks {
                if task.await.unwrap().unwrap() == SubscribeOutcome::Subscribed {
                    subscribed += 1;
                }
            }
            assert_eq!(subscribed, 1);
        }
        assert_eq!(service.count().await.unwrap(), 5);
    }
}
