//! Comment repository
//!
//! Database operations for post comments.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{Comment, CreateCommentInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a new, active comment
    async fn create(&self, input: &CreateCommentInput) -> Result<Comment>;

    /// Active comments on a post, oldest first
    async fn list_active_by_post(&self, post_id: i64) -> Result<Vec<Comment>>;

    /// Show or hide a comment, returning whether it existed
    async fn set_active(&self, id: i64, active: bool) -> Result<bool>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

const INSERT_COMMENT: &str = r#"
    INSERT INTO comments (post_id, name, email, body, active, created, updated)
    VALUES (?, ?, ?, ?, ?, ?, ?)
"#;

const ACTIVE_BY_POST: &str = r#"
    SELECT id, post_id, name, email, body, active, created, updated
    FROM comments
    WHERE post_id = ? AND active = ?
    ORDER BY created ASC, id ASC
"#;

macro_rules! row_to_comment {
    ($row:expr) => {
        Comment {
            id: $row.get("id"),
            post_id: $row.get("post_id"),
            name: $row.get("name"),
            email: $row.get("email"),
            body: $row.get("body"),
            active: $row.get("active"),
            created: $row.get("created"),
            updated: $row.get("updated"),
        }
    };
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, input: &CreateCommentInput) -> Result<Comment> {
        let now = Utc::now();
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(INSERT_COMMENT)
                .bind(input.post_id)
                .bind(&input.name)
                .bind(&input.email)
                .bind(&input.body)
                .bind(true)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create comment")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(INSERT_COMMENT)
                .bind(input.post_id)
                .bind(&input.name)
                .bind(&input.email)
                .bind(&input.body)
                .bind(true)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create comment")?
                .last_insert_id() as i64,
        };

        Ok(Comment {
            id,
            post_id: input.post_id,
            name: input.name.clone(),
            email: input.email.clone(),
            body: input.body.clone(),
            active: true,
            created: now,
            updated: now,
        })
    }

    async fn list_active_by_post(&self, post_id: i64) -> Result<Vec<Comment>> {
        let comments = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(ACTIVE_BY_POST)
                .bind(post_id)
                .bind(true)
                .fetch_all(pool)
                .await
                .context("Failed to list comments")?
                .iter()
                .map(|row| row_to_comment!(row))
                .collect(),
            Backend::Mysql(pool) => sqlx::query(ACTIVE_BY_POST)
                .bind(post_id)
                .bind(true)
                .fetch_all(pool)
                .await
                .context("Failed to list comments")?
                .iter()
                .map(|row| row_to_comment!(row))
                .collect(),
        };
        Ok(comments)
    }

    async fn set_active(&self, id: i64, active: bool) -> Result<bool> {
        let sql = "UPDATE comments SET active = ?, updated = ? WHERE id = ?";
        let now = Utc::now();
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(active)
                .bind(now)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to update comment")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(active)
                .bind(now)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to update comment")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxCommentRepository, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let sqlite = pool.as_sqlite().unwrap();
        sqlx::query("INSERT INTO users (id, username, email, password_hash) VALUES (1, 'author', 'a@example.com', 'hash')")
            .execute(sqlite)
            .await
            .unwrap();
        let post_id = sqlx::query("INSERT INTO posts (title, slug, body, author_id) VALUES ('T', 't', 'B', 1)")
            .execute(sqlite)
            .await
            .unwrap()
            .last_insert_rowid();
        let repo = SqlxCommentRepository::new(pool.clone());
        (pool, repo, post_id)
    }

    fn comment_input(post_id: i64, name: &str) -> CreateCommentInput {
        CreateCommentInput {
            post_id,
            name: name.to_string(),
            email: format!("{}@example.com", name),
            body: format!("Comment from {}", name),
        }
    }

    #[tokio::test]
    async fn test_create_comment_is_active() {
        let (_pool, repo, post_id) = setup_test_repo().await;
        let comment = repo.create(&comment_input(post_id, "reader")).await.unwrap();
        assert!(comment.id > 0);
        assert!(comment.active);
    }

    #[tokio::test]
    async fn test_list_active_in_creation_order() {
        let (_pool, repo, post_id) = setup_test_repo().await;
        let first = repo.create(&comment_input(post_id, "first")).await.unwrap();
        let hidden = repo.create(&comment_input(post_id, "hidden")).await.unwrap();
        let last = repo.create(&comment_input(post_id, "last")).await.unwrap();

        assert!(repo.set_active(hidden.id, false).await.unwrap());
        assert!(!repo.set_active(9999, false).await.unwrap());

        let comments = repo.list_active_by_post(post_id).await.unwrap();
        let ids: Vec<_> = comments.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![first.id, last.id]);
    }

    #[tokio::test]
    async fn test_comment_requires_existing_post() {
        let (_pool, repo, _post_id) = setup_test_repo().await;
        assert!(repo.create(&comment_input(4242, "ghost")).await.is_err());
    }
}
