//! Tag repository
//!
//! Database operations for tags and the post/tag association.
//!
//! This module provides:
//! - `TagRepository` trait defining the interface for tag data access
//! - `SqlxTagRepository` implementing the trait for SQLite and MySQL

use crate::db::{Backend, DynDatabasePool};
use crate::models::Tag;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a new tag
    async fn create(&self, tag: &Tag) -> Result<Tag>;

    /// Get tag by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>>;

    /// Associate tag with post; associating twice is a no-op
    async fn add_to_post(&self, tag_id: i64, post_id: i64) -> Result<()>;

    /// Get tags for a post, ordered by name
    async fn get_by_post_id(&self, post_id: i64) -> Result<Vec<Tag>>;
}

/// SQLx-based tag repository implementation
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, tag: &Tag) -> Result<Tag> {
        let sql = "INSERT INTO tags (name, slug) VALUES (?, ?)";
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(&tag.name)
                .bind(&tag.slug)
                .execute(pool)
                .await
                .context("Failed to create tag")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(&tag.name)
                .bind(&tag.slug)
                .execute(pool)
                .await
                .context("Failed to create tag")?
                .last_insert_id() as i64,
        };

        Ok(Tag {
            id,
            name: tag.name.clone(),
            slug: tag.slug.clone(),
        })
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_tag_by_slug_sqlite(pool, slug).await,
            Backend::Mysql(pool) => get_tag_by_slug_mysql(pool, slug).await,
        }
    }

    async fn add_to_post(&self, tag_id: i64, post_id: i64) -> Result<()> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query("INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)")
                    .bind(post_id)
                    .bind(tag_id)
                    .execute(pool)
                    .await
                    .context("Failed to add tag to post")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query("INSERT IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)")
                    .bind(post_id)
                    .bind(tag_id)
                    .execute(pool)
                    .await
                    .context("Failed to add tag to post")?;
            }
        }
        Ok(())
    }

    async fn get_by_post_id(&self, post_id: i64) -> Result<Vec<Tag>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_tags_by_post_sqlite(pool, post_id).await,
            Backend::Mysql(pool) => get_tags_by_post_mysql(pool, post_id).await,
        }
    }
}

const TAGS_BY_POST: &str = r#"
    SELECT t.id, t.name, t.slug
    FROM tags t
    INNER JOIN post_tags pt ON t.id = pt.tag_id
    WHERE pt.post_id = ?
    ORDER BY t.name
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_tag_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, name, slug FROM tags WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by slug")?;

    Ok(row.as_ref().map(row_to_tag_sqlite))
}

async fn get_tags_by_post_sqlite(pool: &SqlitePool, post_id: i64) -> Result<Vec<Tag>> {
    let rows = sqlx::query(TAGS_BY_POST)
        .bind(post_id)
        .fetch_all(pool)
        .await
        .context("Failed to get tags for post")?;

    Ok(rows.iter().map(row_to_tag_sqlite).collect())
}

fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_tag_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, name, slug FROM tags WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by slug")?;

    Ok(row.as_ref().map(row_to_tag_mysql))
}

async fn get_tags_by_post_mysql(pool: &MySqlPool, post_id: i64) -> Result<Vec<Tag>> {
    let rows = sqlx::query(TAGS_BY_POST)
        .bind(post_id)
        .fetch_all(pool)
        .await
        .context("Failed to get tags for post")?;

    Ok(rows.iter().map(row_to_tag_mysql).collect())
}

fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
    }
}
