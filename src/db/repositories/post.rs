//! Post repository
//!
//! Database operations for posts.
//!
//! This module provides:
//! - `PostRepository` trait defining the interface for post data access
//! - `SqlxPostRepository` implementing the trait for SQLite and MySQL
//!
//! Listing queries join the author so callers get the username with each post.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{NewPost, Post, PostFilter, PostStatus, UpdatePostInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySql, MySqlPool, Row, Sqlite, SqlitePool};
use std::sync::Arc;

const POST_COLUMNS: &str = "p.id, p.title, p.slug, p.body, p.image, p.author_id, p.status, \
     p.publish, p.created, p.updated, u.username AS author_name";

const POST_FROM: &str = "FROM posts p JOIN users u ON u.id = p.author_id";

/// A post with its author's username
#[derive(Debug, Clone)]
pub struct AuthoredPost {
    pub post: Post,
    pub author: String,
}

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a post; the slug must already be unique
    async fn create(&self, post: &NewPost) -> Result<Post>;

    /// Get post by ID regardless of status
    async fn get_by_id(&self, id: i64) -> Result<Option<AuthoredPost>>;

    /// Check whether a slug is taken
    async fn slug_exists(&self, slug: &str) -> Result<bool>;

    /// Update editable fields, returning the new row if the post exists
    async fn update(&self, id: i64, input: &UpdatePostInput) -> Result<Option<Post>>;

    /// Delete a post, returning whether it existed
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Published posts matching `filter`, newest first
    async fn list_published(
        &self,
        filter: &PostFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<AuthoredPost>>;

    /// Number of published posts matching `filter`
    async fn count_published(&self, filter: &PostFilter) -> Result<i64>;

    /// All posts by an author, any status, newest first
    async fn list_by_author(&self, author_id: i64) -> Result<Vec<AuthoredPost>>;

    /// Published posts sharing at least one tag with `post_id`, most shared
    /// tags first, then newest first
    async fn list_similar(&self, post_id: i64, limit: i64) -> Result<Vec<AuthoredPost>>;
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &NewPost) -> Result<Post> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_post_sqlite(pool, post).await,
            Backend::Mysql(pool) => create_post_mysql(pool, post).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<AuthoredPost>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_post_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_post_by_id_mysql(pool, id).await,
        }
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let sql = "SELECT COUNT(*) AS count FROM posts WHERE slug = ?";
        let count: i64 = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(slug)
                .fetch_one(pool)
                .await
                .context("Failed to check slug")?
                .get("count"),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(slug)
                .fetch_one(pool)
                .await
                .context("Failed to check slug")?
                .get("count"),
        };
        Ok(count > 0)
    }

    async fn update(&self, id: i64, input: &UpdatePostInput) -> Result<Option<Post>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => update_post_sqlite(pool, id, input).await?,
            Backend::Mysql(pool) => update_post_mysql(pool, id, input).await?,
        }
        Ok(self.get_by_id(id).await?.map(|authored| authored.post))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM posts WHERE id = ?";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete post")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete post")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn list_published(
        &self,
        filter: &PostFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<AuthoredPost>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_published_sqlite(pool, filter, offset, limit).await,
            Backend::Mysql(pool) => list_published_mysql(pool, filter, offset, limit).await,
        }
    }

    async fn count_published(&self, filter: &PostFilter) -> Result<i64> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => count_published_sqlite(pool, filter).await,
            Backend::Mysql(pool) => count_published_mysql(pool, filter).await,
        }
    }

    async fn list_by_author(&self, author_id: i64) -> Result<Vec<AuthoredPost>> {
        let sql = format!(
            "SELECT {} {} WHERE p.author_id = ? ORDER BY p.publish DESC, p.id DESC",
            POST_COLUMNS, POST_FROM
        );
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(&sql)
                    .bind(author_id)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list posts by author")?;
                rows.iter().map(row_to_post_sqlite).collect()
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(&sql)
                    .bind(author_id)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list posts by author")?;
                rows.iter().map(row_to_post_mysql).collect()
            }
        }
    }

    async fn list_similar(&self, post_id: i64, limit: i64) -> Result<Vec<AuthoredPost>> {
        let sql = similar_sql();
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(&sql)
                    .bind(post_id)
                    .bind(post_id)
                    .bind(limit)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list similar posts")?;
                rows.iter().map(row_to_post_sqlite).collect()
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(&sql)
                    .bind(post_id)
                    .bind(post_id)
                    .bind(limit)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list similar posts")?;
                rows.iter().map(row_to_post_mysql).collect()
            }
        }
    }
}

// ============================================================================
// Query builders shared by both backends
// ============================================================================

/// WHERE clause for the published set narrowed by `filter`.
/// Placeholders: tag id (if any), then the query pattern twice (if any).
fn published_where(filter: &PostFilter) -> String {
    let mut sql = String::from(" WHERE p.status = 'published'");
    if filter.tag_id.is_some() {
        sql.push_str(
            " AND EXISTS (SELECT 1 FROM post_tags pt WHERE pt.post_id = p.id AND pt.tag_id = ?)",
        );
    }
    if filter.query.is_some() {
        sql.push_str(" AND (LOWER(p.title) LIKE ? ESCAPE '!' OR LOWER(p.body) LIKE ? ESCAPE '!')");
    }
    sql
}

/// Substring LIKE pattern with wildcards in the user's text escaped
fn like_pattern(query: &str) -> String {
    let escaped = query
        .to_lowercase()
        .replace('!', "!!")
        .replace('%', "!%")
        .replace('_', "!_");
    format!("%{}%", escaped)
}

fn similar_sql() -> String {
    format!(
        "SELECT {} {} \
         JOIN (SELECT pt.post_id, COUNT(*) AS same_tags FROM post_tags pt \
               WHERE pt.tag_id IN (SELECT tag_id FROM post_tags WHERE post_id = ?) \
               AND pt.post_id <> ? \
               GROUP BY pt.post_id) s ON s.post_id = p.id \
         WHERE p.status = 'published' \
         ORDER BY s.same_tags DESC, p.publish DESC, p.id DESC \
         LIMIT ?",
        POST_COLUMNS, POST_FROM
    )
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, post: &NewPost) -> Result<Post> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO posts (title, slug, body, image, author_id, status, publish, created, updated)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.title)
    .bind(&post.slug)
    .bind(&post.body)
    .bind(&post.image)
    .bind(post.author_id)
    .bind(post.status.as_str())
    .bind(post.publish)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_rowid(),
        title: post.title.clone(),
        slug: post.slug.clone(),
        body: post.body.clone(),
        image: post.image.clone(),
        author_id: post.author_id,
        status: post.status,
        publish: post.publish,
        created: now,
        updated: now,
    })
}

async fn get_post_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<AuthoredPost>> {
    let sql = format!("SELECT {} {} WHERE p.id = ?", POST_COLUMNS, POST_FROM);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    row.as_ref().map(row_to_post_sqlite).transpose()
}

async fn update_post_sqlite(pool: &SqlitePool, id: i64, input: &UpdatePostInput) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE posts
        SET title = ?, body = ?, image = COALESCE(?, image), status = ?, updated = ?
        WHERE id = ?
        "#,
    )
    .bind(&input.title)
    .bind(&input.body)
    .bind(&input.image)
    .bind(input.status.as_str())
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update post")?;
    Ok(())
}

async fn list_published_sqlite(
    pool: &SqlitePool,
    filter: &PostFilter,
    offset: i64,
    limit: i64,
) -> Result<Vec<AuthoredPost>> {
    let sql = format!(
        "SELECT {} {}{} ORDER BY p.publish DESC, p.id DESC LIMIT ? OFFSET ?",
        POST_COLUMNS,
        POST_FROM,
        published_where(filter)
    );
    let mut query = sqlx::query::<Sqlite>(&sql);
    if let Some(tag_id) = filter.tag_id {
        query = query.bind(tag_id);
    }
    if let Some(q) = &filter.query {
        let pattern = like_pattern(q);
        query = query.bind(pattern.clone()).bind(pattern);
    }
    let rows = query
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list published posts")?;

    rows.iter().map(row_to_post_sqlite).collect()
}

async fn count_published_sqlite(pool: &SqlitePool, filter: &PostFilter) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) AS count FROM posts p{}", published_where(filter));
    let mut query = sqlx::query::<Sqlite>(&sql);
    if let Some(tag_id) = filter.tag_id {
        query = query.bind(tag_id);
    }
    if let Some(q) = &filter.query {
        let pattern = like_pattern(q);
        query = query.bind(pattern.clone()).bind(pattern);
    }
    let row = query
        .fetch_one(pool)
        .await
        .context("Failed to count published posts")?;
    Ok(row.get("count"))
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<AuthoredPost> {
    let status: String = row.get("status");
    Ok(AuthoredPost {
        post: Post {
            id: row.get("id"),
            title: row.get("title"),
            slug: row.get("slug"),
            body: row.get("body"),
            image: row.get("image"),
            author_id: row.get("author_id"),
            status: PostStatus::from_str(&status).unwrap_or_default(),
            publish: row.get("publish"),
            created: row.get("created"),
            updated: row.get("updated"),
        },
        author: row.get("author_name"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, post: &NewPost) -> Result<Post> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO posts (title, slug, body, image, author_id, status, publish, created, updated)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.title)
    .bind(&post.slug)
    .bind(&post.body)
    .bind(&post.image)
    .bind(post.author_id)
    .bind(post.status.as_str())
    .bind(post.publish)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_id() as i64,
        title: post.title.clone(),
        slug: post.slug.clone(),
        body: post.body.clone(),
        image: post.image.clone(),
        author_id: post.author_id,
        status: post.status,
        publish: post.publish,
        created: now,
        updated: now,
    })
}

async fn get_post_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<AuthoredPost>> {
    let sql = format!("SELECT {} {} WHERE p.id = ?", POST_COLUMNS, POST_FROM);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    row.as_ref().map(row_to_post_mysql).transpose()
}

async fn update_post_mysql(pool: &MySqlPool, id: i64, input: &UpdatePostInput) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE posts
        SET title = ?, body = ?, image = COALESCE(?, image), status = ?, updated = ?
        WHERE id = ?
        "#,
    )
    .bind(&input.title)
    .bind(&input.body)
    .bind(&input.image)
    .bind(input.status.as_str())
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update post")?;
    Ok(())
}

async fn list_published_mysql(
    pool: &MySqlPool,
    filter: &PostFilter,
    offset: i64,
    limit: i64,
) -> Result<Vec<AuthoredPost>> {
    let sql = format!(
        "SELECT {} {}{} ORDER BY p.publish DESC, p.id DESC LIMIT ? OFFSET ?",
        POST_COLUMNS,
        POST_FROM,
        published_where(filter)
    );
    let mut query = sqlx::query::<MySql>(&sql);
    if let Some(tag_id) = filter.tag_id {
        query = query.bind(tag_id);
    }
    if let Some(q) = &filter.query {
        let pattern = like_pattern(q);
        query = query.bind(pattern.clone()).bind(pattern);
    }
    let rows = query
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list published posts")?;

    rows.iter().map(row_to_post_mysql).collect()
}

async fn count_published_mysql(pool: &MySqlPool, filter: &PostFilter) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) AS count FROM posts p{}", published_where(filter));
    let mut query = sqlx::query::<MySql>(&sql);
    if let Some(tag_id) = filter.tag_id {
        query = query.bind(tag_id);
    }
    if let Some(q) = &filter.query {
        let pattern = like_pattern(q);
        query = query.bind(pattern.clone()).bind(pattern);
    }
    let row = query
        .fetch_one(pool)
        .await
        .context("Failed to count published posts")?;
    Ok(row.get("count"))
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<AuthoredPost> {
    let status: String = row.get("status");
    Ok(AuthoredPost {
        post: Post {
            id: row.get("id"),
            title: row.get("title"),
            slug: row.get("slug"),
            body: row.get("body"),
            image: row.get("image"),
            author_id: row.get("author_id"),
            status: PostStatus::from_str(&status).unwrap_or_default(),
            publish: row.get("publish"),
            created: row.get("created"),
            updated: row.get("updated"),
        },
        author: row.get("author_name"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::{DateTime, Duration};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxPostRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxPostRepository::new(pool.clone());
        (pool, repo)
    }

    async fn create_test_user(pool: &DynDatabasePool, username: &str) -> i64 {
        sqlx::query("INSERT INTO users (username, email, password_hash) VALUES (?, ?, ?)")
            .bind(username)
            .bind(format!("{}@example.com", username))
            .bind("hash")
            .execute(pool.as_sqlite().unwrap())
            .await
            .expect("Failed to create user")
            .last_insert_rowid()
    }

    fn new_post(
        author_id: i64,
        slug: &str,
        status: PostStatus,
        publish: DateTime<Utc>,
    ) -> NewPost {
        NewPost {
            title: format!("Title {}", slug),
            slug: slug.to_string(),
            body: format!("Body of {}", slug),
            image: None,
            author_id,
            status,
            publish,
        }
    }

    async fn tag_post(pool: &DynDatabasePool, post_id: i64, tag: &str) {
        let sqlite = pool.as_sqlite().unwrap();
        sqlx::query("INSERT OR IGNORE INTO tags (name, slug) VALUES (?, ?)")
            .bind(tag)
            .bind(tag)
            .execute(sqlite)
            .await
            .unwrap();
        sqlx::query("INSERT INTO post_tags (post_id, tag_id) SELECT ?, id FROM tags WHERE slug = ?")
            .bind(post_id)
            .bind(tag)
            .execute(sqlite)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_and_get_post() {
        let (pool, repo) = setup_test_repo().await;
        let author_id = create_test_user(&pool, "alice").await;

        let created = repo
            .create(&new_post(author_id, "hello", PostStatus::Draft, Utc::now()))
            .await
            .expect("Failed to create post");
        assert!(created.id > 0);

        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.post.slug, "hello");
        assert_eq!(found.post.status, PostStatus::Draft);
        assert_eq!(found.author, "alice");
        assert!(repo.get_by_id(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_slug_exists() {
        let (pool, repo) = setup_test_repo().await;
        let author_id = create_test_user(&pool, "alice").await;
        repo.create(&new_post(author_id, "taken", PostStatus::Draft, Utc::now()))
            .await
            .unwrap();

        assert!(repo.slug_exists("taken").await.unwrap());
        assert!(!repo.slug_exists("free").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_keeps_image_when_none() {
        let (pool, repo) = setup_test_repo().await;
        let author_id = create_test_user(&pool, "alice").await;
        let mut post = new_post(author_id, "pic", PostStatus::Draft, Utc::now());
        post.image = Some("images/blog/a.png".to_string());
        let created = repo.create(&post).await.unwrap();

        let updated = repo
            .update(
                created.id,
                &UpdatePostInput {
                    title: "New title".to_string(),
                    body: "New body".to_string(),
                    image: None,
                    status: PostStatus::Published,
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.title, "New title");
        assert_eq!(updated.status, PostStatus::Published);
        assert_eq!(updated.image.as_deref(), Some("images/blog/a.png"));
        assert_eq!(updated.slug, "pic");
    }

    #[tokio::test]
    async fn test_update_missing_post_returns_none() {
        let (_pool, repo) = setup_test_repo().await;
        let result = repo
            .update(
                42,
                &UpdatePostInput {
                    title: "t".to_string(),
                    body: "b".to_string(),
                    image: None,
                    status: PostStatus::Draft,
                },
            )
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete_post() {
        let (pool, repo) = setup_test_repo().await;
        let author_id = create_test_user(&pool, "alice").await;
        let created = repo
            .create(&new_post(author_id, "gone", PostStatus::Draft, Utc::now()))
            .await
            .unwrap();

        assert!(repo.delete(created.id).await.unwrap());
        assert!(!repo.delete(created.id).await.unwrap());
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_published_excludes_drafts_and_orders_by_publish() {
        let (pool, repo) = setup_test_repo().await;
        let author_id = create_test_user(&pool, "alice").await;
        let now = Utc::now();

        repo.create(&new_post(author_id, "old", PostStatus::Published, now - Duration::days(2)))
            .await
            .unwrap();
        repo.create(&new_post(author_id, "new", PostStatus::Published, now))
            .await
            .unwrap();
        repo.create(&new_post(author_id, "draft", PostStatus::Draft, now + Duration::days(1)))
            .await
            .unwrap();

        let filter = PostFilter::default();
        let posts = repo.list_published(&filter, 0, 10).await.unwrap();
        let slugs: Vec<_> = posts.iter().map(|p| p.post.slug.as_str()).collect();
        assert_eq!(slugs, vec!["new", "old"]);
        assert_eq!(repo.count_published(&filter).await.unwrap(), 2);

        let second_page = repo.list_published(&filter, 1, 1).await.unwrap();
        assert_eq!(second_page[0].post.slug, "old");
    }

    #[tokio::test]
    async fn test_list_published_by_tag_and_query() {
        let (pool, repo) = setup_test_repo().await;
        let author_id = create_test_user(&pool, "alice").await;
        let now = Utc::now();

        let mut rust = new_post(author_id, "rust", PostStatus::Published, now);
        rust.title = "Learning Rust".to_string();
        let rust = repo.create(&rust).await.unwrap();
        let mut tokio = new_post(author_id, "tokio", PostStatus::Published, now);
        tokio.body = "An async RUNTIME for rust".to_string();
        let tokio = repo.create(&tokio).await.unwrap();
        repo.create(&new_post(author_id, "other", PostStatus::Published, now))
            .await
            .unwrap();
        tag_post(&pool, rust.id, "lang").await;

        let tag_id: i64 = sqlx::query("SELECT id FROM tags WHERE slug = 'lang'")
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap()
            .get("id");
        let by_tag = PostFilter {
            tag_id: Some(tag_id),
            query: None,
        };
        let posts = repo.list_published(&by_tag, 0, 10).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].post.id, rust.id);

        let by_query = PostFilter {
            tag_id: None,
            query: Some("RuSt".to_string()),
        };
        let mut ids: Vec<_> = repo
            .list_published(&by_query, 0, 10)
            .await
            .unwrap()
            .iter()
            .map(|p| p.post.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec![rust.id, tokio.id]);
        assert_eq!(repo.count_published(&by_query).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_query_wildcards_are_literal() {
        let (pool, repo) = setup_test_repo().await;
        let author_id = create_test_user(&pool, "alice").await;
        let mut percent = new_post(author_id, "percent", PostStatus::Published, Utc::now());
        percent.title = "100% done".to_string();
        repo.create(&percent).await.unwrap();
        repo.create(&new_post(author_id, "plain", PostStatus::Published, Utc::now()))
            .await
            .unwrap();

        let filter = PostFilter {
            tag_id: None,
            query: Some("%".to_string()),
        };
        assert_eq!(repo.count_published(&filter).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_by_author_includes_drafts() {
        let (pool, repo) = setup_test_repo().await;
        let alice = create_test_user(&pool, "alice").await;
        let bob = create_test_user(&pool, "bob").await;
        repo.create(&new_post(alice, "a1", PostStatus::Draft, Utc::now()))
            .await
            .unwrap();
        repo.create(&new_post(alice, "a2", PostStatus::Published, Utc::now()))
            .await
            .unwrap();
        repo.create(&new_post(bob, "b1", PostStatus::Published, Utc::now()))
            .await
            .unwrap();

        let posts = repo.list_by_author(alice).await.unwrap();
        assert_eq!(posts.len(), 2);
        assert!(posts.iter().all(|p| p.post.author_id == alice));
    }

    #[tokio::test]
    async fn test_list_similar_ranks_by_shared_tags() {
        let (pool, repo) = setup_test_repo().await;
        let author_id = create_test_user(&pool, "alice").await;
        let now = Utc::now();

        let a = repo
            .create(&new_post(author_id, "a", PostStatus::Published, now - Duration::days(3)))
            .await
            .unwrap();
        // B is newer than C but shares fewer tags with A
        let b = repo
            .create(&new_post(author_id, "b", PostStatus::Published, now))
            .await
            .unwrap();
        let c = repo
            .create(&new_post(author_id, "c", PostStatus::Published, now - Duration::days(1)))
            .await
            .unwrap();
        let draft = repo
            .create(&new_post(author_id, "d", PostStatus::Draft, now))
            .await
            .unwrap();
        repo.create(&new_post(author_id, "untagged", PostStatus::Published, now))
            .await
            .unwrap();

        for (post, tags) in [
            (&a, vec!["x", "y"]),
            (&b, vec!["x"]),
            (&c, vec!["x", "y"]),
            (&draft, vec!["x", "y"]),
        ] {
            for tag in tags {
                tag_post(&pool, post.id, tag).await;
            }
        }

        let similar = repo.list_similar(a.id, 4).await.unwrap();
        let ids: Vec<_> = similar.iter().map(|p| p.post.id).collect();
        assert_eq!(ids, vec![c.id, b.id]);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Rust"), "%rust%");
        assert_eq!(like_pattern("50%_off!"), "%50!%!_off!!%");
    }

    #[test]
    fn test_published_where_placeholders() {
        let sql = published_where(&PostFilter {
            tag_id: Some(1),
            query: Some("q".to_string()),
        });
        assert_eq!(sql.matches('?').count(), 3);
        assert_eq!(published_where(&PostFilter::default()).matches('?').count(), 0);
    }
}
