//! User repository
//!
//! Database operations for user accounts.

use crate::db::{Backend, DynDatabasePool};
use crate::models::User;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }

    async fn find_one(&self, column: UserColumn, value: UserKey<'_>) -> Result<Option<User>> {
        let sql = format!(
            "SELECT id, username, email, password_hash, created_at, updated_at FROM users WHERE {} = ?",
            column.as_str()
        );
        match self.pool.backend() {
            Backend::Sqlite(pool) => find_user_sqlite(pool, &sql, value).await,
            Backend::Mysql(pool) => find_user_mysql(pool, &sql, value).await,
        }
    }
}

#[derive(Clone, Copy)]
enum UserColumn {
    Id,
    Username,
    Email,
}

impl UserColumn {
    fn as_str(&self) -> &'static str {
        match self {
            UserColumn::Id => "id",
            UserColumn::Username => "username",
            UserColumn::Email => "email",
        }
    }
}

#[derive(Clone, Copy)]
enum UserKey<'a> {
    Id(i64),
    Text(&'a str),
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_user_sqlite(pool, user).await,
            Backend::Mysql(pool) => create_user_mysql(pool, user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        self.find_one(UserColumn::Id, UserKey::Id(id)).await
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_one(UserColumn::Username, UserKey::Text(username))
            .await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_one(UserColumn::Email, UserKey::Text(email)).await
    }
}

const INSERT_USER: &str = r#"
    INSERT INTO users (username, email, password_hash, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?)
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let result = sqlx::query(INSERT_USER)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(pool)
        .await
        .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_rowid(),
        ..user.clone()
    })
}

async fn find_user_sqlite(pool: &SqlitePool, sql: &str, key: UserKey<'_>) -> Result<Option<User>> {
    let query = sqlx::query(sql);
    let query = match key {
        UserKey::Id(id) => query.bind(id),
        UserKey::Text(text) => query.bind(text),
    };
    let row = query
        .fetch_optional(pool)
        .await
        .context("Failed to get user")?;

    Ok(row.map(|row| User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }))
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let result = sqlx::query(INSERT_USER)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(pool)
        .await
        .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_id() as i64,
        ..user.clone()
    })
}

async fn find_user_mysql(pool: &MySqlPool, sql: &str, key: UserKey<'_>) -> Result<Option<User>> {
    let query = sqlx::query(sql);
    let query = match key {
        UserKey::Id(id) => query.bind(id),
        UserKey::Text(text) => query.bind(text),
    };
    let row = query
        .fetch_optional(pool)
        .await
        .context("Failed to get user")?;

    Ok(row.map(|row| User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }))
}
