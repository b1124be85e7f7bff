//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reader comment on a post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub name: String,
    pub email: String,
    pub body: String,
    /// Inactive comments are hidden from readers but kept for moderation
    pub active: bool,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Input for creating a new comment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentInput {
    pub post_id: i64,
    pub name: String,
    pub email: String,
    pub body: String,
}
