//! Post model
//!
//! This module provides:
//! - `Post` entity representing a blog post
//! - `PostStatus` enum for publication states
//! - Input types for creating and updating posts
//! - `PostWithMeta`, the shape handed to templates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Tag;

/// Average reading speed used for `reading_time`
const WORDS_PER_MINUTE: usize = 200;

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    /// URL-friendly slug, unique across posts
    pub slug: String,
    pub body: String,
    /// Image path relative to the media root
    pub image: Option<String>,
    pub author_id: i64,
    pub status: PostStatus,
    /// Publication timestamp; listings are ordered by it, newest first
    pub publish: DateTime<Utc>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Post {
    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }

    /// Canonical detail path, `/{id}/{slug}/`
    pub fn absolute_url(&self) -> String {
        format!("/{}/{}/", self.id, self.slug)
    }

    /// Estimated reading time in whole minutes, at least one
    pub fn reading_time(&self) -> usize {
        (self.body.split_whitespace().count() / WORDS_PER_MINUTE).max(1)
    }
}

/// Post publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    /// Visible only to its author
    #[default]
    Draft,
    /// Visible to everyone
    Published,
}

impl PostStatus {
    /// Convert status to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }

    /// Parse status from database string representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(PostStatus::Draft),
            "published" => Some(PostStatus::Published),
            _ => None,
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Row to insert; the slug has already been made unique
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub slug: String,
    pub body: String,
    pub image: Option<String>,
    pub author_id: i64,
    pub status: PostStatus,
    pub publish: DateTime<Utc>,
}

/// Input for creating a new post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostInput {
    pub title: String,
    pub body: String,
    pub image: Option<String>,
    pub status: PostStatus,
    /// Tag names; created on first use
    pub tags: Vec<String>,
    pub author_id: i64,
}

/// Input for updating a post. Tags, author and slug are not editable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePostInput {
    pub title: String,
    pub body: String,
    /// Replacement image; `None` keeps the current one
    pub image: Option<String>,
    pub status: PostStatus,
}

/// Restrictions applied on top of the published set
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub tag_id: Option<i64>,
    /// Case-insensitive substring of title or body
    pub query: Option<String>,
}

/// Post together with what templates need to display it
#[derive(Debug, Clone, Serialize)]
pub struct PostWithMeta {
    #[serde(flatten)]
    pub post: Post,
    pub author: String,
    pub tags: Vec<Tag>,
    pub url: String,
    pub reading_time: usize,
}

impl PostWithMeta {
    pub fn new(post: Post, author: String, tags: Vec<Tag>) -> Self {
        let url = post.absolute_url();
        let reading_time = post.reading_time();
        Self {
            post,
            author,
            tags,
            url,
            reading_time,
        }
    }
}
