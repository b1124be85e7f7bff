//! Comment service

use crate::db::repositories::CommentRepository;
use crate::models::{Comment, CreateCommentInput};
use anyhow::Context;
use std::sync::Arc;

/// Error types for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Comment not found")]
    NotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Comment service
pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn CommentRepository>) -> Self {
        Self { repo }
    }

    /// Add a comment to a post. New comments are visible immediately.
    pub async fn create(&self, input: CreateCommentInput) -> Result<Comment, CommentServiceError> {
        let comment = self
            .repo
            .create(&input)
            .await
            .context("Failed to create comment")?;

        tracing::info!(comment_id = comment.id, post_id = comment.post_id, "Comment created");
        Ok(comment)
    }

    /// Visible comments on a post, oldest first
    pub async fn list_active(&self, post_id: i64) -> Result<Vec<Comment>, CommentServiceError> {
        let comments = self
            .repo
            .list_active_by_post(post_id)
            .await
            .context("Failed to list comments")?;
        Ok(comments)
    }

    /// Hide or re-show a comment without deleting it
    pub async fn set_active(&self, id: i64, active: bool) -> Result<(), CommentServiceError> {
        if !self
            .repo
            .set_active(id, active)
            .await
            .context("Failed to update comment")?
        {
            return Err(CommentServiceError::NotFound);
        }
        tracing::info!(comment_id = id, active, "Comment visibility changed");
        Ok(())
    }
}
