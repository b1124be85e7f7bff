//! Handler errors
//!
//! Handlers return `WebError` for outcomes that end in an error page. The
//! response only carries an [`ErrorPage`] marker; the
//! `render_error_pages` middleware turns it into HTML, since that needs
//! application state.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::services::{
    CommentServiceError, PostServiceError, SubscriberServiceError, UserServiceError,
};

/// Marks a response whose body should be the error page for its status
#[derive(Debug, Clone, Copy)]
pub struct ErrorPage(pub StatusCode);

#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("Not found")]
    NotFound,

    #[error("Forbidden")]
    Forbidden,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebError::NotFound => StatusCode::NOT_FOUND,
            WebError::Forbidden => StatusCode::FORBIDDEN,
            WebError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        if let WebError::Internal(ref e) = self {
            tracing::error!("Request failed: {:#}", e);
        }
        let status = self.status();
        let mut response = status.into_response();
        response.extensions_mut().insert(ErrorPage(status));
        response
    }
}

impl From<PostServiceError> for WebError {
    fn from(e: PostServiceError) -> Self {
        match e {
            PostServiceError::NotFound | PostServiceError::TagNotFound(_) => WebError::NotFound,
            PostServiceError::Forbidden => WebError::Forbidden,
            PostServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

impl From<CommentServiceError> for WebError {
    fn from(e: CommentServiceError) -> Self {
        match e {
            CommentServiceError::NotFound => WebError::NotFound,
            CommentServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

impl From<SubscriberServiceError> for WebError {
    fn from(e: SubscriberServiceError) -> Self {
        match e {
            SubscriberServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

impl From<UserServiceError> for WebError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::InternalError(e) => WebError::Internal(e),
            other => WebError::Internal(anyhow::anyhow!(other.to_string())),
        }
    }
}

/// Parse a numeric path segment; anything else is a missing page
pub fn parse_id(raw: &str) -> Result<i64, WebError> {
    raw.parse().map_err(|_| WebError::NotFound)
}
