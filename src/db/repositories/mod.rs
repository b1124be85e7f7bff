//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the queries for a single entity.

pub mod comment;
pub mod post;
pub mod session;
pub mod subscriber;
pub mod tag;
pub mod user;

pub use comment::{CommentRepository, SqlxCommentRepository};
pub use post::{AuthoredPost, PostRepository, SqlxPostRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use subscriber::{SqlxSubscriberRepository, SubscriberRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use user::{SqlxUserRepository, UserRepository};
