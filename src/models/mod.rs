//! Data models
//!
//! Entities persisted by the blog (Post, Tag, Comment, Subscriber, User,
//! Session), the inputs used to create and change them, and pagination types.

mod comment;
mod pagination;
mod post;
mod session;
mod subscriber;
mod tag;
mod user;

pub use comment::{Comment, CreateCommentInput};
pub use pagination::{Page, Paginator};
pub use post::{
    CreatePostInput, NewPost, Post, PostFilter, PostStatus, PostWithMeta, UpdatePostInput,
};
pub use session::Session;
pub use subscriber::Subscriber;
pub use tag::Tag;
pub use user::User;
