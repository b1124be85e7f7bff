//! Post service
//!
//! Business logic for posts:
//! - Published listing with tag filter, text search and pagination
//! - Detail lookup and similar-post ranking
//! - Author-only create/update/delete
//! - Unique slug generation

use crate::db::is_unique_violation;
use crate::db::repositories::{AuthoredPost, PostRepository, TagRepository};
use crate::models::{
    CreatePostInput, NewPost, Page, Paginator, Post, PostFilter, PostWithMeta, Tag,
    UpdatePostInput, User,
};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

/// Posts shown per listing page
pub const POSTS_PER_PAGE: i64 = 4;

/// Maximum number of similar posts shown under a post
pub const SIMILAR_POSTS_LIMIT: i64 = 4;

/// Slug used when a title has no usable characters
const FALLBACK_SLUG: &str = "post";

/// Inserts tried before a slug collision is reported as an error
const MAX_SLUG_ATTEMPTS: u32 = 5;

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// Post does not exist or is not visible
    #[error("Post not found")]
    NotFound,

    /// Tag slug does not exist
    #[error("Tag not found: {0}")]
    TagNotFound(String),

    /// Caller is not the post's author
    #[error("You are not allowed to modify this post")]
    Forbidden,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Result of a listing request
#[derive(Debug)]
pub struct PostListing {
    pub posts: Page<PostWithMeta>,
    /// The tag the listing was narrowed to, if any
    pub tag: Option<Tag>,
}

/// Post service
pub struct PostService {
    post_repo: Arc<dyn PostRepository>,
    tag_repo: Arc<dyn TagRepository>,
}

impl PostService {
    pub fn new(post_repo: Arc<dyn PostRepository>, tag_repo: Arc<dyn TagRepository>) -> Self {
        Self {
            post_repo,
            tag_repo,
        }
    }

    /// List published posts, newest first.
    ///
    /// `tag_slug` narrows to posts with that tag and fails with `TagNotFound`
    /// if no such tag exists. `query` keeps posts whose title or body contains
    /// it, ignoring case. `page` is the raw page parameter; see
    /// [`Paginator::resolve`] for how bad values are handled.
    pub async fn list_published(
        &self,
        tag_slug: Option<&str>,
        query: Option<&str>,
        page: Option<&str>,
    ) -> Result<PostListing, PostServiceError> {
        let tag = match tag_slug {
            Some(slug) => Some(
                self.tag_repo
                    .get_by_slug(slug)
                    .await
                    .context("Failed to look up tag")?
                    .ok_or_else(|| PostServiceError::TagNotFound(slug.to_string()))?,
            ),
            None => None,
        };

        let filter = PostFilter {
            tag_id: tag.as_ref().map(|t| t.id),
            query: query
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_string),
        };

        let total = self
            .post_repo
            .count_published(&filter)
            .await
            .context("Failed to count posts")?;
        let paginator = Paginator::new(total, POSTS_PER_PAGE);
        let number = paginator.resolve(page);

        let rows = self
            .post_repo
            .list_published(&filter, paginator.offset(number), paginator.limit())
            .await
            .context("Failed to list posts")?;
        let items = self.with_meta(rows).await?;

        Ok(PostListing {
            posts: Page::new(items, number, &paginator),
            tag,
        })
    }

    /// Published post matching both id and slug
    pub async fn get_published(&self, id: i64, slug: &str) -> Result<PostWithMeta, PostServiceError> {
        let post = self.get_published_by_id(id).await?;
        if post.post.slug != slug {
            return Err(PostServiceError::NotFound);
        }
        Ok(post)
    }

    /// Published post with the given id
    pub async fn get_published_by_id(&self, id: i64) -> Result<PostWithMeta, PostServiceError> {
        let authored = self
            .post_repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .filter(|authored| authored.post.is_published())
            .ok_or(PostServiceError::NotFound)?;
        self.attach_tags(authored).await
    }

    /// Up to four published posts sharing tags with `post_id`
    pub async fn similar_posts(&self, post_id: i64) -> Result<Vec<PostWithMeta>, PostServiceError> {
        let rows = self
            .post_repo
            .list_similar(post_id, SIMILAR_POSTS_LIMIT)
            .await
            .context("Failed to list similar posts")?;
        self.with_meta(rows).await
    }

    /// Every post by `author_id`, drafts included
    pub async fn list_by_author(&self, author_id: i64) -> Result<Vec<PostWithMeta>, PostServiceError> {
        let rows = self
            .post_repo
            .list_by_author(author_id)
            .await
            .context("Failed to list posts by author")?;
        self.with_meta(rows).await
    }

    /// Post the user may edit; `Forbidden` for anyone but its author
    pub async fn get_for_author(&self, id: i64, user: &User) -> Result<PostWithMeta, PostServiceError> {
        let authored = self
            .post_repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or(PostServiceError::NotFound)?;
        if !user.can_edit(authored.post.author_id) {
            return Err(PostServiceError::Forbidden);
        }
        self.attach_tags(authored).await
    }

    /// Create a post with a unique slug derived from its title.
    ///
    /// Tags are looked up by slug and created when missing. If tagging fails
    /// the post is removed again, so a failed create leaves nothing behind.
    pub async fn create(&self, input: CreatePostInput) -> Result<Post, PostServiceError> {
        let mut new_post = NewPost {
            title: input.title,
            slug: String::new(),
            body: input.body,
            image: input.image,
            author_id: input.author_id,
            status: input.status,
            publish: Utc::now(),
        };

        let mut attempt = 1;
        let post = loop {
            new_post.slug = self.unique_slug(&new_post.title).await?;
            match self.post_repo.create(&new_post).await {
                Ok(post) => break post,
                // Another post took the slug between the check and the insert
                Err(e) if is_unique_violation(&e) && attempt < MAX_SLUG_ATTEMPTS => {
                    tracing::debug!(slug = %new_post.slug, "Slug taken concurrently, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.context("Failed to create post").into()),
            }
        };

        if let Err(e) = self.tag_post(post.id, &input.tags).await {
            if let Err(cleanup) = self.post_repo.delete(post.id).await {
                tracing::error!(post_id = post.id, "Failed to remove untagged post: {}", cleanup);
            }
            return Err(e);
        }

        tracing::info!(post_id = post.id, slug = %post.slug, "Post created");
        Ok(post)
    }

    /// Update title, body, image and status. The slug stays fixed.
    pub async fn update(
        &self,
        id: i64,
        user: &User,
        input: UpdatePostInput,
    ) -> Result<Post, PostServiceError> {
        self.get_for_author(id, user).await?;

        let post = self
            .post_repo
            .update(id, &input)
            .await
            .context("Failed to update post")?
            .ok_or(PostServiceError::NotFound)?;

        tracing::info!(post_id = id, "Post updated");
        Ok(post)
    }

    /// Delete a post with its comments and tag links
    pub async fn delete(&self, id: i64, user: &User) -> Result<(), PostServiceError> {
        self.get_for_author(id, user).await?;

        if !self
            .post_repo
            .delete(id)
            .await
            .context("Failed to delete post")?
        {
            return Err(PostServiceError::NotFound);
        }

        tracing::info!(post_id = id, "Post deleted");
        Ok(())
    }

    /// Slug for `title` that no existing post uses: the plain slug, or the
    /// plain slug followed by `-2`, `-3`, ...
    pub async fn unique_slug(&self, title: &str) -> Result<String, PostServiceError> {
        let mut base = generate_slug(title);
        if base.is_empty() {
            base = FALLBACK_SLUG.to_string();
        }

        let mut candidate = base.clone();
        let mut suffix = 2;
        while self
            .post_repo
            .slug_exists(&candidate)
            .await
            .context("Failed to check slug")?
        {
            candidate = format!("{}-{}", base, suffix);
            suffix += 1;
        }
        Ok(candidate)
    }

    async fn tag_post(&self, post_id: i64, names: &[String]) -> Result<(), PostServiceError> {
        for name in names {
            let tag = self.get_or_create_tag(name).await?;
            self.tag_repo
                .add_to_post(tag.id, post_id)
                .await
                .context("Failed to tag post")?;
        }
        Ok(())
    }

    async fn get_or_create_tag(&self, name: &str) -> Result<Tag, PostServiceError> {
        let mut slug = generate_slug(name);
        if slug.is_empty() {
            slug = name.to_lowercase();
        }

        if let Some(tag) = self
            .tag_repo
            .get_by_slug(&slug)
            .await
            .context("Failed to look up tag")?
        {
            return Ok(tag);
        }

        match self.tag_repo.create(&Tag::new(name.to_string(), slug.clone())).await {
            Ok(tag) => Ok(tag),
            // Created by a concurrent post since the lookup
            Err(e) if is_unique_violation(&e) => self
                .tag_repo
                .get_by_slug(&slug)
                .await
                .context("Failed to look up tag")?
                .ok_or_else(|| e.context("Failed to create tag").into()),
            Err(e) => Err(e.context("Failed to create tag").into()),
        }
    }

    async fn attach_tags(&self, authored: AuthoredPost) -> Result<PostWithMeta, PostServiceError> {
        let tags = self
            .tag_repo
            .get_by_post_id(authored.post.id)
            .await
            .context("Failed to load tags")?;
        Ok(PostWithMeta::new(authored.post, authored.author, tags))
    }

    async fn with_meta(&self, rows: Vec<AuthoredPost>) -> Result<Vec<PostWithMeta>, PostServiceError> {
        let mut posts = Vec::with_capacity(rows.len());
        for authored in rows {
            posts.push(self.attach_tags(authored).await?);
        }
        Ok(posts)
    }
}

/// Generate a URL-friendly slug.
///
/// Lowercases ASCII letters and digits, turns runs of whitespace, `-` and
/// `_` into single hyphens, and drops everything else.
pub fn generate_slug(title: &str) -> String {
    let mut result = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !result.is_empty() {
                result.push('-');
            }
            pending_hyphen = false;
            result.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_hyphen = true;
        }
    }

    result
}
