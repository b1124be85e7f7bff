//! Reader-facing post pages: listing, detail with comments, sharing

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::Response,
    Form,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use super::error::{parse_id, WebError};
use super::flash::Flash;
use super::middleware::MaybeUser;
use super::render::render_page;
use super::AppState;
use crate::forms::{CommentForm, EmailPostForm, FormErrors};
use crate::models::{CreateCommentInput, PostWithMeta, User};
use crate::services::share_mail;

/// Query parameters for listing posts
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub query: Option<String>,
}

/// GET / - Published posts, newest first
pub async fn list(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    flash: Flash,
    Query(params): Query<ListParams>,
) -> Result<Response, WebError> {
    render_list(&state, user, flash, None, params).await
}

/// GET /tag/{tag_slug}/ - Published posts with a tag
pub async fn list_by_tag(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    flash: Flash,
    Path(tag_slug): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Response, WebError> {
    render_list(&state, user, flash, Some(&tag_slug), params).await
}

async fn render_list(
    state: &AppState,
    user: Option<User>,
    flash: Flash,
    tag_slug: Option<&str>,
    params: ListParams,
) -> Result<Response, WebError> {
    let listing = state
        .post_service
        .list_published(tag_slug, params.query.as_deref(), params.page.as_deref())
        .await?;

    let mut context = TeraContext::new();
    context.insert("posts", &listing.posts);
    context.insert("tag", &listing.tag);
    context.insert("query", params.query.as_deref().map(str::trim).unwrap_or(""));
    render_page(state, "blog/post/list.html", context, user.as_ref(), flash)
}

/// GET /{id}/{slug}/ - A published post with its comments
pub async fn detail(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    flash: Flash,
    Path((id, slug)): Path<(String, String)>,
) -> Result<Response, WebError> {
    let post = state
        .post_service
        .get_published(parse_id(&id)?, &slug)
        .await?;
    render_detail(&state, user, flash, post, CommentForm::default(), FormErrors::new()).await
}

/// POST /{id}/{slug}/ - Add a comment
pub async fn comment(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    mut flash: Flash,
    Path((id, slug)): Path<(String, String)>,
    Form(form): Form<CommentForm>,
) -> Result<Response, WebError> {
    let post = state
        .post_service
        .get_published(parse_id(&id)?, &slug)
        .await?;

    match form.validate() {
        Ok(cleaned) => {
            state
                .comment_service
                .create(CreateCommentInput {
                    post_id: post.post.id,
                    name: cleaned.name,
                    email: cleaned.email,
                    body: cleaned.body,
                })
                .await?;
            flash.success("Your comment has been submitted successfully!");
            Ok(flash.redirect(&post.url))
        }
        Err(errors) => render_detail(&state, user, flash, post, form, errors).await,
    }
}

async fn render_detail(
    state: &AppState,
    user: Option<User>,
    flash: Flash,
    post: PostWithMeta,
    form: CommentForm,
    errors: FormErrors,
) -> Result<Response, WebError> {
    let comments = state.comment_service.list_active(post.post.id).await?;
    let similar = state.post_service.similar_posts(post.post.id).await?;

    let mut context = TeraContext::new();
    context.insert("post", &post);
    context.insert("comments", &comments);
    context.insert("form", &form);
    context.insert("errors", &errors);
    context.insert("similar_post", &similar);
    render_page(state, "blog/post/detail.html", context, user.as_ref(), flash)
}

/// GET /{id}/share/ - Share form
pub async fn share_form(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    flash: Flash,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, WebError> {
    let post = state.post_service.get_published_by_id(parse_id(&id)?).await?;
    let post_url = absolute_url(&state, &headers, &post.url);
    render_share(&state, user, flash, post, post_url, EmailPostForm::default(), FormErrors::new(), false)
}

/// POST /{id}/share/ - Send a recommendation email
pub async fn share(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    mut flash: Flash,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(form): Form<EmailPostForm>,
) -> Result<Response, WebError> {
    let post = state.post_service.get_published_by_id(parse_id(&id)?).await?;
    let post_url = absolute_url(&state, &headers, &post.url);

    let (form, errors, sent) = match form.validate() {
        Ok(cleaned) => {
            let mail = share_mail(
                &state.config.mail.from,
                &cleaned.to,
                &cleaned.name,
                &post.post.title,
                &post_url,
                &cleaned.comments,
            );
            let sent = match state.mailer.send(&mail).await {
                Ok(()) => {
                    tracing::info!(post_id = post.post.id, "Post shared by email");
                    true
                }
                Err(e) => {
                    tracing::error!(post_id = post.post.id, "Failed to send share email: {}", e);
                    flash.error("Your email could not be sent. Please try again later.");
                    false
                }
            };
            (cleaned, FormErrors::new(), sent)
        }
        Err(errors) => (form, errors, false),
    };

    render_share(&state, user, flash, post, post_url, form, errors, sent)
}

#[allow(clippy::too_many_arguments)]
fn render_share(
    state: &AppState,
    user: Option<User>,
    flash: Flash,
    post: PostWithMeta,
    post_url: String,
    form: EmailPostForm,
    errors: FormErrors,
    sent: bool,
) -> Result<Response, WebError> {
    let mut context = TeraContext::new();
    context.insert("post", &post);
    context.insert("form", &form);
    context.insert("errors", &errors);
    context.insert("sent", &sent);
    context.insert("post_url", &post_url);
    render_page(state, "blog/post/share.html", context, user.as_ref(), flash)
}

/// Absolute URL for `path`: the configured base URL, else the Host header
fn absolute_url(state: &AppState, headers: &HeaderMap, path: &str) -> String {
    if let Some(base) = state.config.server.base_url.as_deref() {
        return format!("{}{}", base.trim_end_matches('/'), path);
    }
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{}{}", host, path)
}
