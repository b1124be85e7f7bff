//! Web layer - HTML handlers and routing
//!
//! Server-rendered pages for:
//! - Post listing, tag filtering and search
//! - Post detail with comments and similar posts
//! - Sharing posts by email
//! - Newsletter subscription
//! - Login, signup, logout and profile
//! - Author-only post editor
//!
//! Uploaded images are served from the media root under `/media`.

pub mod auth;
pub mod editor;
pub mod error;
pub mod flash;
pub mod middleware;
pub mod posts;
pub mod render;
pub mod subscribe;


use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use chrono::Duration;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::config::Config;
use crate::db::repositories::{
    SqlxCommentRepository, SqlxPostRepository, SqlxSessionRepository, SqlxSubscriberRepository,
    SqlxTagRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{CommentService, Mailer, PostService, SubscriberService, UserService};
use crate::templates::TemplateEngine;

pub use error::WebError;
pub use middleware::{AuthenticatedUser, MaybeUser};

/// Room for the text fields sent alongside an uploaded image
const FORM_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub post_service: Arc<PostService>,
    pub comment_service: Arc<CommentService>,
    pub subscriber_service: Arc<SubscriberService>,
    pub user_service: Arc<UserService>,
    pub mailer: Arc<dyn Mailer>,
    pub templates: Arc<TemplateEngine>,
}

impl AppState {
    /// Wire repositories and services over `pool`
    pub fn new(
        pool: DynDatabasePool,
        config: Config,
        mailer: Arc<dyn Mailer>,
        templates: TemplateEngine,
    ) -> Self {
        let post_service = PostService::new(
            SqlxPostRepository::boxed(pool.clone()),
            SqlxTagRepository::boxed(pool.clone()),
        );
        let comment_service = CommentService::new(SqlxCommentRepository::boxed(pool.clone()));
        let subscriber_service =
            SubscriberService::new(SqlxSubscriberRepository::boxed(pool.clone()));
        let user_service = UserService::with_session_lifetime(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
            Duration::days(config.session.lifetime_days),
        );

        Self {
            config: Arc::new(config),
            post_service: Arc::new(post_service),
            comment_service: Arc::new(comment_service),
            subscriber_service: Arc::new(subscriber_service),
            user_service: Arc::new(user_service),
            mailer,
            templates: Arc::new(templates),
        }
    }
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    // Pages that need a logged-in user
    let protected_routes = Router::new()
        .route("/profile/", get(auth::profile))
        .route("/post/create/", get(editor::create_form).post(editor::create))
        .route("/post/{id}/edit/", get(editor::edit_form).post(editor::update))
        .route(
            "/post/{id}/delete/",
            get(editor::confirm_delete).post(editor::delete),
        )
        .route_layer(axum_middleware::from_fn(middleware::require_auth));

    let body_limit = (state.config.upload.max_file_size + FORM_OVERHEAD_BYTES) as usize;

    Router::new()
        .route("/", get(posts::list))
        .route("/tag/{tag_slug}/", get(posts::list_by_tag))
        .route("/{id}/share/", get(posts::share_form).post(posts::share))
        .route("/{id}/{slug}/", get(posts::detail).post(posts::comment))
        .route("/login/", get(auth::login_form).post(auth::login))
        .route("/signup/", get(auth::signup_form).post(auth::signup))
        .route("/logout/", post(auth::logout))
        .route("/subscribe/", post(subscribe::subscribe))
        .merge(protected_routes)
        .nest_service("/media", ServeDir::new(&state.config.upload.path))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(body_limit))
                .layer(axum_middleware::from_fn_with_state(
                    state.clone(),
                    middleware::load_user,
                ))
                .layer(axum_middleware::from_fn_with_state(
                    state.clone(),
                    middleware::render_error_pages,
                )),
        )
        .with_state(state)
}

async fn not_found() -> WebError {
    WebError::NotFound
}
