//! Account pages: login, signup, logout and profile

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::Response,
    Form,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use super::error::WebError;
use super::flash::Flash;
use super::middleware::{
    clear_session_cookie, get_cookie, session_cookie, AuthenticatedUser, MaybeUser, SESSION_COOKIE,
};
use super::render::render_page;
use super::AppState;
use crate::forms::{FormErrors, LoginForm, SignupForm};
use crate::models::User;
use crate::services::UserServiceError;

const FORM_ERRORS: &str = "Please correct the errors below.";

#[derive(Debug, Default, Deserialize)]
pub struct NextParam {
    pub next: Option<String>,
}

/// `next` if it is a path on this site
fn safe_next(next: &str) -> Option<&str> {
    (next.starts_with('/') && !next.starts_with("//") && !next.contains('\\')).then_some(next)
}

/// GET /login/
pub async fn login_form(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    flash: Flash,
    Query(params): Query<NextParam>,
) -> Result<Response, WebError> {
    let form = LoginForm {
        next: params.next.unwrap_or_default(),
        ..LoginForm::default()
    };
    render_login(&state, user, flash, form, FormErrors::new())
}

/// POST /login/
pub async fn login(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    mut flash: Flash,
    headers: HeaderMap,
    Query(params): Query<NextParam>,
    Form(mut form): Form<LoginForm>,
) -> Result<Response, WebError> {
    if form.next.is_empty() {
        form.next = params.next.unwrap_or_default();
    }

    let (username, password) = match form.validate() {
        Ok(credentials) => credentials,
        Err(errors) => {
            flash.error(FORM_ERRORS);
            return render_login(&state, user, flash, form, errors);
        }
    };

    let account = match state.user_service.authenticate(&username, &password).await {
        Ok(account) => account,
        Err(UserServiceError::InvalidCredentials) => {
            tracing::debug!(username = %username, "Login rejected");
            flash.error(UserServiceError::InvalidCredentials.to_string());
            return render_login(&state, user, flash, form, FormErrors::new());
        }
        Err(e) => return Err(e.into()),
    };

    let target = safe_next(&form.next).unwrap_or("/").to_string();
    flash.success("You have successfully logged in.");
    start_session(&state, &headers, &account, flash, &target).await
}

fn render_login(
    state: &AppState,
    user: Option<User>,
    flash: Flash,
    form: LoginForm,
    errors: FormErrors,
) -> Result<Response, WebError> {
    let mut context = TeraContext::new();
    context.insert("form", &form);
    context.insert("errors", &errors);
    context.insert("next", &form.next);
    render_page(state, "blog/login.html", context, user.as_ref(), flash)
}

/// GET /signup/
pub async fn signup_form(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    flash: Flash,
) -> Result<Response, WebError> {
    render_signup(&state, user, flash, SignupForm::default(), FormErrors::new())
}

/// POST /signup/
pub async fn signup(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    mut flash: Flash,
    headers: HeaderMap,
    Form(form): Form<SignupForm>,
) -> Result<Response, WebError> {
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => {
            flash.error(FORM_ERRORS);
            return render_signup(&state, user, flash, form, errors);
        }
    };

    let account = match state.user_service.signup(input).await {
        Ok(account) => account,
        Err(e @ (UserServiceError::UsernameTaken | UserServiceError::EmailTaken)) => {
            flash.error(e.to_string());
            return render_signup(&state, user, flash, form, FormErrors::new());
        }
        Err(e) => return Err(e.into()),
    };

    flash.success("Signup successful! You are now logged in.");
    start_session(&state, &headers, &account, flash, "/").await
}

fn render_signup(
    state: &AppState,
    user: Option<User>,
    flash: Flash,
    form: SignupForm,
    errors: FormErrors,
) -> Result<Response, WebError> {
    let mut context = TeraContext::new();
    context.insert("form", &form);
    context.insert("errors", &errors);
    render_page(state, "blog/signup.html", context, user.as_ref(), flash)
}

/// Replace any existing session with a new one and redirect
async fn start_session(
    state: &AppState,
    headers: &HeaderMap,
    account: &User,
    flash: Flash,
    target: &str,
) -> Result<Response, WebError> {
    if let Some(old) = get_cookie(headers, SESSION_COOKIE) {
        state.user_service.logout(&old).await?;
    }

    let session = state.user_service.login(account).await?;
    let cookie = session_cookie(&session.id, state.user_service.session_lifetime())
        .ok_or_else(|| WebError::Internal(anyhow::anyhow!("Invalid session cookie value")))?;

    tracing::info!(user_id = account.id, "User logged in");
    let mut response = flash.redirect(target);
    response.headers_mut().append(header::SET_COOKIE, cookie);
    Ok(response)
}

/// POST /logout/
pub async fn logout(
    State(state): State<AppState>,
    mut flash: Flash,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    if let Some(session_id) = get_cookie(&headers, SESSION_COOKIE) {
        state.user_service.logout(&session_id).await?;
    }

    flash.info("You have been logged out.");
    let mut response = flash.redirect("/");
    response
        .headers_mut()
        .append(header::SET_COOKIE, clear_session_cookie());
    Ok(response)
}

/// GET /profile/ - The current user's posts, drafts included
pub async fn profile(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    flash: Flash,
) -> Result<Response, WebError> {
    let posts = state.post_service.list_by_author(user.id).await?;

    let mut context = TeraContext::new();
    context.insert("user_posts", &posts);
    render_page(&state, "blog/post/profile.html", context, Some(&user), flash)
}
