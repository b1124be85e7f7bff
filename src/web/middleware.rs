//! Web middleware
//!
//! Contains middleware for:
//! - Resolving the session cookie to the current user
//! - Redirecting anonymous visitors away from protected pages
//! - Rendering error pages for handler errors

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Duration;
use std::convert::Infallible;

use super::error::ErrorPage;
use super::render::render_error_page;
use super::AppState;
use crate::models::User;

pub const SESSION_COOKIE: &str = "session";

/// Logged-in user, available to handlers behind [`require_auth`]
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Current user, if any
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

/// Value of the named cookie
pub(crate) fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;
            (key == name).then(|| value.to_string())
        })
        .next()
}

/// `Set-Cookie` value for a new session
pub fn session_cookie(session_id: &str, lifetime: Duration) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        session_id,
        lifetime.num_seconds().max(0)
    ))
    .ok()
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Login URL that returns to `path` afterwards
pub fn login_url(path: &str) -> String {
    format!("/login/?next={}", urlencoding::encode(path).replace("%2F", "/"))
}

/// Resolve the session cookie to a user and store it in the request
/// extensions. Lookup failures leave the request anonymous.
pub async fn load_user(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    if let Some(session_id) = get_cookie(request.headers(), SESSION_COOKIE) {
        match state.user_service.validate_session(&session_id).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Ok(None) => {
                tracing::debug!("Ignoring unknown or expired session");
            }
            Err(e) => {
                tracing::warn!("Session validation failed: {}", e);
            }
        }
    }
    next.run(request).await
}

/// Redirect anonymous visitors to the login page
pub async fn require_auth(request: Request, next: Next) -> Response {
    if request.extensions().get::<AuthenticatedUser>().is_none() {
        let path = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());
        return Redirect::to(&login_url(&path)).into_response();
    }
    next.run(request).await
}

/// Replace bodiless error responses produced by handlers with rendered
/// error pages
pub async fn render_error_pages(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|u| u.0.clone());

    let response = next.run(request).await;
    match response.extensions().get::<ErrorPage>().copied() {
        Some(ErrorPage(status)) => render_error_page(&state, status, user.as_ref()),
        None => response,
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| {
                let path = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or("/");
                Redirect::to(&login_url(path)).into_response()
            })
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .map(|u| u.0.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc-123; flash=x=y"),
        );
        assert_eq!(get_cookie(&headers, "session").as_deref(), Some("abc-123"));
        assert_eq!(get_cookie(&headers, "flash").as_deref(), Some("x=y"));
        assert!(get_cookie(&headers, "missing").is_none());
        assert!(get_cookie(&HeaderMap::new(), "session").is_none());
    }

    #[test]
    fn test_login_url_keeps_slashes() {
        assert_eq!(login_url("/profile/"), "/login/?next=/profile/");
        assert_eq!(
            login_url("/post/3/edit/?x=1"),
            "/login/?next=/post/3/edit/%3Fx%3D1"
        );
    }

    #[test]
    fn test_session_cookie_attributes() {
        let value = session_cookie("abc", Duration::days(7)).unwrap();
        let value = value.to_str().unwrap();
        assert!(value.starts_with("session=abc;"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("SameSite=Lax"));
        assert!(value.contains("Max-Age=604800"));
    }
}
