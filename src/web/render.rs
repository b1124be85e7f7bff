//! Page rendering
//!
//! Every page gets `user` (the logged-in user or null) and `messages`
//! (flash messages) on top of its own context.

use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use tera::Context as TeraContext;

use super::error::WebError;
use super::flash::{Flash, FlashMessage};
use super::AppState;
use crate::models::User;

/// Render `template` as a 200 response
pub fn render_page(
    state: &AppState,
    template: &str,
    mut context: TeraContext,
    user: Option<&User>,
    flash: Flash,
) -> Result<Response, WebError> {
    let (messages, clear_cookie) = flash.take_for_render();
    context.insert("user", &user);
    context.insert("messages", &messages);

    let html = state.templates.render(template, &context)?;

    let mut response = Html(html).into_response();
    if let Some(value) = clear_cookie {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    Ok(response)
}

/// Error page for `status`
pub fn render_error_page(state: &AppState, status: StatusCode, user: Option<&User>) -> Response {
    let template = match status {
        StatusCode::NOT_FOUND => "errors/404.html",
        StatusCode::FORBIDDEN => "errors/403.html",
        _ => "errors/500.html",
    };

    let mut context = TeraContext::new();
    context.insert("user", &user);
    context.insert("messages", &Vec::<FlashMessage>::new());

    (status, Html(state.templates.render_with_fallback(template, &context))).into_response()
}
