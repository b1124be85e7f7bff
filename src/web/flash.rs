//! One-shot flash messages
//!
//! Messages added while handling a request are either shown on the page
//! rendered by that request, or carried across a redirect in the `flash`
//! cookie and shown (then cleared) on the next rendered page.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

use super::middleware::get_cookie;

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: Level,
    pub text: String,
}

/// Pending messages for the current request
#[derive(Debug, Default)]
pub struct Flash {
    incoming: Vec<FlashMessage>,
    added: Vec<FlashMessage>,
}

impl Flash {
    pub fn push(&mut self, level: Level, text: impl Into<String>) {
        self.added.push(FlashMessage {
            level,
            text: text.into(),
        });
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.push(Level::Success, text);
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(Level::Info, text);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(Level::Error, text);
    }

    /// All messages, for display on a rendered page. Returns the cookie
    /// header that clears the carried messages, if any were carried.
    pub fn take_for_render(self) -> (Vec<FlashMessage>, Option<HeaderValue>) {
        let clear = (!self.incoming.is_empty()).then(clear_cookie);
        let mut messages = self.incoming;
        messages.extend(self.added);
        (messages, clear)
    }

    /// Redirect, carrying every undisplayed message along
    pub fn redirect(self, to: &str) -> Response {
        let mut messages = self.incoming;
        messages.extend(self.added);

        let mut response = Redirect::to(to).into_response();
        if let Some(value) = encode_cookie(&messages) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        response
    }
}

impl<S> FromRequestParts<S> for Flash
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Flash {
            incoming: get_cookie(&parts.headers, FLASH_COOKIE)
                .map(|raw| decode(&raw))
                .unwrap_or_default(),
            added: Vec::new(),
        })
    }
}

fn decode(raw: &str) -> Vec<FlashMessage> {
    urlencoding::decode(raw)
        .ok()
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or_default()
}

fn encode_cookie(messages: &[FlashMessage]) -> Option<HeaderValue> {
    if messages.is_empty() {
        return None;
    }
    let json = serde_json::to_string(messages).ok()?;
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        FLASH_COOKIE,
        urlencoding::encode(&json)
    ))
    .ok()
}

fn clear_cookie() -> HeaderValue {
    HeaderValue::from_static("flash=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
