//! Newsletter subscription

use axum::{extract::State, response::Response, Form};

use super::error::WebError;
use super::flash::Flash;
use super::AppState;
use crate::forms::SubscribeForm;
use crate::services::SubscribeOutcome;

/// POST /subscribe/ - Always lands back on the listing page
pub async fn subscribe(
    State(state): State<AppState>,
    mut flash: Flash,
    Form(form): Form<SubscribeForm>,
) -> Result<Response, WebError> {
    match form.validate() {
        Ok(email) => match state.subscriber_service.subscribe(&email).await? {
            SubscribeOutcome::Subscribed => {
                flash.success("You have successfully subscribed to the newsletter!")
            }
            SubscribeOutcome::AlreadySubscribed => flash.info("You are already subscribed."),
        },
        Err(_) => flash.error("Please enter a valid email address."),
    }
    Ok(flash.redirect("/"))
}
