//! Login and signup forms

use super::{clean_email, clean_text, FormErrors, REQUIRED};
use crate::services::SignupInput;
use serde::{Deserialize, Serialize};

const MAX_USERNAME_LENGTH: usize = 50;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Where to go after logging in
    pub next: String,
}

impl LoginForm {
    /// Cleaned username and password
    pub fn validate(&self) -> Result<(String, String), FormErrors> {
        let mut errors = FormErrors::new();
        let username = clean_text(&mut errors, "username", &self.username, Some(MAX_USERNAME_LENGTH));
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        if username.is_empty() || self.password.is_empty() {
            errors.add_non_field("Both fields are required.");
        }
        errors.into_result((username, self.password.clone()))
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub confirm_password: String,
}

impl SignupForm {
    pub fn validate(&self) -> Result<SignupInput, FormErrors> {
        let mut errors = FormErrors::new();
        let username = clean_text(&mut errors, "username", &self.username, Some(MAX_USERNAME_LENGTH));
        let email = clean_email(&mut errors, "email", &self.email);
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        if self.confirm_password.is_empty() {
            errors.add("confirm_password", REQUIRED);
        }
        if self.password != self.confirm_password {
            errors.add_non_field("Passwords do not match.");
        }
        errors.into_result(SignupInput {
            username,
            email,
            password: self.password.clone(),
        })
    }
}
