//! Form validation
//!
//! Forms are deserialized straight from request bodies, every field
//! defaulting to empty. `validate()` trims the input and either returns the
//! cleaned values or a `FormErrors` describing what to fix. The raw form is
//! kept around so a failed submission can be re-rendered with what the
//! visitor typed.

mod account;
mod blog;

pub use account::{LoginForm, SignupForm};
pub use blog::{parse_tags, CleanedPost, CommentForm, EmailPostForm, PostForm, SubscribeForm};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";

/// Longest accepted email address
const MAX_EMAIL_LENGTH: usize = 254;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("email pattern is valid")
});

/// Validation errors, keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormErrors {
    pub fields: BTreeMap<String, Vec<String>>,
    pub non_field: Vec<String>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// `Ok(value)` when nothing was recorded
    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// Whether `value` looks like an email address
pub fn is_valid_email(value: &str) -> bool {
    value.len() <= MAX_EMAIL_LENGTH && EMAIL_RE.is_match(value)
}

/// Trimmed required text of at most `max_chars` characters
pub(crate) fn clean_text(
    errors: &mut FormErrors,
    field: &str,
    value: &str,
    max_chars: Option<usize>,
) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
        return String::new();
    }
    if let Some(max) = max_chars {
        let len = value.chars().count();
        if len > max {
            errors.add(
                field,
                format!(
                    "Ensure this value has at most {} characters (it has {}).",
                    max, len
                ),
            );
        }
    }
    value.to_string()
}

/// Trimmed required email address
pub(crate) fn clean_email(errors: &mut FormErrors, field: &str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    } else if !is_valid_email(value) {
        errors.add(field, INVALID_EMAIL);
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("reader@example.com"));
        assert!(is_valid_email("first.last+tag@mail.example.co.uk"));
        assert!(!is_valid_email("reader"));
        assert!(!is_valid_email("reader@localhost"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email("trailing@example."));
    }

    #[test]
    fn test_clean_text() {
        let mut errors = FormErrors::new();
        assert_eq!(clean_text(&mut errors, "name", "  Ann  ", Some(5)), "Ann");
        assert!(errors.is_empty());

        clean_text(&mut errors, "name", "   ", Some(5));
        clean_text(&mut errors, "title", "toolong", Some(5));
        assert_eq!(errors.fields["name"], vec![REQUIRED]);
        assert_eq!(
            errors.fields["title"],
            vec!["Ensure this value has at most 5 characters (it has 7)."]
        );
    }

    #[test]
    fn test_into_result() {
        assert_eq!(FormErrors::new().into_result(3), Ok(3));
        let mut errors = FormErrors::new();
        errors.add_non_field("nope");
        assert!(errors.into_result(3).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Anything without an @ is rejected
        #[test]
        fn email_without_at_is_invalid(value in "[^@]{0,40}") {
            prop_assert!(!is_valid_email(&value));
        }

        /// Simple well-formed addresses are accepted
        #[test]
        fn simple_email_is_valid(
            local in "[a-z0-9._]{1,20}",
            domain in "[a-z0-9-]{1,20}",
            tld in "[a-z]{2,6}",
        ) {
            let address = format!("{}@{}.{}", local, domain, tld);
            prop_assert!(is_valid_email(&address));
        }
    }
}
