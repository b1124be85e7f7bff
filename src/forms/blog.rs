//! Forms for readers and authors: sharing, commenting, subscribing, editing

use super::{clean_email, clean_text, FormErrors};
use crate::models::PostStatus;
use serde::{Deserialize, Serialize};

const MAX_SHARE_NAME_LENGTH: usize = 25;
const MAX_COMMENT_NAME_LENGTH: usize = 80;
const MAX_TITLE_LENGTH: usize = 100;
const MAX_TAG_LENGTH: usize = 100;

/// Recommend a post to someone by email
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EmailPostForm {
    pub name: String,
    pub email: String,
    pub to: String,
    pub comments: String,
}

impl EmailPostForm {
    pub fn validate(&self) -> Result<EmailPostForm, FormErrors> {
        let mut errors = FormErrors::new();
        let cleaned = EmailPostForm {
            name: clean_text(&mut errors, "name", &self.name, Some(MAX_SHARE_NAME_LENGTH)),
            email: clean_email(&mut errors, "email", &self.email),
            to: clean_email(&mut errors, "to", &self.to),
            comments: self.comments.trim().to_string(),
        };
        errors.into_result(cleaned)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CommentForm {
    pub name: String,
    pub email: String,
    pub body: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<CommentForm, FormErrors> {
        let mut errors = FormErrors::new();
        let cleaned = CommentForm {
            name: clean_text(&mut errors, "name", &self.name, Some(MAX_COMMENT_NAME_LENGTH)),
            email: clean_email(&mut errors, "email", &self.email),
            body: clean_text(&mut errors, "body", &self.body, None),
        };
        errors.into_result(cleaned)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SubscribeForm {
    pub email: String,
}

impl SubscribeForm {
    /// The cleaned address
    pub fn validate(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        let email = clean_email(&mut errors, "email", &self.email);
        errors.into_result(email)
    }
}

/// Post editor fields. Built from a multipart body, so not deserialized.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PostForm {
    pub title: String,
    pub body: String,
    pub status: String,
    pub tags: String,
}

/// Validated editor input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedPost {
    pub title: String,
    pub body: String,
    pub status: PostStatus,
    pub tags: Vec<String>,
}

impl PostForm {
    pub fn validate(&self) -> Result<CleanedPost, FormErrors> {
        let mut errors = FormErrors::new();
        let title = clean_text(&mut errors, "title", &self.title, Some(MAX_TITLE_LENGTH));
        let body = clean_text(&mut errors, "body", &self.body, None);

        let status = match self.status.trim() {
            "" => PostStatus::default(),
            raw => PostStatus::from_str(raw).unwrap_or_else(|| {
                errors.add(
                    "status",
                    format!(
                        "Select a valid choice. {} is not one of the available choices.",
                        raw
                    ),
                );
                PostStatus::default()
            }),
        };

        let tags = parse_tags(&self.tags);
        if tags.iter().any(|t| t.chars().count() > MAX_TAG_LENGTH) {
            errors.add(
                "tags",
                format!("Tag names can have at most {} characters.", MAX_TAG_LENGTH),
            );
        }

        errors.into_result(CleanedPost {
            title,
            body,
            status,
            tags,
        })
    }
}

/// Split a tag string into names.
///
/// Commas separate names when any comma is present, so `"web dev, rust"`
/// gives `web dev` and `rust`. Otherwise whitespace separates them. Names
/// are trimmed, surrounding double quotes are dropped, and duplicates keep
/// their first position.
pub fn parse_tags(input: &str) -> Vec<String> {
    let pieces: Vec<&str> = if input.contains(',') {
        input.split(',').collect()
    } else {
        input.split_whitespace().collect()
    };

    let mut names: Vec<String> = Vec::new();
    for piece in pieces {
        let name = piece.trim().trim_matches('"').trim();
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::{INVALID_EMAIL, REQUIRED};
    use proptest::prelude::*;

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags("rust web"), vec!["rust", "web"]);
        assert_eq!(parse_tags("web dev, rust"), vec!["web dev", "rust"]);
        assert_eq!(parse_tags(" a ,, b , a "), vec!["a", "b"]);
        assert_eq!(parse_tags("\"quoted\" plain"), vec!["quoted", "plain"]);
        assert!(parse_tags("   ").is_empty());
        assert!(parse_tags(",,,").is_empty());
    }

    #[test]
    fn test_share_form() {
        let form = EmailPostForm {
            name: "Ann".to_string(),
            email: "ann@example.com".to_string(),
            to: "bad".to_string(),
            comments: String::new(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.fields["to"], vec![INVALID_EMAIL]);
        assert!(!errors.has("comments"));

        let form = EmailPostForm {
            name: "x".repeat(26),
            ..form
        };
        assert!(form.validate().unwrap_err().has("name"));
    }

    #[test]
    fn test_comment_form() {
        let errors = CommentForm::default().validate().unwrap_err();
        for field in ["name", "email", "body"] {
            assert_eq!(errors.fields[field], vec![REQUIRED]);
        }

        let form = CommentForm {
            name: " Ann ".to_string(),
            email: "ann@example.com".to_string(),
            body: " Nice ".to_string(),
        };
        let cleaned = form.validate().unwrap();
        assert_eq!(cleaned.name, "Ann");
        assert_eq!(cleaned.body, "Nice");
    }

    #[test]
    fn test_subscribe_form() {
        let form = SubscribeForm {
            email: " reader@example.com ".to_string(),
        };
        assert_eq!(form.validate().unwrap(), "reader@example.com");
        assert!(SubscribeForm::default().validate().is_err());
    }

    #[test]
    fn test_post_form_status() {
        let mut form = PostForm {
            title: "Title".to_string(),
            body: "Body".to_string(),
            status: String::new(),
            tags: "rust, web".to_string(),
        };
        let cleaned = form.validate().unwrap();
        assert_eq!(cleaned.status, PostStatus::Draft);
        assert_eq!(cleaned.tags, vec!["rust", "web"]);

        form.status = "published".to_string();
        assert_eq!(form.validate().unwrap().status, PostStatus::Published);

        form.status = "archived".to_string();
        assert!(form.validate().unwrap_err().has("status"));
    }

    #[test]
    fn test_post_form_title_limit() {
        let form = PostForm {
            title: "t".repeat(101),
            body: "Body".to_string(),
            ..PostForm::default()
        };
        assert!(form.validate().unwrap_err().has("title"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Parsed names are non-empty, trimmed and unique
        #[test]
        fn parsed_tags_are_clean(input in "[a-z ,\"]{0,60}") {
            let names = parse_tags(&input);
            let mut seen = std::collections::HashSet::new();
            for name in &names {
                prop_assert!(!name.is_empty());
                prop_assert_eq!(name.trim(), name.as_str());
                prop_assert!(seen.insert(name.clone()));
            }
        }
    }
}
