//! Tag model

use serde::{Deserialize, Serialize};

/// Free-form label attached to posts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    /// URL-friendly slug, used by `/tag/{slug}/`
    pub slug: String,
}

impl Tag {
    pub fn new(name: String, slug: String) -> Self {
        Self { id: 0, name, slug }
    }
}
