//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registered account; authors own posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User.
    ///
    /// The password must already be hashed with `services::password::hash_password()`.
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            username,
            email,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }

    /// Only the author may edit or delete a post
    pub fn can_edit(&self, author_id: i64) -> bool {
        self.id == author_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_edit_only_own_posts() {
        let mut user = User::new("alice".into(), "alice@example.com".into(), "hash".into());
        user.id = 3;
        assert!(user.can_edit(3));
        assert!(!user.can_edit(4));
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("alice".into(), "alice@example.com".into(), "secret".into());
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("alice@example.com"));
    }
}
