//! Session model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Login session; the id is the value of the `session` cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a session for `user_id` with a fresh random id
    pub fn new(user_id: i64, lifetime: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + lifetime,
            created_at: now,
        }
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_not_expired() {
        let session = Session::new(1, Duration::days(7));
        assert!(!session.is_expired());
        assert_eq!(session.id.len(), 36);
    }

    #[test]
    fn test_session_in_the_past_is_expired() {
        let session = Session::new(1, Duration::seconds(-1));
        assert!(session.is_expired());
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = Session::new(1, Duration::days(1));
        let b = Session::new(1, Duration::days(1));
        assert_ne!(a.id, b.id);
    }
}
