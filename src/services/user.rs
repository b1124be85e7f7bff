//! User service
//!
//! Account creation, credential checks and session management.
//! Sessions are rows in `sessions`; the id is handed to the browser as a cookie.

use crate::db::is_unique_violation;
use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{Session, User};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use chrono::Duration;
use std::sync::Arc;

/// Default session lifetime in days
const DEFAULT_SESSION_LIFETIME_DAYS: i64 = 7;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Unknown username or wrong password
    #[error("Invalid username or password.")]
    InvalidCredentials,

    #[error("Username already taken.")]
    UsernameTaken,

    #[error("Email already registered.")]
    EmailTaken,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Cleaned signup data; passwords have already been checked for equality
#[derive(Debug, Clone)]
pub struct SignupInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_lifetime: Duration,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self::with_session_lifetime(
            user_repo,
            session_repo,
            Duration::days(DEFAULT_SESSION_LIFETIME_DAYS),
        )
    }

    pub fn with_session_lifetime(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_lifetime: Duration,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_lifetime,
        }
    }

    /// Session lifetime, used for the cookie's Max-Age
    pub fn session_lifetime(&self) -> Duration {
        self.session_lifetime
    }

    /// Create an account.
    ///
    /// Username is checked before email, so a request clashing on both
    /// reports the username.
    pub async fn signup(&self, input: SignupInput) -> Result<User, UserServiceError> {
        if self
            .user_repo
            .get_by_username(&input.username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UsernameTaken);
        }

        if self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::EmailTaken);
        }

        let password_hash = hash_password(&input.password)?;
        let user = User::new(input.username, input.email, password_hash);

        // A concurrent signup can claim the name or address after the
        // checks above; the UNIQUE constraints have the final say.
        let created = match self.user_repo.create(&user).await {
            Ok(created) => created,
            Err(e) if is_unique_violation(&e) => {
                let username_taken = self
                    .user_repo
                    .get_by_username(&user.username)
                    .await
                    .context("Failed to check username")?
                    .is_some();
                return Err(if username_taken {
                    UserServiceError::UsernameTaken
                } else {
                    UserServiceError::EmailTaken
                });
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(user_id = created.id, username = %created.username, "User signed up");
        Ok(created)
    }

    /// Check a username/password pair.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<User, UserServiceError> {
        let user = self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to look up user")?
            .ok_or(UserServiceError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(UserServiceError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Start a session for an authenticated user
    pub async fn login(&self, user: &User) -> Result<Session, UserServiceError> {
        let session = Session::new(user.id, self.session_lifetime);
        let session = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        tracing::debug!(user_id = user.id, "Session created");
        Ok(session)
    }

    /// End a session; unknown ids are ignored
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session id to its user.
    ///
    /// Expired sessions are deleted and treated as absent.
    pub async fn validate_session(&self, session_id: &str) -> Result<Option<User>, UserServiceError> {
        let Some(session) = self
            .session_repo
            .get_by_id(session_id)
            .await
            .context("Failed to get session")?
        else {
            return Ok(None);
        };

        if session.is_expired() {
            self.session_repo
                .delete(session_id)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get session user")?;
        Ok(user)
    }

    /// Remove all expired sessions
    pub async fn purge_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let removed = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(removed)
    }
}
