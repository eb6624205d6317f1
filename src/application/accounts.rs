//! Registration, password login and cookie sessions.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::forms::{self, FormErrors};
use crate::application::repos::{CreateUserParams, RepoError, SessionsRepo, UsersRepo};
use crate::domain::entities::{SessionRecord, UserRecord};
use crate::domain::users::{MAX_USERNAME_LEN, is_valid_username, password_problems};

pub const DUPLICATE_USERNAME: &str = "A user with that username already exists.";
pub const INVALID_USERNAME: &str = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
pub const PASSWORD_MISMATCH: &str = "The two password fields didn’t match.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

const MIN_TOKEN_LEN: usize = 64;

#[derive(Debug, Clone, Default)]
pub struct SignupSubmission {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("account form is invalid: {0}")]
    Invalid(FormErrors),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Who is making the current request.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    user: Option<UserRecord>,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self { user: None }
    }

    pub fn authenticated(user: UserRecord) -> Self {
        Self { user: Some(user) }
    }

    pub fn user(&self) -> Option<&UserRecord> {
        self.user.as_ref()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|user| user.id)
    }
}

/// Freshly issued session; `token` is only ever held by the client cookie.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UsersRepo>,
    sessions: Arc<dyn SessionsRepo>,
    session_ttl: Duration,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        sessions: Arc<dyn SessionsRepo>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            session_ttl,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub async fn register(&self, submission: &SignupSubmission) -> Result<UserRecord, AccountError> {
        let mut errors = FormErrors::new();

        let username = forms::required_text(&mut errors, "username", &submission.username);
        if !username.is_empty() && !is_valid_username(&username) {
            if username.chars().count() > MAX_USERNAME_LEN {
                errors.add(
                    "username",
                    format!("Ensure this value has at most {MAX_USERNAME_LEN} characters."),
                );
            } else {
                errors.add("username", INVALID_USERNAME);
            }
        }
        if errors.field("username").is_empty()
            && self.users.find_user_by_username(&username).await?.is_some()
        {
            errors.add("username", DUPLICATE_USERNAME);
        }

        let email = submission.email.trim().to_string();
        if !email.is_empty() && !looks_like_email(&email) {
            errors.add("email", INVALID_EMAIL);
        }

        if submission.password1.is_empty() {
            errors.add("password1", forms::REQUIRED);
        }
        if submission.password2.is_empty() {
            errors.add("password2", forms::REQUIRED);
        }
        if !submission.password1.is_empty() && !submission.password2.is_empty() {
            if submission.password1 != submission.password2 {
                errors.add("password2", PASSWORD_MISMATCH);
            } else {
                for problem in password_problems(&submission.password2) {
                    errors.add("password2", problem);
                }
            }
        }

        errors.into_result().map_err(AccountError::Invalid)?;

        let password_hash = hash_password(submission.password1.clone()).await?;
        let user = self
            .users
            .create_user(CreateUserParams {
                username,
                first_name: submission.first_name.trim().to_string(),
                last_name: submission.last_name.trim().to_string(),
                email,
                password_hash,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => {
                    let mut errors = FormErrors::new();
                    errors.add("username", DUPLICATE_USERNAME);
                    AccountError::Invalid(errors)
                }
                other => AccountError::Repo(other),
            })?;

        info!(
            target = "postboard::accounts",
            user_id = user.id,
            username = %user.username,
            "user registered"
        );
        Ok(user)
    }

    /// Check a username/password pair. Any mismatch is a single general form error.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<UserRecord, AccountError> {
        let mut errors = FormErrors::new();
        let username = forms::required_text(&mut errors, "username", username);
        if password.is_empty() {
            errors.add("password", forms::REQUIRED);
        }
        errors.into_result().map_err(AccountError::Invalid)?;

        let user = self.users.find_user_by_username(&username).await?;
        let verified = match user.as_ref() {
            Some(user) => verify_password(password.to_string(), user.password_hash.clone()).await?,
            None => false,
        };

        match user {
            Some(user) if verified => Ok(user),
            _ => {
                warn!(
                    target = "postboard::accounts",
                    username = %username,
                    "rejected login attempt"
                );
                let mut errors = FormErrors::new();
                errors.add_general(INVALID_LOGIN);
                Err(AccountError::Invalid(errors))
            }
        }
    }

    pub async fn start_session(&self, user: &UserRecord) -> Result<IssuedSession, AccountError> {
        let token = generate_token();
        let created_at = OffsetDateTime::now_utc();
        let expires_at = created_at + self.session_ttl;

        match self.sessions.purge_expired_sessions(created_at).await {
            Ok(0) => {}
            Ok(removed) => info!(
                target = "postboard::accounts",
                removed,
                "purged expired sessions"
            ),
            Err(err) => warn!(
                target = "postboard::accounts",
                error = %err,
                "failed to purge expired sessions"
            ),
        }

        self.sessions
            .create_session(SessionRecord {
                token_hash: hash_token(&token),
                user_id: user.id,
                created_at,
                expires_at,
            })
            .await?;

        Ok(IssuedSession { token, expires_at })
    }

    /// User behind a session cookie value, if the session is known and current.
    pub async fn resolve_session(&self, token: &str) -> Result<Option<UserRecord>, AccountError> {
        if token.len() < MIN_TOKEN_LEN || !token.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Ok(None);
        }
        Ok(self
            .sessions
            .find_session_user(&hash_token(token), OffsetDateTime::now_utc())
            .await?)
    }

    pub async fn end_session(&self, token: &str) -> Result<(), AccountError> {
        self.sessions.delete_session(&hash_token(token)).await?;
        Ok(())
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

async fn hash_password(password: String) -> Result<String, AccountError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| AccountError::Hashing(err.to_string()))
    })
    .await
    .map_err(|err| AccountError::Hashing(err.to_string()))?
}

async fn verify_password(password: String, stored_hash: String) -> Result<bool, AccountError> {
    tokio::task::spawn_blocking(move || {
        let parsed =
            PasswordHash::new(&stored_hash).map_err(|err| AccountError::Hashing(err.to_string()))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(err) => Err(AccountError::Hashing(err.to_string())),
        }
    })
    .await
    .map_err(|err| AccountError::Hashing(err.to_string()))?
}

/// Hash a password the same way registration does. Used by fixtures and tooling.
pub async fn hash_password_for_storage(password: &str) -> Result<String, AccountError> {
    hash_password(password.to_string()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_long_hex_and_unique() {
        let first = generate_token();
        let second = generate_token();
        assert_eq!(first.len(), MIN_TOKEN_LEN);
        assert!(first.chars().all(|ch| ch.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }

    #[test]
    fn token_hash_is_stable_sha256() {
        let hash = hash_token("abc");
        assert_eq!(hash.len(), 32);
        assert_eq!(
            hex::encode(&hash),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn email_shape_check() {
        assert!(looks_like_email("leo@example.org"));
        assert!(!looks_like_email("leo@localhost"));
        assert!(!looks_like_email("@example.org"));
        assert!(!looks_like_email("leo.example.org"));
    }

    #[tokio::test]
    async fn password_round_trip_through_argon2() {
        let hash = hash_password("correct horse".to_string()).await.expect("hash");
        assert!(hash.starts_with("$argon2"));
        assert!(
            verify_password("correct horse".to_string(), hash.clone())
                .await
                .expect("verify")
        );
        assert!(
            !verify_password("wrong horse".to_string(), hash)
                .await
                .expect("verify")
        );
    }
}
