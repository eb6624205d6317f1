//! Subscribing to and unsubscribing from authors.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("user `{0}` does not exist")]
    UnknownAuthor(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Followed,
    AlreadyFollowing,
    Unfollowed,
    NotFollowing,
    /// Following yourself is ignored.
    SelfIgnored,
}

#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FollowService {
    pub fn new(users: Arc<dyn UsersRepo>, follows: Arc<dyn FollowsRepo>) -> Self {
        Self { users, follows }
    }

    pub async fn follow(
        &self,
        user: &UserRecord,
        author_username: &str,
    ) -> Result<FollowOutcome, FollowError> {
        let author = self.author(author_username).await?;
        if author.id == user.id {
            return Ok(FollowOutcome::SelfIgnored);
        }

        let outcome = if self.follows.follow(user.id, author.id).await? {
            FollowOutcome::Followed
        } else {
            FollowOutcome::AlreadyFollowing
        };
        info!(
            target = "postboard::follows",
            user = %user.username,
            author = %author.username,
            outcome = ?outcome,
            "follow requested"
        );
        Ok(outcome)
    }

    pub async fn unfollow(
        &self,
        user: &UserRecord,
        author_username: &str,
    ) -> Result<FollowOutcome, FollowError> {
        let author = self.author(author_username).await?;
        if author.id == user.id {
            return Ok(FollowOutcome::SelfIgnored);
        }

        let outcome = if self.follows.unfollow(user.id, author.id).await? {
            FollowOutcome::Unfollowed
        } else {
            FollowOutcome::NotFollowing
        };
        info!(
            target = "postboard::follows",
            user = %user.username,
            author = %author.username,
            outcome = ?outcome,
            "unfollow requested"
        );
        Ok(outcome)
    }

    async fn author(&self, username: &str) -> Result<UserRecord, FollowError> {
        self.users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| FollowError::UnknownAuthor(username.to_string()))
    }
}
