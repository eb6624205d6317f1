//! Operator-managed groups.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{CreateGroupParams, GroupsRepo, RepoError};
use crate::domain::entities::GroupRecord;
use crate::domain::slug::{SlugAsyncError, SlugError, ensure_url_safe, generate_unique_slug_async};

const MAX_TITLE_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error("group slug `{0}` is already taken")]
    SlugTaken(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateGroupCommand {
    pub title: String,
    pub slug: Option<String>,
    pub description: String,
}

#[derive(Clone)]
pub struct GroupService {
    groups: Arc<dyn GroupsRepo>,
}

impl GroupService {
    pub fn new(groups: Arc<dyn GroupsRepo>) -> Self {
        Self { groups }
    }

    pub async fn list_groups(&self) -> Result<Vec<GroupRecord>, GroupError> {
        Ok(self.groups.list_groups().await?)
    }

    pub async fn create_group(&self, command: CreateGroupCommand) -> Result<GroupRecord, GroupError> {
        let title = command.title.trim().to_string();
        if title.is_empty() {
            return Err(GroupError::ConstraintViolation("title must not be empty"));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(GroupError::ConstraintViolation(
                "title must be at most 200 characters",
            ));
        }

        let slug = match command.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(explicit) => {
                ensure_url_safe(explicit)?;
                if self.groups.find_group_by_slug(explicit).await?.is_some() {
                    return Err(GroupError::SlugTaken(explicit.to_string()));
                }
                explicit.to_string()
            }
            None => self.unique_slug(&title).await?,
        };

        let group = self
            .groups
            .create_group(CreateGroupParams {
                title,
                slug,
                description: command.description.trim().to_string(),
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { constraint } => GroupError::SlugTaken(constraint),
                other => GroupError::Repo(other),
            })?;

        info!(
            target = "postboard::groups",
            group_id = group.id,
            slug = %group.slug,
            "group created"
        );
        Ok(group)
    }

    async fn unique_slug(&self, title: &str) -> Result<String, GroupError> {
        let groups = self.groups.clone();
        generate_unique_slug_async(title, move |candidate| {
            let groups = groups.clone();
            let candidate = candidate.to_string();
            async move {
                groups
                    .find_group_by_slug(&candidate)
                    .await
                    .map(|existing| existing.is_none())
            }
        })
        .await
        .map_err(|err| match err {
            SlugAsyncError::Slug(slug) => GroupError::Slug(slug),
            SlugAsyncError::Predicate(repo) => GroupError::Repo(repo),
        })
    }
}
