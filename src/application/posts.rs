//! Post creation and author-only editing.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::info;

use crate::application::forms::{self, FormErrors};
use crate::application::media::{MediaError, MediaStore, looks_like_image};
use crate::application::repos::{
    CreatePostParams, GroupsRepo, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::{GroupRecord, PostRecord, UserRecord};

/// Media directory that post images are stored under.
pub const POST_IMAGE_DIR: &str = "posts";

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub bytes: Bytes,
}

/// Raw post form fields as submitted.
#[derive(Debug, Clone, Default)]
pub struct PostSubmission {
    pub text: String,
    pub group: Option<String>,
    pub image: Option<ImageUpload>,
    pub clear_image: bool,
}

#[derive(Debug, Error)]
pub enum PostError {
    #[error("post form is invalid: {0}")]
    Invalid(FormErrors),
    #[error("post {0} does not exist")]
    NotFound(i64),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Result of asking to edit a post.
#[derive(Debug, Clone)]
pub enum EditAccess {
    Allowed(PostRecord),
    /// The requester is not the author; nothing was changed.
    Denied(PostRecord),
}

struct CleanedPost {
    text: String,
    group_id: Option<i64>,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
    media: Arc<dyn MediaStore>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
        media: Arc<dyn MediaStore>,
    ) -> Self {
        Self {
            posts,
            writer,
            groups,
            media,
        }
    }

    /// Groups offered in the post form's select box.
    pub async fn group_choices(&self) -> Result<Vec<GroupRecord>, PostError> {
        Ok(self.groups.list_groups().await?)
    }

    pub async fn create_post(
        &self,
        author: &UserRecord,
        submission: &PostSubmission,
    ) -> Result<PostRecord, PostError> {
        let cleaned = self.clean(submission).await?;
        let image = self.store_image(submission.image.as_ref()).await?;

        let post = self
            .writer
            .create_post(CreatePostParams {
                author_id: author.id,
                group_id: cleaned.group_id,
                text: cleaned.text,
                image,
            })
            .await?;

        info!(
            target = "postboard::posts",
            post_id = post.id,
            author = %author.username,
            group_id = ?post.group.as_ref().map(|group| group.id),
            "post created"
        );
        Ok(post)
    }

    pub async fn edit_access(&self, editor: &UserRecord, id: i64) -> Result<EditAccess, PostError> {
        let post = self
            .posts
            .find_post_by_id(id)
            .await?
            .ok_or(PostError::NotFound(id))?;

        if post.is_authored_by(editor.id) {
            Ok(EditAccess::Allowed(post))
        } else {
            Ok(EditAccess::Denied(post))
        }
    }

    /// Apply an edit when `editor` wrote the post. Concurrent edits are last-write-wins.
    pub async fn edit_post(
        &self,
        editor: &UserRecord,
        id: i64,
        submission: &PostSubmission,
    ) -> Result<EditAccess, PostError> {
        let current = match self.edit_access(editor, id).await? {
            EditAccess::Allowed(post) => post,
            denied @ EditAccess::Denied(_) => {
                info!(
                    target = "postboard::posts",
                    post_id = id,
                    editor = %editor.username,
                    "edit refused for non-author"
                );
                return Ok(denied);
            }
        };

        let cleaned = self.clean(submission).await?;
        let image = match self.store_image(submission.image.as_ref()).await? {
            Some(stored) => Some(stored),
            None if submission.clear_image => None,
            None => current.image.clone(),
        };

        let post = self
            .writer
            .update_post(UpdatePostParams {
                id: current.id,
                group_id: cleaned.group_id,
                text: cleaned.text,
                image,
            })
            .await?;

        info!(
            target = "postboard::posts",
            post_id = post.id,
            editor = %editor.username,
            "post updated"
        );
        Ok(EditAccess::Allowed(post))
    }

    async fn clean(&self, submission: &PostSubmission) -> Result<CleanedPost, PostError> {
        let mut errors = FormErrors::new();
        let text = forms::required_text(&mut errors, "text", &submission.text);

        let mut group_id = forms::optional_choice(&mut errors, "group", submission.group.as_deref());
        if let Some(id) = group_id
            && self.groups.find_group_by_id(id).await?.is_none()
        {
            errors.add("group", forms::INVALID_CHOICE);
            group_id = None;
        }

        if let Some(upload) = submission.image.as_ref()
            && !looks_like_image(&upload.bytes)
        {
            errors.add("image", forms::INVALID_IMAGE);
        }

        errors.into_result().map_err(PostError::Invalid)?;
        Ok(CleanedPost { text, group_id })
    }

    async fn store_image(&self, upload: Option<&ImageUpload>) -> Result<Option<String>, PostError> {
        let Some(upload) = upload else {
            return Ok(None);
        };
        let stored = self
            .media
            .store_image(POST_IMAGE_DIR, &upload.filename, upload.bytes.clone())
            .await?;
        Ok(Some(stored))
    }
}
