//! Comment submission.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::forms::{self, FormErrors};
use crate::application::repos::{CommentsRepo, CreateCommentParams, PostsRepo, RepoError};
use crate::domain::entities::{CommentRecord, UserRecord};

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("post {0} does not exist")]
    UnknownPost(i64),
    #[error("comment form is invalid: {0}")]
    Invalid(FormErrors),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct CommentService {
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
}

impl CommentService {
    pub fn new(posts: Arc<dyn PostsRepo>, comments: Arc<dyn CommentsRepo>) -> Self {
        Self { posts, comments }
    }

    pub async fn add_comment(
        &self,
        author: &UserRecord,
        post_id: i64,
        text: &str,
    ) -> Result<CommentRecord, CommentError> {
        let post = self
            .posts
            .find_post_by_id(post_id)
            .await?
            .ok_or(CommentError::UnknownPost(post_id))?;

        let mut errors = FormErrors::new();
        let text = forms::required_text(&mut errors, "text", text);
        errors.into_result().map_err(CommentError::Invalid)?;

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id: post.id,
                author_id: author.id,
                text,
            })
            .await?;

        info!(
            target = "postboard::comments",
            post_id = post.id,
            comment_id = comment.id,
            author = %author.username,
            "comment added"
        );
        Ok(comment)
    }
}
