//! Read-side listings: home feed, group and profile pages, subscriptions, detail.

use std::sync::Arc;

use thiserror::Error;

use crate::application::pagination::{Page, Paginator};
use crate::application::repos::{
    CommentsRepo, FollowsRepo, GroupsRepo, PostListScope, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("group `{0}` does not exist")]
    UnknownGroup(String),
    #[error("user `{0}` does not exist")]
    UnknownAuthor(String),
    #[error("post {0} does not exist")]
    UnknownPost(i64),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct GroupFeed {
    pub group: GroupRecord,
    pub page: Page<PostRecord>,
}

#[derive(Debug, Clone)]
pub struct ProfileFeed {
    pub author: UserRecord,
    pub page: Page<PostRecord>,
    pub followers: u64,
    pub following: u64,
    /// Whether the viewer currently follows this author.
    pub viewer_follows: bool,
    /// Whether the viewer is looking at their own profile.
    pub is_own_profile: bool,
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostRecord,
    pub comments: Vec<CommentRecord>,
    pub author_post_count: u64,
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    comments: Arc<dyn CommentsRepo>,
    follows: Arc<dyn FollowsRepo>,
    paginator: Paginator,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        comments: Arc<dyn CommentsRepo>,
        follows: Arc<dyn FollowsRepo>,
        paginator: Paginator,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            comments,
            follows,
            paginator,
        }
    }

    pub async fn index(&self, requested: Option<&str>) -> Result<Page<PostRecord>, FeedError> {
        Ok(self.page(PostListScope::All, requested).await?)
    }

    pub async fn group(&self, slug: &str, requested: Option<&str>) -> Result<GroupFeed, FeedError> {
        let group = self
            .groups
            .find_group_by_slug(slug)
            .await?
            .ok_or_else(|| FeedError::UnknownGroup(slug.to_string()))?;
        let page = self.page(PostListScope::Group(group.id), requested).await?;
        Ok(GroupFeed { group, page })
    }

    pub async fn profile(
        &self,
        username: &str,
        requested: Option<&str>,
        viewer: Option<&UserRecord>,
    ) -> Result<ProfileFeed, FeedError> {
        let author = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| FeedError::UnknownAuthor(username.to_string()))?;

        let page = self.page(PostListScope::Author(author.id), requested).await?;
        let followers = self.follows.count_followers(author.id).await?;
        let following = self.follows.count_following(author.id).await?;

        let is_own_profile = viewer.is_some_and(|viewer| viewer.id == author.id);
        let viewer_follows = match viewer {
            Some(viewer) if !is_own_profile => {
                self.follows.is_following(viewer.id, author.id).await?
            }
            _ => false,
        };

        Ok(ProfileFeed {
            author,
            page,
            followers,
            following,
            viewer_follows,
            is_own_profile,
        })
    }

    /// Posts written by the authors `viewer` follows.
    pub async fn followed(
        &self,
        viewer: &UserRecord,
        requested: Option<&str>,
    ) -> Result<Page<PostRecord>, FeedError> {
        Ok(self
            .page(PostListScope::FollowedBy(viewer.id), requested)
            .await?)
    }

    pub async fn post_detail(&self, id: i64) -> Result<PostDetail, FeedError> {
        let post = self
            .posts
            .find_post_by_id(id)
            .await?
            .ok_or(FeedError::UnknownPost(id))?;
        let comments = self.comments.list_comments_for_post(post.id).await?;
        let author_post_count = self
            .posts
            .count_posts(PostListScope::Author(post.author_id))
            .await?;

        Ok(PostDetail {
            post,
            comments,
            author_post_count,
        })
    }

    async fn page(
        &self,
        scope: PostListScope,
        requested: Option<&str>,
    ) -> Result<Page<PostRecord>, RepoError> {
        let total = self.posts.count_posts(scope).await?;
        let window = self.paginator.window(total, requested);
        let items = if total == 0 {
            Vec::new()
        } else {
            self.posts
                .list_posts(scope, window.offset, window.limit)
                .await?
        };
        Ok(Page::from_window(items, window))
    }
}
