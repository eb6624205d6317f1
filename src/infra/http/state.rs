use std::{sync::Arc, time::Duration};

use crate::{
    application::{
        accounts::AccountService,
        comments::CommentService,
        feed::FeedService,
        follows::FollowService,
        media::MediaStore,
        pagination::Paginator,
        posts::PostService,
        repos::{
            CommentsRepo, FollowsRepo, GroupsRepo, HealthRepo, PostsRepo, PostsWriteRepo,
            SessionsRepo, UsersRepo,
        },
    },
    cache::FeedCache,
    config::{FeedSettings, SessionSettings},
    infra::uploads::UploadStorage,
};

/// Every persistence port the services need, usually backed by one adapter.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UsersRepo>,
    pub sessions: Arc<dyn SessionsRepo>,
    pub groups: Arc<dyn GroupsRepo>,
    pub posts: Arc<dyn PostsRepo>,
    pub posts_write: Arc<dyn PostsWriteRepo>,
    pub comments: Arc<dyn CommentsRepo>,
    pub follows: Arc<dyn FollowsRepo>,
    pub health: Arc<dyn HealthRepo>,
}

impl Repositories {
    pub fn from_shared<R>(repo: Arc<R>) -> Self
    where
        R: UsersRepo
            + SessionsRepo
            + GroupsRepo
            + PostsRepo
            + PostsWriteRepo
            + CommentsRepo
            + FollowsRepo
            + HealthRepo
            + 'static,
    {
        Self {
            users: repo.clone(),
            sessions: repo.clone(),
            groups: repo.clone(),
            posts: repo.clone(),
            posts_write: repo.clone(),
            comments: repo.clone(),
            follows: repo.clone(),
            health: repo,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionCookie {
    pub name: String,
    pub secure: bool,
    pub ttl: Duration,
}

impl From<&SessionSettings> for SessionCookie {
    fn from(settings: &SessionSettings) -> Self {
        Self {
            name: settings.cookie_name.clone(),
            secure: settings.secure_cookie,
            ttl: settings.ttl,
        }
    }
}

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub follows: Arc<FollowService>,
    pub accounts: Arc<AccountService>,
    pub upload_storage: Arc<UploadStorage>,
    pub session_cookie: SessionCookie,
    pub upload_limit: usize,
    pub cache: Option<FeedCache>,
}

impl HttpState {
    pub fn new(
        repos: &Repositories,
        upload_storage: Arc<UploadStorage>,
        feed: &FeedSettings,
        sessions: &SessionSettings,
        upload_limit: usize,
    ) -> Self {
        let paginator = Paginator::new(feed.page_size);
        let media: Arc<dyn MediaStore> = upload_storage.clone();
        let session_ttl = time::Duration::seconds(
            i64::try_from(sessions.ttl.as_secs()).unwrap_or(i64::MAX),
        );

        Self {
            feed: Arc::new(FeedService::new(
                repos.posts.clone(),
                repos.groups.clone(),
                repos.users.clone(),
                repos.comments.clone(),
                repos.follows.clone(),
                paginator,
            )),
            posts: Arc::new(PostService::new(
                repos.posts.clone(),
                repos.posts_write.clone(),
                repos.groups.clone(),
                media,
            )),
            comments: Arc::new(CommentService::new(
                repos.posts.clone(),
                repos.comments.clone(),
            )),
            follows: Arc::new(FollowService::new(
                repos.users.clone(),
                repos.follows.clone(),
            )),
            accounts: Arc::new(AccountService::new(
                repos.users.clone(),
                repos.sessions.clone(),
                session_ttl,
            )),
            upload_storage,
            session_cookie: SessionCookie::from(sessions),
            upload_limit,
            cache: feed.cache_enabled.then(|| FeedCache::new(feed.cache_ttl)),
        }
    }
}

#[derive(Clone)]
pub struct AdminState {
    pub health: Arc<dyn HealthRepo>,
    pub cache: Option<FeedCache>,
}

impl AdminState {
    /// Admin surface sharing the public site's cache instance.
    pub fn new(repos: &Repositories, http: &HttpState) -> Self {
        Self {
            health: repos.health.clone(),
            cache: http.cache.clone(),
        }
    }
}
