//! In-memory persistence and request helpers shared by the HTTP tests.

#![allow(dead_code)]

use std::{
    num::NonZeroU32,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, header},
};
use tempfile::TempDir;
use time::OffsetDateTime;
use tower::ServiceExt;

use postboard::{
    application::repos::{
        CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams, CreateUserParams,
        FollowsRepo, GroupsRepo, HealthRepo, PostListScope, PostsRepo, PostsWriteRepo, RepoError,
        SessionsRepo, UpdatePostParams, UsersRepo,
    },
    config::{FeedSettings, SessionSettings},
    domain::entities::{
        CommentRecord, GroupRecord, GroupRef, PostRecord, SessionRecord, UserRecord,
    },
    infra::{
        http::{AdminState, HttpState, Repositories, build_admin_router, build_router},
        uploads::UploadStorage,
    },
};

pub const COOKIE_NAME: &str = "postboard_session";
pub const PAGE_SIZE: u32 = 10;

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: Vec<UserRecord>,
    sessions: Vec<SessionRecord>,
    groups: Vec<GroupRecord>,
    posts: Vec<PostRecord>,
    comments: Vec<CommentRecord>,
    follows: Vec<(i64, i64)>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn group_ref(&self, group_id: Option<i64>) -> Result<Option<GroupRef>, RepoError> {
        group_id
            .map(|id| {
                self.groups
                    .iter()
                    .find(|group| group.id == id)
                    .map(|group| GroupRef {
                        id: group.id,
                        slug: group.slug.clone(),
                        title: group.title.clone(),
                    })
                    .ok_or_else(|| RepoError::Integrity {
                        message: format!("group {id} does not exist"),
                    })
            })
            .transpose()
    }

    fn scoped(&self, scope: PostListScope) -> Vec<PostRecord> {
        let mut posts: Vec<PostRecord> = self
            .posts
            .iter()
            .filter(|post| match scope {
                PostListScope::All => true,
                PostListScope::Group(id) => post.group.as_ref().is_some_and(|g| g.id == id),
                PostListScope::Author(id) => post.author_id == id,
                PostListScope::FollowedBy(user_id) => self
                    .follows
                    .iter()
                    .any(|(follower, author)| *follower == user_id && *author == post.author_id),
            })
            .cloned()
            .collect();
        posts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        posts
    }
}

/// Every repository port backed by vectors behind one lock.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("tables lock")
    }

    pub fn add_user(&self, username: &str) -> UserRecord {
        self.add_user_with_hash(username, "unused-hash")
    }

    pub fn add_user_with_hash(&self, username: &str, password_hash: &str) -> UserRecord {
        let mut tables = self.tables();
        let user = UserRecord {
            id: tables.next_id(),
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            password_hash: password_hash.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        tables.users.push(user.clone());
        user
    }

    pub fn add_group(&self, title: &str, slug: &str) -> GroupRecord {
        let mut tables = self.tables();
        let group = GroupRecord {
            id: tables.next_id(),
            title: title.to_string(),
            slug: slug.to_string(),
            description: String::new(),
            created_at: OffsetDateTime::now_utc(),
        };
        tables.groups.push(group.clone());
        group
    }

    /// Insert a post whose timestamp is `offset_secs` after the epoch.
    pub fn add_post(
        &self,
        author: &UserRecord,
        group: Option<&GroupRecord>,
        text: &str,
        offset_secs: i64,
    ) -> PostRecord {
        let mut tables = self.tables();
        let post = PostRecord {
            id: tables.next_id(),
            author_id: author.id,
            author_username: author.username.clone(),
            group: group.map(|group| GroupRef {
                id: group.id,
                slug: group.slug.clone(),
                title: group.title.clone(),
            }),
            text: text.to_string(),
            image: None,
            created_at: OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(offset_secs),
        };
        tables.posts.push(post.clone());
        post
    }

    pub fn post(&self, id: i64) -> Option<PostRecord> {
        self.tables().posts.iter().find(|post| post.id == id).cloned()
    }

    pub fn posts_by(&self, author_id: i64) -> Vec<PostRecord> {
        self.tables().scoped(PostListScope::Author(author_id))
    }

    pub fn comments_on(&self, post_id: i64) -> Vec<CommentRecord> {
        self.tables()
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect()
    }

    pub fn follow_count(&self) -> usize {
        self.tables().follows.len()
    }

    pub fn session_count(&self) -> usize {
        self.tables().sessions.len()
    }

    /// Seed a session for `user` that lapsed an hour ago.
    pub fn add_expired_session(&self, user: &UserRecord) {
        let now = OffsetDateTime::now_utc();
        self.tables().sessions.push(SessionRecord {
            token_hash: vec![0xab; 32],
            user_id: user.id,
            created_at: now - time::Duration::days(15),
            expires_at: now - time::Duration::hours(1),
        });
    }

    pub fn user(&self, username: &str) -> Option<UserRecord> {
        self.tables()
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned()
    }
}

#[async_trait]
impl UsersRepo for MemoryStore {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.tables().users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.user(username))
    }

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut tables = self.tables();
        if tables.users.iter().any(|user| user.username == params.username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        let user = UserRecord {
            id: tables.next_id(),
            username: params.username,
            first_name: params.first_name,
            last_name: params.last_name,
            email: params.email,
            password_hash: params.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl SessionsRepo for MemoryStore {
    async fn create_session(&self, session: SessionRecord) -> Result<(), RepoError> {
        self.tables().sessions.push(session);
        Ok(())
    }

    async fn find_session_user(
        &self,
        token_hash: &[u8],
        now: OffsetDateTime,
    ) -> Result<Option<UserRecord>, RepoError> {
        let tables = self.tables();
        let user_id = tables
            .sessions
            .iter()
            .find(|session| session.token_hash == token_hash && session.expires_at > now)
            .map(|session| session.user_id);
        Ok(user_id.and_then(|id| tables.users.iter().find(|user| user.id == id).cloned()))
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<(), RepoError> {
        self.tables()
            .sessions
            .retain(|session| session.token_hash != token_hash);
        Ok(())
    }

    async fn purge_expired_sessions(&self, now: OffsetDateTime) -> Result<u64, RepoError> {
        let mut tables = self.tables();
        let before = tables.sessions.len();
        tables.sessions.retain(|session| session.expires_at > now);
        Ok((before - tables.sessions.len()) as u64)
    }
}

#[async_trait]
impl GroupsRepo for MemoryStore {
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let mut groups = self.tables().groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }

    async fn find_group_by_id(&self, id: i64) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self.tables().groups.iter().find(|group| group.id == id).cloned())
    }

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self
            .tables()
            .groups
            .iter()
            .find(|group| group.slug == slug)
            .cloned())
    }

    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let mut tables = self.tables();
        if tables.groups.iter().any(|group| group.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "groups_slug_key".to_string(),
            });
        }
        let group = GroupRecord {
            id: tables.next_id(),
            title: params.title,
            slug: params.slug,
            description: params.description,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.groups.push(group.clone());
        Ok(group)
    }
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn count_posts(&self, scope: PostListScope) -> Result<u64, RepoError> {
        Ok(self.tables().scoped(scope).len() as u64)
    }

    async fn list_posts(
        &self,
        scope: PostListScope,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostRecord>, RepoError> {
        Ok(self
            .tables()
            .scoped(scope)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn find_post_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        Ok(self.post(id))
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryStore {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut tables = self.tables();
        let author_username = tables
            .users
            .iter()
            .find(|user| user.id == params.author_id)
            .map(|user| user.username.clone())
            .ok_or(RepoError::NotFound)?;
        let group = tables.group_ref(params.group_id)?;
        let post = PostRecord {
            id: tables.next_id(),
            author_id: params.author_id,
            author_username,
            group,
            text: params.text,
            image: params.image,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut tables = self.tables();
        let group = tables.group_ref(params.group_id)?;
        let post = tables
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.group = group;
        post.text = params.text;
        post.image = params.image;
        Ok(post.clone())
    }
}

#[async_trait]
impl CommentsRepo for MemoryStore {
    async fn list_comments_for_post(
        &self,
        post_id: i64,
    ) -> Result<Vec<CommentRecord>, RepoError> {
        Ok(self.comments_on(post_id))
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut tables = self.tables();
        let author_username = tables
            .users
            .iter()
            .find(|user| user.id == params.author_id)
            .map(|user| user.username.clone())
            .ok_or(RepoError::NotFound)?;
        let comment = CommentRecord {
            id: tables.next_id(),
            post_id: params.post_id,
            author_id: params.author_id,
            author_username,
            text: params.text,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.comments.push(comment.clone());
        Ok(comment)
    }
}

#[async_trait]
impl FollowsRepo for MemoryStore {
    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        Ok(self.tables().follows.contains(&(user_id, author_id)))
    }

    async fn follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let mut tables = self.tables();
        if tables.follows.contains(&(user_id, author_id)) {
            return Ok(false);
        }
        tables.follows.push((user_id, author_id));
        Ok(true)
    }

    async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let mut tables = self.tables();
        let before = tables.follows.len();
        tables.follows.retain(|pair| *pair != (user_id, author_id));
        Ok(tables.follows.len() != before)
    }

    async fn count_followers(&self, author_id: i64) -> Result<u64, RepoError> {
        Ok(self
            .tables()
            .follows
            .iter()
            .filter(|(_, author)| *author == author_id)
            .count() as u64)
    }

    async fn count_following(&self, user_id: i64) -> Result<u64, RepoError> {
        Ok(self
            .tables()
            .follows
            .iter()
            .filter(|(follower, _)| *follower == user_id)
            .count() as u64)
    }
}

#[async_trait]
impl HealthRepo for MemoryStore {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

/// A wired application over a fresh [`MemoryStore`] and a temporary media root.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub state: HttpState,
    pub router: Router,
    pub admin: Router,
    pub media_root: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_cache(false)
    }

    pub fn with_cache(cache_enabled: bool) -> Self {
        let store = Arc::new(MemoryStore::default());
        let repos = Repositories::from_shared(store.clone());
        let media_root = TempDir::new().expect("temp media root");
        let storage =
            Arc::new(UploadStorage::new(media_root.path().to_path_buf()).expect("upload storage"));

        let feed = FeedSettings {
            page_size: NonZeroU32::new(PAGE_SIZE).expect("non-zero page size"),
            cache_enabled,
            cache_ttl: Duration::from_secs(20),
        };
        let sessions = SessionSettings {
            cookie_name: COOKIE_NAME.to_string(),
            ttl: Duration::from_secs(3600),
            secure_cookie: false,
        };
        let upload_limit = 1024 * 1024;

        let state = HttpState::new(&repos, storage, &feed, &sessions, upload_limit);
        let admin_state = AdminState::new(&repos, &state);

        Self {
            router: build_router(state.clone()),
            admin: build_admin_router(admin_state),
            state,
            store,
            media_root,
        }
    }

    /// Session cookie header value for `user`.
    pub async fn login_cookie(&self, user: &UserRecord) -> String {
        let session = self
            .state
            .accounts
            .start_session(user)
            .await
            .expect("session");
        format!("{COOKIE_NAME}={}", session.token)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn send_admin(&self, request: Request<Body>) -> Response<Body> {
        self.admin
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(get(uri, cookie)).await
    }

    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(post_form(uri, body, cookie)).await
    }
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("request")
}

pub fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("location header")
}

/// `name=value` of the session cookie a response sets, if any.
pub fn set_session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .find(|pair| pair.starts_with(&format!("{COOKIE_NAME}=")))
        .map(str::to_string)
}

pub fn count_posts(html: &str) -> usize {
    html.matches("<article class=\"post\">").count()
}
