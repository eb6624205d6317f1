use crate::application::accounts::Viewer;
use crate::application::error::{ErrorReport, HttpError};
use crate::application::feed::{GroupFeed, PostDetail, ProfileFeed};
use crate::application::forms::FormErrors;
use crate::application::pagination::Page;
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description};

const SITE_TITLE: &str = "Postboard";

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let view = LayoutContext::new(chrome, "Page not found", ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct ViewerView {
    pub username: String,
    pub profile_href: String,
}

/// Site-wide frame: brand and the viewer-dependent navigation.
#[derive(Clone)]
pub struct LayoutChrome {
    pub brand: String,
    pub viewer: Option<ViewerView>,
    pub year: i32,
}

impl LayoutChrome {
    pub fn for_viewer(viewer: &Viewer) -> Self {
        Self {
            brand: SITE_TITLE.to_string(),
            viewer: viewer.user().map(|user| ViewerView {
                username: user.username.clone(),
                profile_href: profile_href(&user.username),
            }),
            year: OffsetDateTime::now_utc().year(),
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub brand: String,
    pub viewer: Option<ViewerView>,
    pub year: i32,
    pub title: String,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, title: impl Into<String>, content: T) -> Self {
        let title = title.into();
        let title = if title.is_empty() {
            chrome.brand.clone()
        } else {
            format!("{title} | {}", chrome.brand)
        };
        Self {
            brand: chrome.brand,
            viewer: chrome.viewer,
            year: chrome.year,
            title,
            content,
        }
    }
}

pub fn profile_href(username: &str) -> String {
    format!("/profile/{username}/")
}

pub fn post_href(id: i64) -> String {
    format!("/posts/{id}/")
}

pub fn group_href(slug: &str) -> String {
    format!("/group/{slug}/")
}

pub fn media_href(stored_path: &str) -> String {
    format!("/media/{stored_path}")
}

fn format_published(at: OffsetDateTime) -> String {
    at.format(format_description!(
        "[day] [month repr:short] [year], [hour]:[minute]"
    ))
    .unwrap_or_default()
}

fn format_iso(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_default()
}

#[derive(Clone)]
pub struct GroupBadge {
    pub title: String,
    pub href: String,
}

#[derive(Clone)]
pub struct PostCard {
    pub id: i64,
    pub href: String,
    pub headline: String,
    pub text: String,
    pub author_username: String,
    pub author_href: String,
    pub group: Option<GroupBadge>,
    pub image_url: Option<String>,
    pub published: String,
    pub iso_date: String,
}

impl From<&PostRecord> for PostCard {
    fn from(post: &PostRecord) -> Self {
        Self {
            id: post.id,
            href: post_href(post.id),
            headline: post.headline(),
            text: post.text.clone(),
            author_username: post.author_username.clone(),
            author_href: profile_href(&post.author_username),
            group: post.group.as_ref().map(|group| GroupBadge {
                title: group.title.clone(),
                href: group_href(&group.slug),
            }),
            image_url: post.image.as_deref().map(media_href),
            published: format_published(post.created_at),
            iso_date: format_iso(post.created_at),
        }
    }
}

/// Previous/next controls for a paginated listing.
#[derive(Clone)]
pub struct PaginationView {
    pub number: u64,
    pub num_pages: u64,
    pub first_href: Option<String>,
    pub previous_href: Option<String>,
    pub next_href: Option<String>,
    pub last_href: Option<String>,
    pub is_paginated: bool,
}

impl PaginationView {
    pub fn new<T>(page: &Page<T>, base_path: &str) -> Self {
        let href = |number: u64| format!("{base_path}?page={number}");
        Self {
            number: page.number,
            num_pages: page.num_pages,
            first_href: page.has_previous().then(|| href(1)),
            previous_href: page.previous_number().map(href),
            next_href: page.next_number().map(href),
            last_href: page.has_next().then(|| href(page.num_pages)),
            is_paginated: page.num_pages > 1,
        }
    }
}

fn cards(page: &Page<PostRecord>) -> Vec<PostCard> {
    page.items.iter().map(PostCard::from).collect()
}

pub struct FeedContext {
    pub heading: String,
    pub description: Option<String>,
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
    pub empty_message: String,
}

impl FeedContext {
    pub fn index(page: &Page<PostRecord>) -> Self {
        Self {
            heading: "Latest posts".to_string(),
            description: None,
            posts: cards(page),
            pagination: PaginationView::new(page, "/"),
            empty_message: "Nobody has posted anything yet.".to_string(),
        }
    }

    pub fn followed(page: &Page<PostRecord>) -> Self {
        Self {
            heading: "Posts from authors you follow".to_string(),
            description: None,
            posts: cards(page),
            pagination: PaginationView::new(page, "/follow/"),
            empty_message: "Follow some authors to see their posts here.".to_string(),
        }
    }

    pub fn group(feed: &GroupFeed) -> Self {
        let description = feed.group.description.trim();
        Self {
            heading: feed.group.title.clone(),
            description: (!description.is_empty()).then(|| description.to_string()),
            posts: cards(&feed.page),
            pagination: PaginationView::new(&feed.page, &group_href(&feed.group.slug)),
            empty_message: "This group has no posts yet.".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<FeedContext>,
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowIndexTemplate {
    pub view: LayoutContext<FeedContext>,
}

#[derive(Template)]
#[template(path = "group_list.html")]
pub struct GroupTemplate {
    pub view: LayoutContext<FeedContext>,
}

#[derive(Clone)]
pub struct FollowAction {
    pub href: String,
    pub label: String,
    pub is_following: bool,
}

pub struct ProfileContext {
    pub username: String,
    pub display_name: String,
    pub post_count: u64,
    pub followers: u64,
    pub following: u64,
    pub follow_action: Option<FollowAction>,
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
}

impl ProfileContext {
    pub fn new(feed: &ProfileFeed, viewer_signed_in: bool) -> Self {
        let username = feed.author.username.clone();
        let base = profile_href(&username);
        let follow_action = (viewer_signed_in && !feed.is_own_profile).then(|| {
            if feed.viewer_follows {
                FollowAction {
                    href: format!("{base}unfollow/"),
                    label: "Unfollow".to_string(),
                    is_following: true,
                }
            } else {
                FollowAction {
                    href: format!("{base}follow/"),
                    label: "Follow".to_string(),
                    is_following: false,
                }
            }
        });

        Self {
            display_name: feed.author.display_name(),
            post_count: feed.page.total,
            followers: feed.followers,
            following: feed.following,
            follow_action,
            posts: cards(&feed.page),
            pagination: PaginationView::new(&feed.page, &base),
            username,
        }
    }
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileContext>,
}

#[derive(Clone)]
pub struct CommentView {
    pub author_username: String,
    pub author_href: String,
    pub text: String,
    pub published: String,
    pub iso_date: String,
}

impl From<&CommentRecord> for CommentView {
    fn from(comment: &CommentRecord) -> Self {
        Self {
            author_username: comment.author_username.clone(),
            author_href: profile_href(&comment.author_username),
            text: comment.text.clone(),
            published: format_published(comment.created_at),
            iso_date: format_iso(comment.created_at),
        }
    }
}

pub struct PostDetailContext {
    pub post: PostCard,
    pub author_post_count: u64,
    pub comments: Vec<CommentView>,
    pub can_edit: bool,
    pub edit_href: String,
    pub comment_action: String,
    pub can_comment: bool,
    pub login_href: String,
}

impl PostDetailContext {
    pub fn new(detail: &PostDetail, viewer: &Viewer) -> Self {
        let post = &detail.post;
        Self {
            post: PostCard::from(post),
            author_post_count: detail.author_post_count,
            comments: detail.comments.iter().map(CommentView::from).collect(),
            can_edit: viewer.user_id().is_some_and(|id| post.is_authored_by(id)),
            edit_href: format!("/posts/{}/edit/", post.id),
            comment_action: format!("/posts/{}/comment/", post.id),
            can_comment: viewer.user().is_some(),
            login_href: format!("/auth/login/?next={}", post_href(post.id)),
        }
    }
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailContext>,
}

#[derive(Clone)]
pub struct GroupOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

pub struct PostFormContext {
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub groups: Vec<GroupOption>,
    pub no_group_selected: bool,
    pub current_image: Option<String>,
    pub general_errors: Vec<String>,
    pub text_errors: Vec<String>,
    pub group_errors: Vec<String>,
    pub image_errors: Vec<String>,
}

impl PostFormContext {
    /// Empty form for `/create/`.
    pub fn create(groups: &[GroupRecord]) -> Self {
        Self::build(false, "/create/".to_string(), "", None, groups, None, &FormErrors::new())
    }

    /// Form pre-filled from a stored post.
    pub fn edit(post: &PostRecord, groups: &[GroupRecord]) -> Self {
        let selected = post.group.as_ref().map(|group| group.id.to_string());
        Self::build(
            true,
            format!("/posts/{}/edit/", post.id),
            &post.text,
            selected.as_deref(),
            groups,
            post.image.as_deref(),
            &FormErrors::new(),
        )
    }

    /// Form re-displayed with the submitted values and their errors.
    pub fn rejected(
        editing: Option<&PostRecord>,
        text: &str,
        group: Option<&str>,
        groups: &[GroupRecord],
        errors: &FormErrors,
    ) -> Self {
        match editing {
            Some(post) => Self::build(
                true,
                format!("/posts/{}/edit/", post.id),
                text,
                group,
                groups,
                post.image.as_deref(),
                errors,
            ),
            None => Self::build(false, "/create/".to_string(), text, group, groups, None, errors),
        }
    }

    fn build(
        is_edit: bool,
        action: String,
        text: &str,
        selected_group: Option<&str>,
        groups: &[GroupRecord],
        current_image: Option<&str>,
        errors: &FormErrors,
    ) -> Self {
        let selected_group = selected_group.map(str::trim).filter(|value| !value.is_empty());
        let groups: Vec<GroupOption> = groups
            .iter()
            .map(|group| {
                let value = group.id.to_string();
                GroupOption {
                    selected: selected_group == Some(value.as_str()),
                    label: group.to_string(),
                    value,
                }
            })
            .collect();

        Self {
            is_edit,
            action,
            text: text.to_string(),
            no_group_selected: !groups.iter().any(|option| option.selected),
            groups,
            current_image: current_image.map(media_href),
            general_errors: errors.general().to_vec(),
            text_errors: errors.field("text").to_vec(),
            group_errors: errors.field("group").to_vec(),
            image_errors: errors.field("image").to_vec(),
        }
    }
}

#[derive(Template)]
#[template(path = "create_post.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormContext>,
}

#[derive(Default)]
pub struct SignupContext {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub general_errors: Vec<String>,
    pub username_errors: Vec<String>,
    pub email_errors: Vec<String>,
    pub password1_errors: Vec<String>,
    pub password2_errors: Vec<String>,
}

impl SignupContext {
    pub fn rejected(
        first_name: &str,
        last_name: &str,
        username: &str,
        email: &str,
        errors: &FormErrors,
    ) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            username: username.to_string(),
            email: email.to_string(),
            general_errors: errors.general().to_vec(),
            username_errors: errors.field("username").to_vec(),
            email_errors: errors.field("email").to_vec(),
            password1_errors: errors.field("password1").to_vec(),
            password2_errors: errors.field("password2").to_vec(),
        }
    }
}

#[derive(Template)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub view: LayoutContext<SignupContext>,
}

#[derive(Default)]
pub struct LoginContext {
    pub username: String,
    pub next: String,
    pub general_errors: Vec<String>,
    pub username_errors: Vec<String>,
    pub password_errors: Vec<String>,
}

impl LoginContext {
    pub fn new(next: Option<&str>) -> Self {
        Self {
            next: next.unwrap_or_default().to_string(),
            ..Self::default()
        }
    }

    pub fn rejected(username: &str, next: Option<&str>, errors: &FormErrors) -> Self {
        Self {
            username: username.to_string(),
            next: next.unwrap_or_default().to_string(),
            general_errors: errors.general().to_vec(),
            username_errors: errors.field("username").to_vec(),
            password_errors: errors.field("password").to_vec(),
        }
    }
}

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginContext>,
}

#[derive(Template)]
#[template(path = "auth/logged_out.html")]
pub struct LoggedOutTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Template)]
#[template(path = "about/author.html")]
pub struct AboutAuthorTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Template)]
#[template(path = "about/tech.html")]
pub struct AboutTechTemplate {
    pub view: LayoutContext<()>,
}

pub struct ErrorPageView {
    pub heading: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            heading: "Page not found".to_string(),
            message: "The page you requested does not exist.".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
