use axum::{
    extract::{Form, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::error;

use crate::{
    application::{
        accounts::Viewer,
        comments::CommentError,
        error::HttpError,
        forms::FormErrors,
        posts::{EditAccess, PostError, PostSubmission},
    },
    domain::entities::{GroupRecord, PostRecord, UserRecord},
    presentation::views::{
        LayoutChrome, LayoutContext, PostFormContext, PostFormTemplate, post_href, profile_href,
        render_not_found_response, render_template_response,
    },
};

use super::{
    HttpState,
    forms::{CommentForm, PostForm},
    public::parse_id,
    repo_error_to_http,
    session::RequireUser,
};

pub(super) async fn create_form(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
) -> Response {
    match state.posts.group_choices().await {
        Ok(groups) => render_form(&user, "New post", PostFormContext::create(&groups)),
        Err(err) => post_error_to_response(err, &user),
    }
}

pub(super) async fn create_submit(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    PostForm(submission): PostForm,
) -> Response {
    match state.posts.create_post(&user, &submission).await {
        Ok(_) => Redirect::to(&profile_href(&user.username)).into_response(),
        Err(PostError::Invalid(errors)) => match state.posts.group_choices().await {
            Ok(groups) => render_rejected(&user, None, &submission, &groups, &errors),
            Err(err) => post_error_to_response(err, &user),
        },
        Err(err) => post_error_to_response(err, &user),
    }
}

pub(super) async fn edit_form(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(raw_id): Path<String>,
) -> Response {
    let Some(id) = parse_id(&raw_id) else {
        return not_found(&user);
    };

    let access = match state.posts.edit_access(&user, id).await {
        Ok(access) => access,
        Err(err) => return post_error_to_response(err, &user),
    };

    match access {
        EditAccess::Allowed(post) => match state.posts.group_choices().await {
            Ok(groups) => render_form(&user, "Edit post", PostFormContext::edit(&post, &groups)),
            Err(err) => post_error_to_response(err, &user),
        },
        EditAccess::Denied(post) => Redirect::to(&post_href(post.id)).into_response(),
    }
}

pub(super) async fn edit_submit(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(raw_id): Path<String>,
    PostForm(submission): PostForm,
) -> Response {
    let Some(id) = parse_id(&raw_id) else {
        return not_found(&user);
    };

    match state.posts.edit_post(&user, id, &submission).await {
        Ok(EditAccess::Allowed(post) | EditAccess::Denied(post)) => {
            Redirect::to(&post_href(post.id)).into_response()
        }
        Err(PostError::Invalid(errors)) => {
            let post = match state.posts.edit_access(&user, id).await {
                Ok(EditAccess::Allowed(post) | EditAccess::Denied(post)) => post,
                Err(err) => return post_error_to_response(err, &user),
            };
            match state.posts.group_choices().await {
                Ok(groups) => render_rejected(&user, Some(&post), &submission, &groups, &errors),
                Err(err) => post_error_to_response(err, &user),
            }
        }
        Err(err) => post_error_to_response(err, &user),
    }
}

pub(super) async fn add_comment(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(raw_id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Response {
    let Some(id) = parse_id(&raw_id) else {
        return not_found(&user);
    };

    match state.comments.add_comment(&user, id, &form.text).await {
        // An empty comment is dropped and the reader lands back on the post.
        Ok(_) | Err(CommentError::Invalid(_)) => Redirect::to(&post_href(id)).into_response(),
        Err(CommentError::UnknownPost(_)) => not_found(&user),
        Err(CommentError::Repo(err)) => {
            repo_error_to_http("infra::http::posts::add_comment", err).into_response()
        }
    }
}

fn render_form(user: &UserRecord, title: &str, content: PostFormContext) -> Response {
    let view = LayoutContext::new(chrome_for(user), title, content);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}

fn render_rejected(
    user: &UserRecord,
    editing: Option<&PostRecord>,
    submission: &PostSubmission,
    groups: &[GroupRecord],
    errors: &FormErrors,
) -> Response {
    let title = if editing.is_some() { "Edit post" } else { "New post" };
    let content = PostFormContext::rejected(
        editing,
        &submission.text,
        submission.group.as_deref(),
        groups,
        errors,
    );
    render_form(user, title, content)
}

fn chrome_for(user: &UserRecord) -> LayoutChrome {
    LayoutChrome::for_viewer(&Viewer::authenticated(user.clone()))
}

fn not_found(user: &UserRecord) -> Response {
    render_not_found_response(chrome_for(user))
}

fn post_error_to_response(err: PostError, user: &UserRecord) -> Response {
    const SOURCE: &str = "infra::http::posts";

    match err {
        PostError::NotFound(_) => not_found(user),
        PostError::Repo(err) => repo_error_to_http(SOURCE, err).into_response(),
        PostError::Media(err) => {
            error!(target = SOURCE, error = %err, "failed to store post image");
            HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to store uploaded image",
                &err,
            )
            .into_response()
        }
        PostError::Invalid(errors) => HttpError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Invalid post",
            errors.to_string(),
        )
        .into_response(),
    }
}
