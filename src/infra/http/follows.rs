use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    application::{
        accounts::Viewer,
        follows::{FollowError, FollowOutcome},
    },
    domain::entities::UserRecord,
    presentation::views::{
        FeedContext, FollowIndexTemplate, LayoutChrome, LayoutContext, profile_href,
        render_not_found_response, render_template_response,
    },
};

use super::{
    HttpState, forms::PageQuery, public::feed_error_to_response, repo_error_to_http,
    session::RequireUser,
};

/// Posts by the authors the signed-in user follows.
pub(super) async fn follow_index(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = LayoutChrome::for_viewer(&Viewer::authenticated(user.clone()));
    match state.feed.followed(&user, query.page.as_deref()).await {
        Ok(page) => {
            let view = LayoutContext::new(chrome, "Following", FeedContext::followed(&page));
            render_template_response(FollowIndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

pub(super) async fn follow_author(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(username): Path<String>,
) -> Response {
    let result = state.follows.follow(&user, &username).await;
    follow_response(result, &user, &username)
}

pub(super) async fn unfollow_author(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(username): Path<String>,
) -> Response {
    let result = state.follows.unfollow(&user, &username).await;
    follow_response(result, &user, &username)
}

fn follow_response(
    result: Result<FollowOutcome, FollowError>,
    user: &UserRecord,
    username: &str,
) -> Response {
    match result {
        Ok(_) => Redirect::to(&profile_href(username)).into_response(),
        Err(FollowError::UnknownAuthor(_)) => render_not_found_response(
            LayoutChrome::for_viewer(&Viewer::authenticated(user.clone())),
        ),
        Err(FollowError::Repo(err)) => {
            repo_error_to_http("infra::http::follows", err).into_response()
        }
    }
}
