mod admin;
mod auth;
mod follows;
mod forms;
mod middleware;
mod posts;
mod public;
mod session;
mod state;

pub use middleware::{RequestContext, ResolvedViewer};
pub use session::LOGIN_PATH;
pub use state::{AdminState, HttpState, Repositories, SessionCookie};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::application::error::{ErrorReport, HttpError};
use crate::application::repos::RepoError;
use crate::cache::feed_cache_layer;

use self::middleware::{log_responses, resolve_viewer, set_request_context};

/// Public site: feeds, posts, accounts and uploaded media.
pub fn build_router(state: HttpState) -> Router {
    let mut index = get(public::index);
    if let Some(cache) = state.cache.clone() {
        index = index.layer(from_fn_with_state(cache, feed_cache_layer));
    }

    Router::new()
        .route("/", index)
        .route("/group/{slug}/", get(public::group_posts))
        .route("/profile/{username}/", get(public::profile))
        .route(
            "/profile/{username}/follow/",
            get(follows::follow_author).post(follows::follow_author),
        )
        .route(
            "/profile/{username}/unfollow/",
            get(follows::unfollow_author).post(follows::unfollow_author),
        )
        .route("/follow/", get(follows::follow_index))
        .route("/posts/{id}/", get(public::post_detail))
        .route(
            "/posts/{id}/edit/",
            get(posts::edit_form).post(posts::edit_submit),
        )
        .route("/posts/{id}/comment/", post(posts::add_comment))
        .route("/create/", get(posts::create_form).post(posts::create_submit))
        .route("/about/author/", get(public::about_author))
        .route("/about/tech/", get(public::about_tech))
        .route(
            "/auth/signup/",
            get(auth::signup_form).post(auth::signup_submit),
        )
        .route("/auth/login/", get(auth::login_form).post(auth::login_submit))
        .route("/auth/logout/", get(auth::logout))
        .route("/media/{*path}", get(public::serve_media))
        .fallback(public::not_found)
        .layer(DefaultBodyLimit::max(state.upload_limit))
        .layer(from_fn_with_state(state.clone(), resolve_viewer))
        .with_state(state)
        .layer(from_fn(log_responses))
        .layer(from_fn(set_request_context))
}

/// Operator endpoints, served on a separate listener.
pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/_health/db", get(admin::admin_health))
        .route("/cache/invalidate", post(admin::invalidate_cache))
        .with_state(state)
        .layer(from_fn(log_responses))
        .layer(from_fn(set_request_context))
}

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// Map a repository error to a consistent HTTP error response.
pub fn repo_error_to_http(source: &'static str, err: RepoError) -> HttpError {
    match err {
        RepoError::Duplicate { constraint } => {
            HttpError::new(source, StatusCode::CONFLICT, "Duplicate record", constraint)
        }
        RepoError::NotFound => HttpError::new(
            source,
            StatusCode::NOT_FOUND,
            "Resource not found",
            "resource not found",
        ),
        RepoError::InvalidInput { message } => {
            HttpError::new(source, StatusCode::BAD_REQUEST, "Invalid input", message)
        }
        RepoError::Integrity { message } => HttpError::new(
            source,
            StatusCode::CONFLICT,
            "Integrity constraint violated",
            message,
        ),
        RepoError::Timeout => HttpError::new(
            source,
            StatusCode::SERVICE_UNAVAILABLE,
            "Database timeout",
            "Database timeout",
        ),
        RepoError::Persistence(message) => HttpError::new(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Persistence error",
            message,
        ),
    }
}
