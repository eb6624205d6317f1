use std::io::ErrorKind;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use tracing::error;

use crate::{
    application::{
        error::{ErrorReport, HttpError},
        feed::FeedError,
    },
    infra::uploads::UploadStorageError,
    presentation::views::{
        AboutAuthorTemplate, AboutTechTemplate, FeedContext, GroupTemplate, IndexTemplate,
        LayoutChrome, LayoutContext, PostDetailContext, PostDetailTemplate, ProfileContext,
        ProfileTemplate, render_not_found_response, render_template_response,
    },
};

use super::{
    HttpState,
    forms::PageQuery,
    repo_error_to_http,
    session::CurrentViewer,
};

pub(super) async fn index(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = LayoutChrome::for_viewer(&viewer);
    match state.feed.index(query.page.as_deref()).await {
        Ok(page) => {
            let view = LayoutContext::new(chrome, "", FeedContext::index(&page));
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

pub(super) async fn group_posts(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = LayoutChrome::for_viewer(&viewer);
    match state.feed.group(&slug, query.page.as_deref()).await {
        Ok(feed) => {
            let title = feed.group.title.clone();
            let view = LayoutContext::new(chrome, title, FeedContext::group(&feed));
            render_template_response(GroupTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

pub(super) async fn profile(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = LayoutChrome::for_viewer(&viewer);
    match state
        .feed
        .profile(&username, query.page.as_deref(), viewer.user())
        .await
    {
        Ok(feed) => {
            let content = ProfileContext::new(&feed, viewer.user().is_some());
            let title = format!("Posts by {}", content.display_name);
            let view = LayoutContext::new(chrome, title, content);
            render_template_response(ProfileTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

pub(super) async fn post_detail(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(raw_id): Path<String>,
) -> Response {
    let chrome = LayoutChrome::for_viewer(&viewer);
    let Some(id) = parse_id(&raw_id) else {
        return render_not_found_response(chrome);
    };

    match state.feed.post_detail(id).await {
        Ok(detail) => {
            let content = PostDetailContext::new(&detail, &viewer);
            let title = format!("Post {}", content.post.headline);
            let view = LayoutContext::new(chrome, title, content);
            render_template_response(PostDetailTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

pub(super) async fn about_author(CurrentViewer(viewer): CurrentViewer) -> Response {
    let view = LayoutContext::new(LayoutChrome::for_viewer(&viewer), "About the author", ());
    render_template_response(AboutAuthorTemplate { view }, StatusCode::OK)
}

pub(super) async fn about_tech(CurrentViewer(viewer): CurrentViewer) -> Response {
    let view = LayoutContext::new(LayoutChrome::for_viewer(&viewer), "Technologies", ());
    render_template_response(AboutTechTemplate { view }, StatusCode::OK)
}

pub(super) async fn not_found(CurrentViewer(viewer): CurrentViewer) -> Response {
    render_not_found_response(LayoutChrome::for_viewer(&viewer))
}

pub(super) async fn serve_media(
    State(state): State<HttpState>,
    Path(path): Path<String>,
) -> Response {
    const SOURCE: &str = "infra::http::public::serve_media";

    match state.upload_storage.read(&path).await {
        Ok(bytes) => build_media_response(&path, bytes),
        Err(UploadStorageError::InvalidPath) => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "File not found",
            "The requested path is not a stored upload",
        )
        .into_response(),
        Err(UploadStorageError::Io(err)) if err.kind() == ErrorKind::NotFound => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "File not found",
            "The requested upload is not available",
        )
        .into_response(),
        Err(err) => {
            error!(
                target = SOURCE,
                path = %path,
                error = %err,
                "failed to read stored upload"
            );
            HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read uploaded file",
                err.to_string(),
            )
            .into_response()
        }
    }
}

fn build_media_response(path: &str, bytes: Bytes) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}

pub(super) fn parse_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

pub(super) fn feed_error_to_response(err: FeedError, chrome: LayoutChrome) -> Response {
    match err {
        FeedError::Repo(err) => repo_error_to_http("infra::http::feed", err).into_response(),
        err => {
            let mut response = render_not_found_response(chrome);
            ErrorReport::from_error(
                "infra::http::feed_error_to_response",
                StatusCode::NOT_FOUND,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
