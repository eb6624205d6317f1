//! Sign-up, log-in and log-out pages.

use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};

use crate::{
    application::{
        accounts::{AccountError, SignupSubmission, Viewer},
        error::HttpError,
    },
    domain::entities::UserRecord,
    presentation::views::{
        LayoutChrome, LayoutContext, LoggedOutTemplate, LoginContext, LoginTemplate,
        SignupContext, SignupTemplate, render_template_response,
    },
};

use super::{
    HttpState,
    forms::{LoginForm, NextQuery, SignupForm},
    repo_error_to_http,
    session::{CurrentViewer, clear_session, safe_next, session_cookie, session_token},
};

const SOURCE: &str = "infra::http::auth";

pub(super) async fn signup_form(CurrentViewer(viewer): CurrentViewer) -> Response {
    render_signup(&viewer, SignupContext::default())
}

pub(super) async fn signup_submit(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Response {
    let submission = SignupSubmission::from(form);
    match state.accounts.register(&submission).await {
        Ok(user) => sign_in(&state, jar, &user, "/").await,
        Err(AccountError::Invalid(errors)) => render_signup(
            &viewer,
            SignupContext::rejected(
                &submission.first_name,
                &submission.last_name,
                &submission.username,
                &submission.email,
                &errors,
            ),
        ),
        Err(err) => account_error_to_response(err),
    }
}

pub(super) async fn login_form(
    CurrentViewer(viewer): CurrentViewer,
    Query(query): Query<NextQuery>,
) -> Response {
    render_login(&viewer, LoginContext::new(query.next.as_deref()))
}

pub(super) async fn login_submit(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    match state
        .accounts
        .authenticate(&form.username, &form.password)
        .await
    {
        Ok(user) => {
            let target = safe_next(form.next.as_deref()).to_string();
            sign_in(&state, jar, &user, &target).await
        }
        Err(AccountError::Invalid(errors)) => render_login(
            &viewer,
            LoginContext::rejected(&form.username, form.next.as_deref(), &errors),
        ),
        Err(err) => account_error_to_response(err),
    }
}

pub(super) async fn logout(State(state): State<HttpState>, jar: CookieJar) -> Response {
    if let Some(token) = session_token(&jar, &state.session_cookie)
        && let Err(err) = state.accounts.end_session(&token).await
    {
        warn!(target = SOURCE, error = %err, "failed to delete session on logout");
    }

    let jar = clear_session(jar, &state.session_cookie);
    let view = LayoutContext::new(LayoutChrome::for_viewer(&Viewer::anonymous()), "Logged out", ());
    (
        jar,
        render_template_response(LoggedOutTemplate { view }, StatusCode::OK),
    )
        .into_response()
}

async fn sign_in(state: &HttpState, jar: CookieJar, user: &UserRecord, target: &str) -> Response {
    match state.accounts.start_session(user).await {
        Ok(session) => {
            info!(target = SOURCE, username = %user.username, "session started");
            let jar = jar.add(session_cookie(&state.session_cookie, &session));
            (jar, Redirect::to(target)).into_response()
        }
        Err(err) => account_error_to_response(err),
    }
}

fn render_signup(viewer: &Viewer, content: SignupContext) -> Response {
    let view = LayoutContext::new(LayoutChrome::for_viewer(viewer), "Sign up", content);
    render_template_response(SignupTemplate { view }, StatusCode::OK)
}

fn render_login(viewer: &Viewer, content: LoginContext) -> Response {
    let view = LayoutContext::new(LayoutChrome::for_viewer(viewer), "Log in", content);
    render_template_response(LoginTemplate { view }, StatusCode::OK)
}

fn account_error_to_response(err: AccountError) -> Response {
    match err {
        AccountError::Repo(err) => repo_error_to_http(SOURCE, err).into_response(),
        err => HttpError::from_error(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Account request failed",
            &err,
        )
        .into_response(),
    }
}
