//! Session cookies and the viewer extractors handlers use.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{Uri, request::Parts},
    response::Redirect,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::application::accounts::{IssuedSession, Viewer};
use crate::domain::entities::UserRecord;

use super::state::SessionCookie;

pub const LOGIN_PATH: &str = "/auth/login/";

/// The request's viewer, anonymous when no session resolved.
pub struct CurrentViewer(pub Viewer);

impl<S> FromRequestParts<S> for CurrentViewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Viewer>().cloned().unwrap_or_default()))
    }
}

/// A signed-in user. Guests are redirected to the login page with `next`
/// pointing back at the requested path.
pub struct RequireUser(pub UserRecord);

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Viewer>().and_then(Viewer::user) {
            Some(user) => Ok(Self(user.clone())),
            None => Err(login_redirect(&parts.uri)),
        }
    }
}

pub fn login_redirect(uri: &Uri) -> Redirect {
    let target = uri
        .path_and_query()
        .map(|value| value.as_str())
        .unwrap_or("/");
    Redirect::to(&format!("{LOGIN_PATH}?next={}", encode_next(target)))
}

/// Percent-encode a path for the `next` parameter, keeping `/` readable.
pub fn encode_next(target: &str) -> String {
    url::form_urlencoded::byte_serialize(target.as_bytes())
        .collect::<String>()
        .replace("%2F", "/")
}

/// `next` is honoured only for same-site paths.
pub fn safe_next(next: Option<&str>) -> &str {
    match next.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}

pub fn session_cookie(settings: &SessionCookie, session: &IssuedSession) -> Cookie<'static> {
    let max_age = time::Duration::seconds(
        i64::try_from(settings.ttl.as_secs()).unwrap_or(i64::MAX),
    );
    Cookie::build((settings.name.clone(), session.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(settings.secure)
        .max_age(max_age)
        .build()
}

pub fn session_token(jar: &CookieJar, settings: &SessionCookie) -> Option<String> {
    jar.get(&settings.name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

pub fn clear_session(jar: CookieJar, settings: &SessionCookie) -> CookieJar {
    jar.remove(Cookie::build((settings.name.clone(), "")).path("/"))
}
