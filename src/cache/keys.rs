//! Cache key derivation.

use std::fmt;

use axum::{body::Body, http::Request};

use crate::application::accounts::Viewer;

/// Route plus viewer. Pages carry per-viewer navigation, so viewers never share entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedCacheKey {
    pub path: String,
    pub query: String,
    pub viewer: Option<i64>,
}

impl FeedCacheKey {
    pub fn from_request(request: &Request<Body>) -> Self {
        let viewer = request
            .extensions()
            .get::<Viewer>()
            .and_then(|viewer| viewer.user_id());

        Self {
            path: request.uri().path().to_string(),
            query: request.uri().query().unwrap_or("").to_string(),
            viewer,
        }
    }
}

impl fmt::Display for FeedCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        match self.viewer {
            Some(id) => write!(f, "#user:{id}"),
            None => f.write_str("#anon"),
        }
    }
}
