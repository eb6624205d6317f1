use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use metrics::counter;
use tracing::info;

use super::{AdminState, db_health_response};

pub(super) async fn admin_health(State(state): State<AdminState>) -> Response {
    db_health_response(state.health.ping().await)
}

/// Drop every cached feed page so the next request renders fresh content.
pub(super) async fn invalidate_cache(State(state): State<AdminState>) -> Response {
    let Some(cache) = state.cache.as_ref() else {
        info!(
            target = "postboard::http::admin",
            "feed cache disabled, nothing to clear"
        );
        return StatusCode::NO_CONTENT.into_response();
    };

    let cleared = cache.clear().await;
    counter!("postboard_feed_cache_clear_total").increment(1);
    info!(
        target = "postboard::http::admin",
        cleared,
        "feed cache cleared"
    );
    StatusCode::NO_CONTENT.into_response()
}
