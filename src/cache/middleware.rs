//! Response cache middleware for the home feed.

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    middleware::Next,
    response::Response,
};
use metrics::counter;
use tracing::{debug, instrument, warn};

use super::{FeedCache, FeedCacheKey, should_store_response};

/// Serve cached GET responses while fresh; store successful misses.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn feed_cache_layer(
    State(cache): State<FeedCache>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = FeedCacheKey::from_request(&request).to_string();

    if let Some(cached) = cache.get(&key).await {
        counter!("postboard_feed_cache_hit_total").increment(1);
        debug!(cache = "feed", outcome = "hit", key = %key, "serving cached response");
        return cached;
    }

    counter!("postboard_feed_cache_miss_total").increment(1);
    debug!(cache = "feed", outcome = "miss", key = %key, "cache miss, executing handler");

    let response = next.run(request).await;
    if !should_store_response(&response) {
        return response;
    }

    match cache.store_response(&key, response).await {
        Ok(response) => response,
        Err((response, err)) => {
            warn!(
                target = "postboard::cache",
                key = %key,
                error = %err,
                "failed to store feed response"
            );
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use axum::{Router, middleware, routing::get};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;

    fn counting_router(cache: FeedCache, hits: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route(
                "/",
                get(move || {
                    let hits = hits.clone();
                    async move {
                        let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
                        format!("render #{n}")
                    }
                })
                .post(|| async { "posted" }),
            )
            .layer(middleware::from_fn_with_state(cache, feed_cache_layer))
    }

    async fn body(router: &Router, method: Method, uri: &str) -> String {
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let bytes = response.into_body().collect().await.expect("body").to_bytes();
        String::from_utf8(bytes.to_vec()).expect("utf8")
    }

    #[tokio::test]
    async fn repeated_gets_are_served_from_cache() {
        let cache = FeedCache::new(Duration::from_secs(20));
        let hits = Arc::new(AtomicUsize::new(0));
        let router = counting_router(cache.clone(), hits.clone());

        assert_eq!(body(&router, Method::GET, "/").await, "render #1");
        assert_eq!(body(&router, Method::GET, "/").await, "render #1");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert_eq!(body(&router, Method::GET, "/?page=2").await, "render #2");

        cache.clear().await;
        assert_eq!(body(&router, Method::GET, "/").await, "render #3");
    }

    #[tokio::test]
    async fn non_get_requests_bypass_cache() {
        let cache = FeedCache::new(Duration::from_secs(20));
        let router = counting_router(cache.clone(), Arc::new(AtomicUsize::new(0)));

        assert_eq!(body(&router, Method::POST, "/").await, "posted");
        assert_eq!(cache.live_entries().await, 0);
    }
}
