//! Home feed response cache.
//!
//! Rendered feed pages are kept for a fixed TTL, keyed by route and viewer.
//! Writes never invalidate entries: a new or edited post shows up on a cached
//! page only once the entry expires or the cache is cleared explicitly
//! (`POST /cache/invalidate` on the admin listener).
//!
//! ```toml
//! [feed]
//! cache_enabled = true
//! cache_ttl_seconds = 20
//! ```

mod keys;
mod middleware;
mod store;

pub use keys::FeedCacheKey;
pub use middleware::feed_cache_layer;
pub use store::{CacheStoreError, CachedResponse, FeedCache, buffer_response, should_store_response};
