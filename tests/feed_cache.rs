mod support;

use std::time::Duration;

use axum::http::StatusCode;

use support::{TestApp, body_text, count_posts, get, post_form};

#[tokio::test(start_paused = true)]
async fn home_feed_stays_stale_until_the_entry_expires() {
    let app = TestApp::with_cache(true);
    let leo = app.store.add_user("leo");
    app.store.add_post(&leo, None, "before caching", 1);

    let cookie = app.login_cookie(&leo).await;

    let first = body_text(app.get("/", None).await).await;
    assert_eq!(count_posts(&first), 1);

    let created = app
        .post_form("/create/", "text=written+later&group=", Some(&cookie))
        .await;
    assert_eq!(created.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.store.posts_by(leo.id).len(), 2);

    tokio::time::advance(Duration::from_secs(19)).await;
    let cached = body_text(app.get("/", None).await).await;
    assert_eq!(cached, first);
    assert!(!cached.contains("written later"));

    tokio::time::advance(Duration::from_secs(2)).await;
    let fresh = body_text(app.get("/", None).await).await;
    assert_eq!(count_posts(&fresh), 2);
    assert!(fresh.contains("written later"));
}

#[tokio::test(start_paused = true)]
async fn other_pages_are_never_cached() {
    let app = TestApp::with_cache(true);
    let leo = app.store.add_user("leo");
    app.store.add_post(&leo, None, "first", 1);

    let before = body_text(app.get("/profile/leo/", None).await).await;
    assert_eq!(count_posts(&before), 1);

    app.store.add_post(&leo, None, "second", 2);
    let after = body_text(app.get("/profile/leo/", None).await).await;
    assert_eq!(count_posts(&after), 2);
}

#[tokio::test(start_paused = true)]
async fn signed_in_viewers_do_not_share_entries_with_guests() {
    let app = TestApp::with_cache(true);
    let leo = app.store.add_user("leo");
    let cookie = app.login_cookie(&leo).await;

    let guest = body_text(app.get("/", None).await).await;
    assert!(guest.contains("Sign up"));

    let member = body_text(app.get("/", Some(&cookie)).await).await;
    assert!(member.contains("Log out"));
    assert!(!member.contains("Sign up"));
}

#[tokio::test(start_paused = true)]
async fn admin_invalidate_clears_cached_pages() {
    let app = TestApp::with_cache(true);
    let leo = app.store.add_user("leo");
    app.store.add_post(&leo, None, "first", 1);

    let _ = app.get("/", None).await;
    app.store.add_post(&leo, None, "second", 2);
    assert_eq!(count_posts(&body_text(app.get("/", None).await).await), 1);

    let response = app.send_admin(post_form("/cache/invalidate", "", None)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let fresh = body_text(app.get("/", None).await).await;
    assert_eq!(count_posts(&fresh), 2);
}

#[tokio::test]
async fn disabled_cache_renders_every_request() {
    let app = TestApp::new();
    let leo = app.store.add_user("leo");
    app.store.add_post(&leo, None, "first", 1);
    let _ = app.get("/", None).await;
    app.store.add_post(&leo, None, "second", 2);

    let fresh = body_text(app.get("/", None).await).await;
    assert_eq!(count_posts(&fresh), 2);

    let response = app.send_admin(post_form("/cache/invalidate", "", None)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn admin_health_reports_database_reachable() {
    let app = TestApp::new();
    let response = app.send_admin(get("/_health/db", None)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
