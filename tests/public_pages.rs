mod support;

use axum::http::StatusCode;

use support::{TestApp, body_text, count_posts};

fn seed_posts(app: &TestApp, count: i64) {
    let author = app.store.add_user("leo");
    for n in 1..=count {
        app.store.add_post(&author, None, &format!("entry number {n:02}"), n);
    }
}

#[tokio::test]
async fn home_feed_is_paginated_newest_first() {
    let app = TestApp::new();
    seed_posts(&app, 13);

    let first = app.get("/", None).await;
    assert_eq!(first.status(), StatusCode::OK);
    let html = body_text(first).await;
    assert_eq!(count_posts(&html), 10);
    assert!(html.contains("entry number 13"));
    assert!(!html.contains("entry number 03"));
    assert!(html.contains("Page 1 of 2"));

    let second = body_text(app.get("/?page=2", None).await).await;
    assert_eq!(count_posts(&second), 3);
    assert!(second.contains("entry number 01"));
    assert!(second.contains("Page 2 of 2"));
}

#[tokio::test]
async fn out_of_range_and_junk_pages_are_clamped() {
    let app = TestApp::new();
    seed_posts(&app, 13);

    let past_end = body_text(app.get("/?page=99", None).await).await;
    assert!(past_end.contains("Page 2 of 2"));
    assert_eq!(count_posts(&past_end), 3);

    let junk = body_text(app.get("/?page=abc", None).await).await;
    assert!(junk.contains("Page 1 of 2"));
}

#[tokio::test]
async fn empty_feed_renders_placeholder() {
    let app = TestApp::new();
    let html = body_text(app.get("/", None).await).await;
    assert_eq!(count_posts(&html), 0);
    assert!(html.contains("Nobody has posted anything yet."));
}

#[tokio::test]
async fn group_page_lists_only_its_posts() {
    let app = TestApp::new();
    let author = app.store.add_user("leo");
    let novels = app.store.add_group("Novels", "novels");
    let essays = app.store.add_group("Essays", "essays");
    app.store.add_post(&author, Some(&novels), "war and peace", 1);
    app.store.add_post(&author, Some(&essays), "what is art", 2);
    app.store.add_post(&author, None, "diary", 3);

    let response = app.get("/group/novels/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert_eq!(count_posts(&html), 1);
    assert!(html.contains("war and peace"));
    assert!(!html.contains("what is art"));
}

#[tokio::test]
async fn unknown_group_profile_and_post_are_not_found() {
    let app = TestApp::new();

    for uri in [
        "/group/missing/",
        "/profile/nobody/",
        "/posts/42/",
        "/posts/not-a-number/",
        "/no/such/route/",
    ] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        let html = body_text(response).await;
        assert!(html.contains("Page not found"), "{uri}");
    }
}

#[tokio::test]
async fn profile_shows_counts_and_posts() {
    let app = TestApp::new();
    let leo = app.store.add_user("leo");
    let other = app.store.add_user("anna");
    app.store.add_post(&leo, None, "first story", 1);
    app.store.add_post(&leo, None, "second story", 2);
    app.store.add_post(&other, None, "not mine", 3);

    let response = app.get("/profile/leo/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert_eq!(count_posts(&html), 2);
    assert!(html.contains("Posts: 2"));
    assert!(html.contains("Followers: 0"));
    assert!(!html.contains("not mine"));
    // Guests get no follow button.
    assert!(!html.contains("/profile/leo/follow/"));
}

#[tokio::test]
async fn post_detail_shows_comments_and_author_post_count() {
    let app = TestApp::new();
    let leo = app.store.add_user("leo");
    app.store.add_post(&leo, None, "older", 1);
    let post = app.store.add_post(&leo, None, "the post itself", 2);

    let response = app.get(&format!("/posts/{}/", post.id), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("the post itself"));
    assert!(html.contains("Posts by this author: 2"));
    assert!(html.contains("No comments yet."));
    assert!(html.contains("Log in</a> to leave a comment."));
    assert!(!html.contains("Edit post"));
}

#[tokio::test]
async fn about_pages_render() {
    let app = TestApp::new();
    for uri in ["/about/author/", "/about/tech/"] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn stored_media_is_served_with_long_cache() {
    let app = TestApp::new();
    let stored = app
        .state
        .upload_storage
        .store("posts", "dot.gif", bytes::Bytes::from_static(b"GIF89a"))
        .await
        .expect("stored upload");

    let response = app.get(&format!("/media/{}", stored.stored_path), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/gif");
    assert_eq!(
        response.headers()["cache-control"],
        "public, max-age=31536000, immutable"
    );
    assert_eq!(body_text(response).await, "GIF89a");

    let missing = app.get("/media/posts/nothing-here.png", None).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let escape = app.get("/media/../Cargo.toml", None).await;
    assert_eq!(escape.status(), StatusCode::NOT_FOUND);
}
