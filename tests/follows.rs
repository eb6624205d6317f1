mod support;

use axum::http::StatusCode;

use support::{TestApp, body_text, count_posts, location};

#[tokio::test]
async fn follow_and_unfollow_update_profile_counts() {
    let app = TestApp::new();
    let leo = app.store.add_user("leo");
    let anna = app.store.add_user("anna");
    let cookie = app.login_cookie(&anna).await;

    let before = body_text(app.get("/profile/leo/", Some(&cookie)).await).await;
    assert!(before.contains("Followers: 0"));
    assert!(before.contains("/profile/leo/follow/"));

    let followed = app.get("/profile/leo/follow/", Some(&cookie)).await;
    assert_eq!(followed.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&followed), "/profile/leo/");

    let after = body_text(app.get("/profile/leo/", Some(&cookie)).await).await;
    assert!(after.contains("Followers: 1"));
    assert!(after.contains("/profile/leo/unfollow/"));

    let own = body_text(app.get("/profile/anna/", Some(&cookie)).await).await;
    assert!(own.contains("Following: 1"));
    // No follow button on your own profile.
    assert!(!own.contains("/profile/anna/follow/"));

    let unfollowed = app.get("/profile/leo/unfollow/", Some(&cookie)).await;
    assert_eq!(unfollowed.status(), StatusCode::SEE_OTHER);
    let reset = body_text(app.get("/profile/leo/", None).await).await;
    assert!(reset.contains("Followers: 0"));
    assert_eq!(app.store.follow_count(), 0);
    assert_ne!(leo.id, anna.id);
}

#[tokio::test]
async fn repeated_follow_keeps_a_single_subscription() {
    let app = TestApp::new();
    app.store.add_user("leo");
    let anna = app.store.add_user("anna");
    let cookie = app.login_cookie(&anna).await;

    for _ in 0..3 {
        let response = app.get("/profile/leo/follow/", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }
    assert_eq!(app.store.follow_count(), 1);

    // Unfollowing twice is equally harmless.
    app.get("/profile/leo/unfollow/", Some(&cookie)).await;
    let again = app.get("/profile/leo/unfollow/", Some(&cookie)).await;
    assert_eq!(again.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.store.follow_count(), 0);
}

#[tokio::test]
async fn following_yourself_is_ignored() {
    let app = TestApp::new();
    let leo = app.store.add_user("leo");
    let cookie = app.login_cookie(&leo).await;

    let response = app.get("/profile/leo/follow/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.store.follow_count(), 0);
}

#[tokio::test]
async fn following_an_unknown_user_is_not_found() {
    let app = TestApp::new();
    let anna = app.store.add_user("anna");
    let cookie = app.login_cookie(&anna).await;

    let response = app.get("/profile/ghost/follow/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let guest = app.get("/profile/anna/follow/", None).await;
    assert_eq!(guest.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&guest), "/auth/login/?next=/profile/anna/follow/");
}

#[tokio::test]
async fn follow_feed_lists_only_followed_authors() {
    let app = TestApp::new();
    let leo = app.store.add_user("leo");
    let fyodor = app.store.add_user("fyodor");
    let anna = app.store.add_user("anna");
    app.store.add_post(&leo, None, "from leo", 1);
    app.store.add_post(&fyodor, None, "from fyodor", 2);
    app.store.add_post(&anna, None, "from anna herself", 3);
    let cookie = app.login_cookie(&anna).await;

    let empty = body_text(app.get("/follow/", Some(&cookie)).await).await;
    assert_eq!(count_posts(&empty), 0);
    assert!(empty.contains("Follow some authors to see their posts here."));

    app.get("/profile/leo/follow/", Some(&cookie)).await;
    let response = app.get("/follow/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert_eq!(count_posts(&html), 1);
    assert!(html.contains("from leo"));
    assert!(!html.contains("from fyodor"));
    assert!(!html.contains("from anna herself"));
}

#[tokio::test]
async fn follow_feed_is_paginated() {
    let app = TestApp::new();
    let leo = app.store.add_user("leo");
    let anna = app.store.add_user("anna");
    for n in 1..=12 {
        app.store.add_post(&leo, None, &format!("chapter {n:02}"), n);
    }
    let cookie = app.login_cookie(&anna).await;
    app.get("/profile/leo/follow/", Some(&cookie)).await;

    let second = body_text(app.get("/follow/?page=2", Some(&cookie)).await).await;
    assert_eq!(count_posts(&second), 2);
    assert!(second.contains("chapter 01"));
    assert!(second.contains("Page 2 of 2"));
}
