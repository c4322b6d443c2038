//! Feed Tests
//!
//! Covers visibility filtering, story expiry, and pagination.

mod common;

use axum::http::StatusCode;
use common::{app, item_ids};
use std::collections::HashSet;
use uuid::Uuid;

// ===========================================================================
// Visibility
// ===========================================================================

#[tokio::test]
async fn followers_post_reaches_followers_only() {
    let app = app();
    let author = app.create_user("vis_author").await;
    let follower = app.create_user("vis_follower").await;
    let stranger = app.create_user("vis_stranger").await;

    let public = app.create_post(&author, "public").await;
    let followers = app.create_post(&author, "followers").await;
    app.follow(&follower, &author).await;

    let body = app.get("/v1/feed", None).await.json();
    assert_eq!(item_ids(&body), vec![public]);
    assert_eq!(body["total"], 1);

    let body = app.get("/v1/feed", Some(&stranger.access_token)).await.json();
    assert_eq!(item_ids(&body), vec![public]);

    let body = app.get("/v1/feed", Some(&follower.access_token)).await.json();
    assert_eq!(item_ids(&body), vec![followers, public]);
    assert_eq!(body["total"], 2);

    let resp = app
        .get(
            &format!("/v1/posts/{}", followers),
            Some(&stranger.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .get(
            &format!("/v1/posts/{}", followers),
            Some(&follower.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn private_post_is_visible_to_owner_only() {
    let app = app();
    let author = app.create_user("priv_author").await;
    let follower = app.create_user("priv_follower").await;
    app.follow(&follower, &author).await;
    let private = app.create_post(&author, "private").await;

    let body = app.get("/v1/feed", Some(&follower.access_token)).await.json();
    assert!(item_ids(&body).is_empty());
    assert_eq!(body["total"], 0);

    let body = app.get("/v1/feed", Some(&author.access_token)).await.json();
    assert_eq!(item_ids(&body), vec![private]);

    let resp = app.get(&format!("/v1/posts/{}", private), None).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unfollowing_hides_followers_posts_again() {
    let app = app();
    let author = app.create_user("gone_author").await;
    let reader = app.create_user("gone_reader").await;
    app.follow(&reader, &author).await;
    let post = app.create_post(&author, "followers").await;

    let body = app.get("/v1/feed", Some(&reader.access_token)).await.json();
    assert_eq!(item_ids(&body), vec![post]);

    let resp = app
        .delete(
            &format!("/v1/users/{}/follow", author.id),
            Some(&reader.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let body = app.get("/v1/feed", Some(&reader.access_token)).await.json();
    assert!(item_ids(&body).is_empty());
}

#[tokio::test]
async fn expired_story_leaves_public_feeds() {
    let app = app();
    let author = app.create_user("story_author").await;
    let viewer = app.create_user("story_viewer").await;
    let story = app.insert_expired_story(&author).await;

    let body = app.get("/v1/feed", Some(&viewer.access_token)).await.json();
    assert!(item_ids(&body).is_empty());

    let resp = app
        .get(&format!("/v1/posts/{}", story.id), Some(&viewer.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let body = app
        .get(
            &format!("/v1/users/{}/posts", author.id),
            Some(&author.access_token),
        )
        .await
        .json();
    assert_eq!(item_ids(&body), vec![story.id]);
}

#[tokio::test]
async fn user_posts_for_unknown_user_is_not_found() {
    let app = app();
    let resp = app
        .get(&format!("/v1/users/{}/posts", Uuid::new_v4()), None)
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

// ===========================================================================
// Pagination
// ===========================================================================

#[tokio::test]
async fn pages_cover_the_feed_without_overlap() {
    let app = app();
    let author = app.create_user("pager").await;
    let mut created = Vec::new();
    for _ in 0..25 {
        created.push(app.create_post(&author, "public").await);
    }
    created.reverse();

    let mut seen = Vec::new();
    for page in 1..=3 {
        let body = app
            .get(&format!("/v1/feed?page={}&limit=10", page), None)
            .await
            .json();
        assert_eq!(body["total"], 25);
        assert_eq!(body["pages"], 3);
        assert_eq!(body["page"], page);
        seen.extend(item_ids(&body));
    }

    assert_eq!(seen, created);
    let unique: HashSet<Uuid> = seen.iter().copied().collect();
    assert_eq!(unique.len(), 25);

    let body = app.get("/v1/feed?page=4&limit=10", None).await.json();
    assert!(item_ids(&body).is_empty());
    assert_eq!(body["total"], 25);
}

#[tokio::test]
async fn same_page_twice_is_identical() {
    let app = app();
    let author = app.create_user("stable").await;
    for _ in 0..5 {
        app.create_post(&author, "public").await;
    }

    let first = app.get("/v1/feed?page=2&limit=2", None).await.json();
    let second = app.get("/v1/feed?page=2&limit=2", None).await.json();
    assert_eq!(item_ids(&first), item_ids(&second));
}

#[tokio::test]
async fn bad_page_parameters_are_rejected() {
    let app = app();

    for query in ["page=0", "limit=0", "limit=101"] {
        let resp = app.get(&format!("/v1/feed?{}", query), None).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST, "{}", query);
    }

    let resp = app.get("/v1/feed?limit=100", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["limit"], 100);
}

// ===========================================================================
// Scenarios
// ===========================================================================

#[tokio::test]
async fn liked_post_annotations_per_viewer() {
    let app = app();
    let u1 = app.create_user("scenario_u1").await;
    let u2 = app.create_user("scenario_u2").await;
    let p1 = app.create_post(&u1, "public").await;

    let resp = app
        .post(&format!("/v1/posts/{}/like", p1), Some(&u2.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);

    let anonymous = app.get("/v1/feed", None).await.json();
    assert_eq!(anonymous["items"][0]["id"], p1.to_string());
    assert_eq!(anonymous["items"][0]["likes_count"], 1);
    assert!(anonymous["items"][0].get("is_liked").is_none());

    let as_u2 = app.get("/v1/feed", Some(&u2.access_token)).await.json();
    assert_eq!(as_u2["items"][0]["is_liked"], true);
    assert_eq!(as_u2["items"][0]["likes_count"], 1);

    let as_u1 = app.get("/v1/feed", Some(&u1.access_token)).await.json();
    assert_eq!(as_u1["items"][0]["is_liked"], false);
    assert_eq!(as_u1["items"][0]["likes_count"], 1);
}

#[tokio::test]
async fn making_post_private_hides_it_from_others() {
    let app = app();
    let u1 = app.create_user("private_u1").await;
    let u2 = app.create_user("private_u2").await;
    let p1 = app.create_post(&u1, "public").await;

    let resp = app
        .patch_json(
            &format!("/v1/posts/{}", p1),
            serde_json::json!({ "visibility": "private" }),
            Some(&u1.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let anonymous = app.get("/v1/feed", None).await.json();
    assert!(item_ids(&anonymous).is_empty());
    let as_u2 = app.get("/v1/feed", Some(&u2.access_token)).await.json();
    assert!(item_ids(&as_u2).is_empty());

    let resp = app.get(&format!("/v1/posts/{}", p1), None).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    let resp = app
        .get(&format!("/v1/posts/{}", p1), Some(&u2.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .get(&format!("/v1/posts/{}", p1), Some(&u1.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let as_u1 = app.get("/v1/feed", Some(&u1.access_token)).await.json();
    assert_eq!(item_ids(&as_u1), vec![p1]);
}
