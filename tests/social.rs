//! Social Graph Tests
//!
//! Covers follows, follower listings, and relationship status.

mod common;

use axum::http::StatusCode;
use common::app;
use uuid::Uuid;

// ===========================================================================
// Follow System
// ===========================================================================

#[tokio::test]
async fn follow_user() {
    let app = app();
    let user_a = app.create_user("soc_follow_a").await;
    let user_b = app.create_user("soc_follow_b").await;

    let resp = app
        .post(
            &format!("/v1/users/{}/follow", user_b.id),
            Some(&user_a.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    let body = resp.json();
    assert_eq!(body["kind"], "follow");
    assert_eq!(body["actor_id"], user_a.id.to_string());
    assert_eq!(body["target_id"], user_b.id.to_string());
}

#[tokio::test]
async fn follow_already_following() {
    let app = app();
    let user_a = app.create_user("soc_follow_dup_a").await;
    let user_b = app.create_user("soc_follow_dup_b").await;
    app.follow(&user_a, &user_b).await;

    let resp = app
        .post(
            &format!("/v1/users/{}/follow", user_b.id),
            Some(&user_a.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(resp.error_message(), "already following");
}

#[tokio::test]
async fn follow_self() {
    let app = app();
    let user = app.create_user("soc_follow_self").await;

    let resp = app
        .post(
            &format!("/v1/users/{}/follow", user.id),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "cannot follow yourself");
}

#[tokio::test]
async fn follow_nonexistent_user() {
    let app = app();
    let user = app.create_user("soc_follow_ghost").await;

    let resp = app
        .post(
            &format!("/v1/users/{}/follow", Uuid::new_v4()),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_message(), "user not found");
}

#[tokio::test]
async fn follow_without_profile_is_forbidden() {
    let app = app();
    let target = app.create_user("soc_target").await;
    let token = app.token_for(Uuid::new_v4());

    let resp = app
        .post(&format!("/v1/users/{}/follow", target.id), Some(&token))
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unfollow_when_not_following() {
    let app = app();
    let user_a = app.create_user("soc_unf_a").await;
    let user_b = app.create_user("soc_unf_b").await;

    let resp = app
        .delete(
            &format!("/v1/users/{}/follow", user_b.id),
            Some(&user_a.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_message(), "not following");
}

// ===========================================================================
// Listings and counts
// ===========================================================================

#[tokio::test]
async fn followers_and_following_lists() {
    let app = app();
    let star = app.create_user("soc_star").await;
    let fan_one = app.create_user("soc_fan_one").await;
    let fan_two = app.create_user("soc_fan_two").await;
    app.follow(&fan_one, &star).await;
    app.follow(&fan_two, &star).await;
    app.follow(&star, &fan_one).await;

    let body = app
        .get(&format!("/v1/users/{}/followers", star.id), None)
        .await
        .json();
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"][0]["user"]["handle"], "soc_fan_two");
    assert_eq!(body["items"][1]["user"]["handle"], "soc_fan_one");

    let body = app
        .get(&format!("/v1/users/{}/following", star.id), None)
        .await
        .json();
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["user"]["handle"], "soc_fan_one");

    let profile = app.get(&format!("/v1/users/{}", star.id), None).await.json();
    assert_eq!(profile["followers_count"], 2);
    assert_eq!(profile["following_count"], 1);
}

#[tokio::test]
async fn relationship_status_is_directional() {
    let app = app();
    let user_a = app.create_user("soc_rel_a").await;
    let user_b = app.create_user("soc_rel_b").await;
    app.follow(&user_a, &user_b).await;

    let body = app
        .get(
            &format!("/v1/users/{}/relationship", user_b.id),
            Some(&user_a.access_token),
        )
        .await
        .json();
    assert_eq!(body["is_following"], true);
    assert_eq!(body["is_followed_by"], false);

    let body = app
        .get(
            &format!("/v1/users/{}/relationship", user_a.id),
            Some(&user_b.access_token),
        )
        .await
        .json();
    assert_eq!(body["is_following"], false);
    assert_eq!(body["is_followed_by"], true);
}
