use axum::extract::DefaultBodyLimit;
use axum::{routing::get, routing::patch, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn users() -> Router<AppState> {
    Router::new()
        .route("/users", post(handlers::create_user))
        .route(
            "/users/:id",
            get(handlers::get_user).patch(handlers::update_profile),
        )
        .route("/users/:id/posts", get(handlers::list_user_posts))
        .route(
            "/users/:id/follow",
            post(handlers::follow_user).delete(handlers::unfollow_user),
        )
        .route("/users/:id/followers", get(handlers::list_followers))
        .route("/users/:id/following", get(handlers::list_following))
        .route("/users/:id/relationship", get(handlers::relationship_status))
        .route("/account", axum::routing::delete(handlers::delete_account))
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route("/posts", post(handlers::create_post))
        .route(
            "/posts/:id",
            get(handlers::get_post)
                .patch(handlers::update_post)
                .delete(handlers::delete_post),
        )
        .route(
            "/posts/:id/like",
            post(handlers::like_post).delete(handlers::unlike_post),
        )
        .route(
            "/posts/:id/save",
            post(handlers::save_post).delete(handlers::unsave_post),
        )
        .route(
            "/posts/:id/comments",
            post(handlers::create_comment).get(handlers::list_comments),
        )
}

pub fn comments() -> Router<AppState> {
    Router::new()
        .route(
            "/comments/:id",
            patch(handlers::update_comment).delete(handlers::delete_comment),
        )
        .route(
            "/comments/:id/like",
            post(handlers::like_comment).delete(handlers::unlike_comment),
        )
}

pub fn feed() -> Router<AppState> {
    Router::new()
        .route("/feed", get(handlers::home_feed))
        .route("/me/saved", get(handlers::saved_posts))
}

pub fn media(upload_max_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/media", post(handlers::upload_media))
        .layer(DefaultBodyLimit::max(upload_max_bytes))
}

pub fn listings() -> Router<AppState> {
    Router::new()
        .route(
            "/pets",
            post(handlers::create_pet).get(handlers::list_pets),
        )
        .route(
            "/pets/:id",
            get(handlers::get_pet)
                .patch(handlers::update_pet)
                .delete(handlers::delete_pet),
        )
        .route("/pets/:id/found", post(handlers::mark_pet_found))
        .route(
            "/donations",
            post(handlers::create_donation).get(handlers::list_donations),
        )
        .route(
            "/donations/:id",
            get(handlers::get_donation)
                .patch(handlers::update_donation)
                .delete(handlers::delete_donation),
        )
        .route("/donations/:id/reserve", post(handlers::reserve_donation))
        .route(
            "/vet-help",
            post(handlers::create_fundraiser).get(handlers::list_fundraisers),
        )
        .route(
            "/vet-help/:id",
            get(handlers::get_fundraiser)
                .patch(handlers::update_fundraiser)
                .delete(handlers::delete_fundraiser),
        )
}

pub fn admin() -> Router<AppState> {
    Router::new()
        .route("/payments/confirmed", post(handlers::confirm_payment))
        .route("/admin/reconcile", post(handlers::reconcile_counters))
}
