use std::time::Duration;

use axum::Router;
use tower_http::timeout::TimeoutLayer;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod routes;

pub use auth::{AdminToken, AuthUser, MaybeAuthUser};
pub use error::AppError;

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let v1 = Router::new()
        .merge(routes::health())
        .merge(routes::users())
        .merge(routes::posts())
        .merge(routes::comments())
        .merge(routes::feed())
        .merge(routes::media(state.upload_max_bytes))
        .merge(routes::listings())
        .merge(routes::admin());

    Router::new()
        .nest("/v1", v1)
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}
