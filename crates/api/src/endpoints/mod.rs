//! API endpoints.

mod admin;
mod announcements;
mod auth;
mod comments;
mod friends;
mod markers;
mod notifications;
mod push;
mod users;

use axum::{Router, middleware::from_fn_with_state, routing::get};

use crate::middleware::{AppState, activity_middleware, auth_middleware};
use crate::response::ApiResponse;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::router())
        .nest("/user", users::router())
        .nest("/marker", markers::router())
        .nest("/comments", comments::router())
        .nest("/friends", friends::router())
        .nest("/notifications", notifications::router())
        .nest("/push", push::router())
        .nest("/announcements", announcements::router())
        .nest("/admin", admin::router())
}

/// The router with authentication and activity tracking applied.
pub fn app(state: AppState) -> Router {
    router()
        .layer(from_fn_with_state(state.clone(), activity_middleware))
        .layer(from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

async fn health() -> ApiResponse<()> {
    ApiResponse::success()
}
