//! API middleware.

#![allow(missing_docs)]

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use mappoint_core::{
    ActivityService, AdminService, AnnouncementService, AuthService, AuthenticatedIdentity,
    CommentService, FollowService, MarkerService, NotificationService, PushService, UserService,
};

use crate::sse::SseBroadcaster;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub marker_service: MarkerService,
    pub comment_service: CommentService,
    pub follow_service: FollowService,
    pub notification_service: NotificationService,
    pub push_service: PushService,
    pub announcement_service: AnnouncementService,
    pub admin_service: AdminService,
    pub activity_service: ActivityService,
    pub sse_broadcaster: SseBroadcaster,
}

fn bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Authentication middleware.
///
/// Inserts an [`AuthenticatedIdentity`] when the bearer token verifies and
/// its user still exists. Rejection is left to the extractors, so public
/// routes stay reachable with a stale token.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(&req).map(str::to_owned) {
        match state.auth_service.authenticate(&token).await {
            Ok(identity) => {
                req.extensions_mut().insert(identity);
            }
            Err(e) => tracing::debug!(error = %e, "Bearer token rejected"),
        }
    }

    next.run(req).await
}

/// Records the caller as active this month. Must run inside `auth_middleware`.
pub async fn activity_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(identity) = req.extensions().get::<AuthenticatedIdentity>() {
        let activity = state.activity_service.clone();
        let user_id = identity.user_id.clone();
        tokio::spawn(async move {
            if let Err(e) = activity.record(&user_id).await {
                tracing::warn!(error = %e, user_id = %user_id, "Failed to record activity");
            }
        });
    }

    next.run(req).await
}
