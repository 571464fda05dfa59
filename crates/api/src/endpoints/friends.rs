//! Follow relationship endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use mappoint_common::AppResult;
use mappoint_core::{FollowListEntry, FollowRequestEntry};
use mappoint_db::entities::follow;
use serde::Deserialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Create friends router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/send-request", post(send_request))
        .route("/accept-request", post(accept_request))
        .route("/reject-request", delete(reject_request))
        .route("/unfollow", delete(unfollow))
        .route("/listFollowers/{user_id}", get(list_followers))
        .route("/listFollowing/{user_id}", get(list_following))
        .route("/friend-requests", get(friend_requests))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    pub friend_id: String,
}

async fn send_request(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<FriendRequest>,
) -> AppResult<ApiResponse<follow::Model>> {
    let edge = state
        .follow_service
        .send_request(&identity.user_id, &req.friend_id)
        .await?;
    Ok(ApiResponse::created(edge).with_message("Friend request sent"))
}

async fn accept_request(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<FriendRequest>,
) -> AppResult<ApiResponse<()>> {
    let requester = state
        .follow_service
        .accept(&identity.user_id, &req.friend_id)
        .await?;
    Ok(ApiResponse::message(format!(
        "{} can now see your points",
        requester.username
    )))
}

async fn reject_request(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<FriendRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .follow_service
        .reject(&identity.user_id, &req.friend_id)
        .await?;
    Ok(ApiResponse::message("Friend request rejected"))
}

async fn unfollow(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<FriendRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .follow_service
        .unfollow(&identity.user_id, &req.friend_id)
        .await?;
    Ok(ApiResponse::message("Unfollowed"))
}

async fn list_followers(
    AuthUser(_identity): AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<ApiResponse<Vec<FollowListEntry>>> {
    Ok(ApiResponse::ok(
        state.follow_service.followers(&user_id).await?,
    ))
}

async fn list_following(
    AuthUser(_identity): AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<ApiResponse<Vec<FollowListEntry>>> {
    Ok(ApiResponse::ok(
        state.follow_service.following(&user_id).await?,
    ))
}

async fn friend_requests(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<FollowRequestEntry>>> {
    Ok(ApiResponse::ok(
        state
            .follow_service
            .pending_requests(&identity.user_id)
            .await?,
    ))
}
