//! Push token endpoints.

use axum::{Json, Router, extract::State, routing::post};
use mappoint_common::AppResult;
use mappoint_core::RegisteredToken;
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AdminUser, AuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// Create push router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/add-token", post(add_token))
        .route("/save-token", post(save_token))
        .route("/link-push-user", post(save_token).delete(unlink_token))
        .route("/send-notification", post(send_notification))
        .route("/send-to-users", post(send_to_users))
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendToUsersRequest {
    pub title: String,
    pub body: String,
    pub target_user_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SentResponse {
    pub sent: usize,
}

/// Public: devices register before anyone signs in.
async fn add_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> AppResult<ApiResponse<RegisteredToken>> {
    let registered = state.push_service.add_token(&req.token).await?;
    Ok(if registered.created {
        ApiResponse::created(registered)
    } else {
        ApiResponse::ok(registered).with_message("Token already registered")
    })
}

async fn save_token(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> AppResult<ApiResponse<RegisteredToken>> {
    let registered = state
        .push_service
        .link(&identity.user_id, &req.token)
        .await?;
    Ok(ApiResponse::ok(registered).with_message("Token linked to user"))
}

async fn unlink_token(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .push_service
        .unlink(&identity.user_id, &req.token)
        .await?;
    Ok(ApiResponse::message("Token unlinked from user"))
}

async fn send_notification(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<SendRequest>,
) -> AppResult<ApiResponse<SentResponse>> {
    let sent = state
        .push_service
        .send_to_user(&identity.user_id, &req.title, &req.body)
        .await?;
    Ok(ApiResponse::ok(SentResponse { sent }))
}

async fn send_to_users(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<SendToUsersRequest>,
) -> AppResult<ApiResponse<SentResponse>> {
    let sent = state
        .push_service
        .send_to_users(&req.target_user_ids, &req.title, &req.body)
        .await?;
    Ok(ApiResponse::ok(SentResponse { sent }))
}
