//! User endpoints.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, put},
};
use mappoint_common::AppResult;
use mappoint_core::{ChangePasswordInput, UpdateUserInput, UserSummary};
use mappoint_db::entities::user::{self, ConnectionType, Gender, UserRole};
use serde::Serialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Create user router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(me).delete(delete_account))
        .route("/all", get(all_users))
        .route("/all-except-current", get(all_except_current))
        .route("/update", put(update_profile))
        .route("/change-password", put(change_password))
}

/// Profile of the calling user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub gender: Gender,
    pub profile_image: Option<String>,
    pub role: UserRole,
    pub connection_type: ConnectionType,
}

impl From<user::Model> for ProfileResponse {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            gender: user.gender,
            profile_image: user.profile_image_url,
            role: user.role,
            connection_type: user.connection_type,
        }
    }
}

async fn me(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<ProfileResponse>> {
    let user = state.user_service.get(&identity.user_id).await?;
    Ok(ApiResponse::ok(user.into()))
}

async fn all_users(
    AuthUser(_identity): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<UserSummary>>> {
    Ok(ApiResponse::ok(state.user_service.all().await?))
}

async fn all_except_current(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<UserSummary>>> {
    Ok(ApiResponse::ok(
        state.user_service.all_except(&identity.user_id).await?,
    ))
}

async fn update_profile(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateUserInput>,
) -> AppResult<ApiResponse<ProfileResponse>> {
    let user = state.user_service.update(&identity.user_id, req).await?;
    Ok(ApiResponse::ok(ProfileResponse::from(user)).with_message("Profile updated"))
}

async fn change_password(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ChangePasswordInput>,
) -> AppResult<ApiResponse<()>> {
    state
        .user_service
        .change_password(&identity.user_id, req)
        .await?;
    Ok(ApiResponse::message("Password changed successfully"))
}

async fn delete_account(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<()>> {
    state.user_service.delete(&identity.user_id).await?;
    Ok(ApiResponse::message("Account deleted"))
}
