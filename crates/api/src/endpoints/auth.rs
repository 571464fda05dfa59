//! Authentication endpoints.

use axum::{Json, Router, extract::State, routing::post};
use mappoint_common::AppResult;
use mappoint_core::RegisterInput;
use mappoint_db::entities::user::Gender;
use serde::{Deserialize, Serialize};

use crate::{middleware::AppState, response::ApiResponse};

/// Create auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/google", post(google))
        .route("/request-password-reset", post(request_password_reset))
        .route("/reset-password", post(reset_password))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email_addresses: String,
    pub password: String,
    pub gender: Gender,
    pub profile_image: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email_addresses: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct GoogleRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetRequest {
    pub email_addresses: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleUser {
    pub id: String,
    pub email: String,
    pub username: String,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GoogleResponse {
    pub token: String,
    pub user: GoogleUser,
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<ApiResponse<TokenResponse>> {
    let token = state
        .auth_service
        .register(RegisterInput {
            username: req.username,
            email: req.email_addresses,
            password: req.password,
            gender: req.gender,
            profile_image: req.profile_image,
        })
        .await?;

    Ok(ApiResponse::created(TokenResponse { token }).with_message("User registered successfully"))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<ApiResponse<TokenResponse>> {
    let token = state
        .auth_service
        .login(&req.email_addresses, &req.password)
        .await?;
    Ok(ApiResponse::ok(TokenResponse { token }))
}

async fn google(
    State(state): State<AppState>,
    Json(req): Json<GoogleRequest>,
) -> AppResult<ApiResponse<GoogleResponse>> {
    let login = state.auth_service.google(&req.token).await?;
    Ok(ApiResponse::ok(GoogleResponse {
        token: login.token,
        user: GoogleUser {
            id: login.user.id,
            email: login.user.email,
            username: login.user.username,
            profile_picture: login.user.profile_image_url,
        },
    }))
}

async fn request_password_reset(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .auth_service
        .request_password_reset(&req.email_addresses)
        .await?;
    Ok(ApiResponse::message(
        "If an account exists for this address, a reset link has been sent",
    ))
}

async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .auth_service
        .reset_password(&req.token, &req.new_password, &req.confirm_password)
        .await?;
    Ok(ApiResponse::message("Password has been reset"))
}
