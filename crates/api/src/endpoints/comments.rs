//! Marker comment endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use mappoint_common::AppResult;
use mappoint_core::{CommentView, CreateCommentInput, UpdateCommentInput};
use mappoint_db::entities::marker_comment;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Create comment router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_comment).put(update_comment))
        // Marker id on GET, comment id on DELETE.
        .route("/{id}", get(list_comments).delete(delete_comment))
}

async fn create_comment(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateCommentInput>,
) -> AppResult<ApiResponse<marker_comment::Model>> {
    let comment = state
        .comment_service
        .create(&identity.viewer(), req)
        .await?;
    Ok(ApiResponse::created(comment).with_message("Comment added successfully"))
}

async fn update_comment(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateCommentInput>,
) -> AppResult<ApiResponse<marker_comment::Model>> {
    let comment = state
        .comment_service
        .update(&identity.user_id, req)
        .await?;
    Ok(ApiResponse::ok(comment).with_message("Comment updated successfully"))
}

async fn list_comments(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(marker_id): Path<String>,
) -> AppResult<ApiResponse<Vec<CommentView>>> {
    state
        .marker_service
        .find_visible(&identity.viewer(), &marker_id)
        .await?;
    Ok(ApiResponse::ok(state.comment_service.list(&marker_id).await?))
}

async fn delete_comment(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state
        .comment_service
        .delete(&identity.user_id, &comment_id)
        .await?;
    Ok(ApiResponse::message("Comment deleted successfully"))
}
