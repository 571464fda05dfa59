//! Notification endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, patch},
};
use mappoint_common::AppResult;
use mappoint_core::{NotificationItem, NotifyOutcome};
use mappoint_db::entities::notification::{self, NotificationType};
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse, sse};

/// Create notifications router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications).post(create_notification))
        .route("/unread-count", get(unread_count))
        .route("/read", patch(mark_all_as_read))
        .route("/{id}/read", patch(mark_as_read))
        .route("/{id}", delete(delete_notification))
        .merge(sse::router())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    pub receiver_user_id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct MarkedResponse {
    pub updated: u64,
}

async fn list_notifications(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<NotificationItem>>> {
    Ok(ApiResponse::ok(
        state.notification_service.list(&identity.user_id).await?,
    ))
}

async fn create_notification(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateNotificationRequest>,
) -> AppResult<ApiResponse<Option<notification::Model>>> {
    let outcome = state
        .notification_service
        .create(
            &identity.user_id,
            &req.receiver_user_id,
            req.notification_type,
            req.content,
        )
        .await?;

    Ok(match outcome {
        NotifyOutcome::Inserted(model) => {
            ApiResponse::created(Some(model)).with_message("Notification created")
        }
        NotifyOutcome::Updated(model) => {
            ApiResponse::ok(Some(model)).with_message("Notification updated")
        }
        NotifyOutcome::Unchanged => {
            ApiResponse::ok(None).with_message("Notification already exists")
        }
    })
}

async fn unread_count(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<UnreadCountResponse>> {
    let count = state
        .notification_service
        .unread_count(&identity.user_id)
        .await?;
    Ok(ApiResponse::ok(UnreadCountResponse { count }))
}

async fn mark_as_read(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state
        .notification_service
        .mark_as_read(&id, &identity.user_id)
        .await?;
    Ok(ApiResponse::message("Notification marked as read"))
}

async fn mark_all_as_read(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<MarkedResponse>> {
    let updated = state
        .notification_service
        .mark_all_as_read(&identity.user_id)
        .await?;
    Ok(ApiResponse::ok(MarkedResponse { updated }))
}

async fn delete_notification(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state
        .notification_service
        .delete(&id, &identity.user_id)
        .await?;
    Ok(ApiResponse::message("Notification deleted"))
}
