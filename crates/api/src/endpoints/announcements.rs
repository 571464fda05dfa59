//! Announcement endpoints.

use axum::{
    Router,
    extract::{Multipart, Path, State},
    routing::{get, post, put},
};
use mappoint_common::{AppError, AppResult};
use mappoint_core::{AnnouncementSummary, markdown_from_bytes};
use mappoint_db::entities::announcement;

use crate::{
    extractors::{AdminUser, AuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// Create announcement router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_announcements))
        .route("/add", post(create_announcement))
        .route("/update/{id}", put(update_announcement))
        .route("/{id}", get(get_announcement).delete(delete_announcement))
}

/// `title` text field plus an optional markdown `file`.
struct AnnouncementForm {
    title: String,
    content: Option<String>,
}

impl AnnouncementForm {
    async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut title = None;
        let mut content = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            match field.name().unwrap_or("") {
                "title" => {
                    title = Some(
                        field
                            .text()
                            .await
                            .map_err(|e| AppError::BadRequest(e.to_string()))?,
                    );
                }
                "file" => {
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                    content = Some(markdown_from_bytes(data.to_vec())?);
                }
                _ => {}
            }
        }

        Ok(Self {
            title: title.ok_or_else(|| AppError::Validation("title is required".to_string()))?,
            content,
        })
    }
}

async fn create_announcement(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<ApiResponse<announcement::Model>> {
    let form = AnnouncementForm::read(multipart).await?;
    let content = form
        .content
        .ok_or_else(|| AppError::Validation("A markdown file is required".to_string()))?;
    let created = state
        .announcement_service
        .create(&admin.user_id, &form.title, content)
        .await?;
    Ok(ApiResponse::created(created).with_message("Announcement published"))
}

async fn list_announcements(
    AuthUser(_identity): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<AnnouncementSummary>>> {
    Ok(ApiResponse::ok(state.announcement_service.list().await?))
}

async fn get_announcement(
    AuthUser(_identity): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<announcement::Model>> {
    Ok(ApiResponse::ok(state.announcement_service.get(&id).await?))
}

async fn update_announcement(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<ApiResponse<announcement::Model>> {
    let form = AnnouncementForm::read(multipart).await?;
    let updated = state
        .announcement_service
        .update(&id, &form.title, form.content)
        .await?;
    Ok(ApiResponse::ok(updated).with_message("Announcement updated"))
}

async fn delete_announcement(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state
        .announcement_service
        .delete(&admin.user_id, &id)
        .await?;
    Ok(ApiResponse::message("Announcement deleted"))
}
