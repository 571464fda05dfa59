//! Marker endpoints.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use mappoint_common::{AppError, AppResult};
use mappoint_core::{MarkerInput, MarkerView, RatingInput, UploadedImage, VisibilityScope, parse_enum};
use mappoint_db::entities::{
    marker::{self, MarkerType},
    rating_label,
};
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Create marker router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_markers))
        .route("/create", post(create_marker))
        .route("/user", get(my_markers))
        .route("/user/{user_id}", get(user_markers))
        .route("/labels/{marker_type}", get(labels))
        .route("/update/{id}", put(update_marker))
        .route("/delete/{id}", delete(delete_marker))
        .route("/{id}", get(get_marker))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub visibility: Option<String>,
}

/// Text fields and files of a marker form.
#[derive(Debug, Default)]
struct MarkerForm {
    title: Option<String>,
    description: Option<String>,
    latitude: Option<String>,
    longitude: Option<String>,
    marker_type: Option<String>,
    visibility: Option<String>,
    comment: Option<String>,
    ratings: RatingInput,
    images: Vec<UploadedImage>,
}

fn required(value: Option<String>, field: &str) -> AppResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Validation(format!("{field} is required")))
}

fn coordinate(value: Option<String>, field: &str) -> AppResult<f64> {
    required(value, field)?
        .trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("{field} must be a number")))
}

impl MarkerForm {
    async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or("").to_string();

            if name == "images" {
                let file_name = field.file_name().unwrap_or("image").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?
                    .to_vec();
                if !data.is_empty() {
                    form.images.push(UploadedImage {
                        file_name,
                        content_type,
                        data,
                    });
                }
                continue;
            }

            let text = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;

            match name.as_str() {
                "title" => form.title = Some(text),
                "description" => form.description = Some(text),
                "latitude" => form.latitude = Some(text),
                "longitude" => form.longitude = Some(text),
                "type" => form.marker_type = Some(text),
                "visibility" => form.visibility = Some(text),
                "comment" => form.comment = Some(text),
                "ratings" => form.ratings.extend(RatingInput::from_json_str(&text)),
                other => {
                    if let Some(label) = other
                        .strip_prefix("ratings[")
                        .and_then(|rest| rest.strip_suffix(']'))
                    {
                        form.ratings.push(label, text);
                    }
                }
            }
        }

        Ok(form)
    }

    fn into_input(self) -> AppResult<(MarkerInput, Vec<UploadedImage>)> {
        let input = MarkerInput {
            title: required(self.title, "title")?,
            description: self.description,
            latitude: coordinate(self.latitude, "latitude")?,
            longitude: coordinate(self.longitude, "longitude")?,
            marker_type: parse_enum("type", &required(self.marker_type, "type")?)?,
            visibility: parse_enum("visibility", &required(self.visibility, "visibility")?)?,
            comment: self.comment,
            ratings: self.ratings,
        };
        Ok((input, self.images))
    }
}

/// Body of a successful create: the usual envelope plus a top-level `markerId`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerCreated {
    status: &'static str,
    message: &'static str,
    marker_id: String,
    data: marker::Model,
}

impl IntoResponse for MarkerCreated {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(self)).into_response()
    }
}

async fn create_marker(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<MarkerCreated> {
    let (input, images) = MarkerForm::read(multipart).await?.into_input()?;
    let created = state
        .marker_service
        .create(&identity.user_id, input, images)
        .await?;
    Ok(MarkerCreated {
        status: "success",
        message: "Marker created successfully",
        marker_id: created.id.clone(),
        data: created,
    })
}

async fn list_markers(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Vec<MarkerView>>> {
    let scope: VisibilityScope = query.visibility.unwrap_or_default().parse()?;
    let markers = state
        .marker_service
        .list(&identity.viewer(), scope)
        .await?;
    Ok(ApiResponse::ok(markers))
}

async fn get_marker(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<MarkerView>> {
    let marker = state.marker_service.get(&identity.viewer(), &id).await?;
    Ok(ApiResponse::ok(marker))
}

async fn my_markers(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<MarkerView>>> {
    let markers = state
        .marker_service
        .list_by_owner(&identity.viewer(), &identity.user_id)
        .await?;
    Ok(ApiResponse::ok(markers))
}

async fn user_markers(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<ApiResponse<Vec<MarkerView>>> {
    let markers = state
        .marker_service
        .list_by_owner(&identity.viewer(), &user_id)
        .await?;
    Ok(ApiResponse::ok(markers))
}

async fn labels(
    AuthUser(_identity): AuthUser,
    State(state): State<AppState>,
    Path(marker_type): Path<String>,
) -> AppResult<ApiResponse<Vec<rating_label::Model>>> {
    let marker_type: MarkerType = parse_enum("type", &marker_type)?;
    Ok(ApiResponse::ok(
        state.marker_service.labels(marker_type).await?,
    ))
}

async fn update_marker(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<ApiResponse<marker::Model>> {
    let (input, images) = MarkerForm::read(multipart).await?.into_input()?;
    let updated = state
        .marker_service
        .update(&identity.user_id, &id, input, images)
        .await?;
    Ok(ApiResponse::ok(updated).with_message("Marker updated successfully"))
}

async fn delete_marker(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.marker_service.delete(&identity.user_id, &id).await?;
    Ok(ApiResponse::message("Marker deleted successfully"))
}
