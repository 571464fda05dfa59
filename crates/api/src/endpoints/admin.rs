//! Admin endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use chrono::{Datelike, Utc};
use mappoint_common::AppResult;
use mappoint_core::{MarkerView, StatsOverview, parse_enum};
use mappoint_db::{
    entities::{
        marker::{MarkerType, Visibility},
        user::UserRole,
    },
    repositories::{ConnectionTypeCount, MarkerTypeCount, MonthlyActiveCount},
};
use serde::{Deserialize, Serialize};

use crate::{
    endpoints::users::ProfileResponse, extractors::AdminUser, middleware::AppState,
    response::ApiResponse,
};

/// Create admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/markers", get(list_markers))
        .route("/markers/blocked", put(set_blocked))
        .route("/rating-labels", post(add_rating_labels))
        .route("/users/{id}/role", put(set_role))
        .route("/stats/overview", get(overview))
        .route("/stats/markers-by-type", get(markers_by_type))
        .route("/stats/users-by-connection", get(users_by_connection))
        .route("/stats/active-users", get(active_users))
}

#[derive(Debug, Deserialize)]
pub struct MarkersQuery {
    pub visibility: Option<String>,
    #[serde(rename = "type")]
    pub types: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRequest {
    pub marker_id: String,
    pub blocked: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingLabelsRequest {
    pub marker_type: MarkerType,
    pub labels: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct InsertedResponse {
    pub inserted: usize,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct YearQuery {
    pub year: Option<i32>,
}

impl MarkersQuery {
    fn visibility(&self) -> AppResult<Option<Visibility>> {
        match self.visibility.as_deref().map(str::trim) {
            None | Some("" | "all") => Ok(None),
            Some(raw) => parse_enum("visibility", raw).map(Some),
        }
    }

    fn types(&self) -> AppResult<Vec<MarkerType>> {
        self.types
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| parse_enum("type", t))
            .collect()
    }
}

async fn list_markers(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Query(query): Query<MarkersQuery>,
) -> AppResult<ApiResponse<Vec<MarkerView>>> {
    let markers = state
        .admin_service
        .markers(query.visibility()?, &query.types()?)
        .await?;
    Ok(ApiResponse::ok(markers))
}

async fn set_blocked(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<BlockRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .admin_service
        .set_blocked(&req.marker_id, req.blocked)
        .await?;
    Ok(ApiResponse::message(if req.blocked {
        "Marker blocked"
    } else {
        "Marker unblocked"
    }))
}

async fn add_rating_labels(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<RatingLabelsRequest>,
) -> AppResult<ApiResponse<InsertedResponse>> {
    let inserted = state
        .admin_service
        .add_labels(req.marker_type, &req.labels)
        .await?;
    Ok(ApiResponse::created(InsertedResponse { inserted }))
}

async fn set_role(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RoleRequest>,
) -> AppResult<ApiResponse<ProfileResponse>> {
    let user = state.admin_service.set_role(&id, req.role).await?;
    Ok(ApiResponse::ok(user.into()))
}

async fn overview(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<StatsOverview>> {
    Ok(ApiResponse::ok(state.admin_service.overview().await?))
}

async fn markers_by_type(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<MarkerTypeCount>>> {
    Ok(ApiResponse::ok(state.admin_service.markers_by_type().await?))
}

async fn users_by_connection(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<ConnectionTypeCount>>> {
    Ok(ApiResponse::ok(
        state.admin_service.users_by_connection().await?,
    ))
}

async fn active_users(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Query(query): Query<YearQuery>,
) -> AppResult<ApiResponse<Vec<MonthlyActiveCount>>> {
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    Ok(ApiResponse::ok(
        state.admin_service.active_users(year).await?,
    ))
}
