//! Marker repository.

use std::sync::Arc;

use crate::entities::{Marker, marker};
use mappoint_common::{AppError, AppResult};
use serde::Serialize;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

/// Markers per place category.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct MarkerTypeCount {
    pub marker_type: marker::MarkerType,
    pub count: i64,
}

/// Marker repository for database operations.
#[derive(Clone)]
pub struct MarkerRepository {
    db: Arc<DatabaseConnection>,
}

impl MarkerRepository {
    /// Create a new marker repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Underlying connection, for opening transactions.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    /// Find a marker by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<marker::Model>> {
        Marker::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a marker by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<marker::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::MarkerNotFound(id.to_string()))
    }

    /// Find markers matching a condition, newest first.
    pub async fn find_matching(&self, condition: Condition) -> AppResult<Vec<marker::Model>> {
        Marker::find()
            .filter(condition)
            .order_by_desc(marker::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Moderation listing: optional visibility and type filters, blocked included.
    pub async fn find_for_moderation(
        &self,
        visibility: Option<marker::Visibility>,
        types: &[marker::MarkerType],
    ) -> AppResult<Vec<marker::Model>> {
        let mut condition = Condition::all();
        if let Some(visibility) = visibility {
            condition = condition.add(marker::Column::Visibility.eq(visibility));
        }
        if !types.is_empty() {
            condition = condition.add(marker::Column::MarkerType.is_in(types.iter().copied()));
        }
        self.find_matching(condition).await
    }

    /// Insert a marker on the given connection.
    pub async fn create_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: marker::ActiveModel,
    ) -> AppResult<marker::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a marker on the given connection.
    pub async fn update_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: marker::ActiveModel,
    ) -> AppResult<marker::Model> {
        model
            .update(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Set the moderation flag. Returns `false` when the marker does not exist.
    pub async fn set_blocked(&self, id: &str, blocked: bool) -> AppResult<bool> {
        let result = Marker::update_many()
            .col_expr(marker::Column::Blocked, sea_orm::sea_query::Expr::value(blocked))
            .col_expr(
                marker::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now()),
            )
            .filter(marker::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Delete a marker. Images, ratings and comments cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Marker::delete(marker::ActiveModel {
            id: Set(id.to_string()),
            ..Default::default()
        })
        .exec(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Count all markers.
    pub async fn count(&self) -> AppResult<u64> {
        Marker::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count markers grouped by type.
    pub async fn count_by_type(&self) -> AppResult<Vec<MarkerTypeCount>> {
        Marker::find()
            .select_only()
            .column_as(marker::Column::MarkerType, "marker_type")
            .column_as(marker::Column::Id.count(), "count")
            .group_by(marker::Column::MarkerType)
            .order_by_asc(marker::Column::MarkerType)
            .into_model::<MarkerTypeCount>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
