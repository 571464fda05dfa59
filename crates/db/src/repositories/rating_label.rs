//! Rating label repository.

use std::sync::Arc;

use crate::entities::{RatingLabel, marker::MarkerType, rating_label};
use mappoint_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};

/// Rating label repository for database operations.
#[derive(Clone)]
pub struct RatingLabelRepository {
    db: Arc<DatabaseConnection>,
}

impl RatingLabelRepository {
    /// Create a new rating label repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Underlying connection, for opening transactions.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    /// Label catalog of a marker type.
    pub async fn find_by_type(&self, marker_type: MarkerType) -> AppResult<Vec<rating_label::Model>> {
        self.find_by_type_in(self.db.as_ref(), marker_type).await
    }

    /// Label catalog of a marker type on the given connection.
    pub async fn find_by_type_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        marker_type: MarkerType,
    ) -> AppResult<Vec<rating_label::Model>> {
        RatingLabel::find()
            .filter(rating_label::Column::MarkerType.eq(marker_type))
            .order_by_asc(rating_label::Column::Label)
            .all(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a label on the given connection.
    pub async fn create_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: rating_label::ActiveModel,
    ) -> AppResult<rating_label::Model> {
        model.insert(conn).await.map_err(AppError::from)
    }
}
