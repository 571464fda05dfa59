//! Marker image repository.

use std::sync::Arc;

use crate::entities::{MarkerImage, marker_image};
use mappoint_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

/// Marker image repository for database operations.
#[derive(Clone)]
pub struct MarkerImageRepository {
    db: Arc<DatabaseConnection>,
}

impl MarkerImageRepository {
    /// Create a new marker image repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Images of one marker.
    pub async fn find_by_marker(&self, marker_id: &str) -> AppResult<Vec<marker_image::Model>> {
        MarkerImage::find()
            .filter(marker_image::Column::MarkerId.eq(marker_id))
            .order_by_asc(marker_image::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Images of several markers in one round-trip.
    pub async fn find_by_markers(
        &self,
        marker_ids: &[String],
    ) -> AppResult<Vec<marker_image::Model>> {
        if marker_ids.is_empty() {
            return Ok(vec![]);
        }

        MarkerImage::find()
            .filter(marker_image::Column::MarkerId.is_in(marker_ids.iter().cloned()))
            .order_by_asc(marker_image::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert image rows on the given connection.
    pub async fn create_many_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        models: Vec<marker_image::ActiveModel>,
    ) -> AppResult<()> {
        if models.is_empty() {
            return Ok(());
        }

        MarkerImage::insert_many(models)
            .exec_without_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete image rows by ID on the given connection.
    pub async fn delete_many_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        ids: &[String],
    ) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = MarkerImage::delete_many()
            .filter(marker_image::Column::Id.is_in(ids.iter().cloned()))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Set};

    fn create_test_image(id: &str, marker_id: &str) -> marker_image::Model {
        marker_image::Model {
            id: id.to_string(),
            marker_id: marker_id.to_string(),
            user_id: "user1".to_string(),
            image_url: format!("https://img.example.com/{id}.jpg"),
            public_id: format!("markers/{id}"),
            original_name: format!("{id}.jpg"),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_markers() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    create_test_image("i1", "m1"),
                    create_test_image("i2", "m2"),
                ]])
                .into_connection(),
        );

        let repo = MarkerImageRepository::new(db);
        let result = repo
            .find_by_markers(&["m1".to_string(), "m2".to_string()])
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn test_find_by_markers_empty_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = MarkerImageRepository::new(db);
        assert!(repo.find_by_markers(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_many_in() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 2,
                }])
                .into_connection(),
        );

        let repo = MarkerImageRepository::new(db.clone());
        let models = ["i1", "i2"]
            .iter()
            .map(|id| marker_image::ActiveModel {
                id: Set((*id).to_string()),
                marker_id: Set("m1".to_string()),
                user_id: Set("user1".to_string()),
                image_url: Set(format!("https://img.example.com/{id}.jpg")),
                public_id: Set(format!("markers/{id}")),
                original_name: Set(format!("{id}.jpg")),
                created_at: Set(Utc::now().into()),
            })
            .collect();

        repo.create_many_in(db.as_ref(), models).await.unwrap();
    }
}
