//! Marker rating repository.

use std::sync::Arc;

use crate::entities::{MarkerRating, RatingLabel, marker_rating, rating_label};
use mappoint_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, sea_query::OnConflict,
};

/// Marker rating repository for database operations.
#[derive(Clone)]
pub struct MarkerRatingRepository {
    db: Arc<DatabaseConnection>,
}

impl MarkerRatingRepository {
    /// Create a new marker rating repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Ratings of several markers together with their labels.
    pub async fn find_with_labels(
        &self,
        marker_ids: &[String],
    ) -> AppResult<Vec<(marker_rating::Model, Option<rating_label::Model>)>> {
        if marker_ids.is_empty() {
            return Ok(vec![]);
        }

        MarkerRating::find()
            .filter(marker_rating::Column::MarkerId.is_in(marker_ids.iter().cloned()))
            .find_also_related(RatingLabel)
            .order_by_asc(marker_rating::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert or replace the score of `(marker_id, label_id)`.
    pub async fn upsert_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: String,
        marker_id: &str,
        label_id: &str,
        rating: i32,
    ) -> AppResult<()> {
        let now = chrono::Utc::now();
        let model = marker_rating::ActiveModel {
            id: Set(id),
            marker_id: Set(marker_id.to_string()),
            label_id: Set(label_id.to_string()),
            rating: Set(rating),
            created_at: Set(now.into()),
            updated_at: Set(Some(now.into())),
        };

        MarkerRating::insert(model)
            .on_conflict(
                OnConflict::columns([
                    marker_rating::Column::MarkerId,
                    marker_rating::Column::LabelId,
                ])
                .update_columns([marker_rating::Column::Rating, marker_rating::Column::UpdatedAt])
                .to_owned(),
            )
            .exec_without_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Count all ratings.
    pub async fn count(&self) -> AppResult<u64> {
        MarkerRating::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn test_upsert_in_targets_marker_label_pair() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = MarkerRatingRepository::new(db.clone());
        repo.upsert_in(db.as_ref(), "r1".to_string(), "m1", "l1", 4)
            .await
            .unwrap();

        drop(repo);
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert_eq!(log.len(), 1);
        let sql = format!("{log:?}");
        assert!(sql.contains(r#"INSERT INTO \"marker_ratings\""#));
        assert!(sql.contains(r#"ON CONFLICT (\"marker_id\", \"label_id\") DO UPDATE"#));
        assert!(sql.contains(r#"\"rating\" = \"excluded\".\"rating\""#));
    }

    #[tokio::test]
    async fn test_find_with_labels_empty_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = MarkerRatingRepository::new(db);
        assert!(repo.find_with_labels(&[]).await.unwrap().is_empty());
    }
}
