//! Marker comment repository.

use std::sync::Arc;

use crate::entities::{MarkerComment, User, marker_comment, user};
use mappoint_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

/// Marker comment repository for database operations.
#[derive(Clone)]
pub struct MarkerCommentRepository {
    db: Arc<DatabaseConnection>,
}

impl MarkerCommentRepository {
    /// Create a new marker comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a comment by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<marker_comment::Model>> {
        MarkerComment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the comment a user left on a marker.
    pub async fn find_by_marker_and_user(
        &self,
        marker_id: &str,
        user_id: &str,
    ) -> AppResult<Option<marker_comment::Model>> {
        MarkerComment::find()
            .filter(marker_comment::Column::MarkerId.eq(marker_id))
            .filter(marker_comment::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Comments of a marker with their authors, newest first.
    pub async fn find_by_marker_with_authors(
        &self,
        marker_id: &str,
    ) -> AppResult<Vec<(marker_comment::Model, Option<user::Model>)>> {
        MarkerComment::find()
            .filter(marker_comment::Column::MarkerId.eq(marker_id))
            .find_also_related(User)
            .order_by_desc(marker_comment::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Comments of several markers.
    pub async fn find_by_markers(
        &self,
        marker_ids: &[String],
    ) -> AppResult<Vec<marker_comment::Model>> {
        if marker_ids.is_empty() {
            return Ok(vec![]);
        }

        MarkerComment::find()
            .filter(marker_comment::Column::MarkerId.is_in(marker_ids.iter().cloned()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a comment. A duplicate (marker, user) pair maps to `Conflict`.
    pub async fn create(
        &self,
        model: marker_comment::ActiveModel,
    ) -> AppResult<marker_comment::Model> {
        model.insert(self.db.as_ref()).await.map_err(AppError::from)
    }

    /// Update a comment.
    pub async fn update(
        &self,
        model: marker_comment::ActiveModel,
    ) -> AppResult<marker_comment::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a comment.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        MarkerComment::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Count all comments.
    pub async fn count(&self) -> AppResult<u64> {
        MarkerComment::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_comment(id: &str, marker_id: &str, user_id: &str) -> marker_comment::Model {
        marker_comment::Model {
            id: id.to_string(),
            marker_id: marker_id.to_string(),
            user_id: user_id.to_string(),
            comment: "Lovely spot".to_string(),
            rating: 4,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_marker_and_user() {
        let comment = create_test_comment("c1", "m1", "user1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[comment.clone()]])
                .append_query_results([Vec::<marker_comment::Model>::new()])
                .into_connection(),
        );

        let repo = MarkerCommentRepository::new(db);
        assert_eq!(
            repo.find_by_marker_and_user("m1", "user1").await.unwrap(),
            Some(comment)
        );
        assert!(
            repo.find_by_marker_and_user("m1", "user2")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_find_by_markers() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    create_test_comment("c1", "m1", "user1"),
                    create_test_comment("c2", "m1", "user2"),
                ]])
                .into_connection(),
        );

        let repo = MarkerCommentRepository::new(db);
        let result = repo.find_by_markers(&["m1".to_string()]).await.unwrap();

        assert_eq!(result.len(), 2);
    }
}
