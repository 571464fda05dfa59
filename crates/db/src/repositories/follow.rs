//! Follow repository.
//!
//! One row per directed edge; "followers of X" and "following of X" are the
//! two directional queries over the same table.

use std::sync::Arc;

use crate::entities::{Follow, follow, follow::FollowStatus};
use mappoint_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set,
};

/// Follow repository for database operations.
#[derive(Clone)]
pub struct FollowRepository {
    db: Arc<DatabaseConnection>,
}

impl FollowRepository {
    /// Create a new follow repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Underlying connection, for opening transactions.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    /// Find the edge `follower_id -> followee_id`.
    pub async fn find_by_pair(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> AppResult<Option<follow::Model>> {
        self.find_by_pair_in(self.db.as_ref(), follower_id, followee_id)
            .await
    }

    /// Find the edge `follower_id -> followee_id` on the given connection.
    pub async fn find_by_pair_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        follower_id: &str,
        followee_id: &str,
    ) -> AppResult<Option<follow::Model>> {
        Follow::find()
            .filter(follow::Column::FollowerId.eq(follower_id))
            .filter(follow::Column::FolloweeId.eq(followee_id))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check whether `follower_id` follows `followee_id` with an accepted edge.
    pub async fn is_following(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        Ok(self
            .find_by_pair(follower_id, followee_id)
            .await?
            .is_some_and(|edge| edge.status == FollowStatus::Accepted))
    }

    /// Insert a new edge.
    pub async fn create_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: follow::ActiveModel,
    ) -> AppResult<follow::Model> {
        model.insert(conn).await.map_err(AppError::from)
    }

    /// Move an edge to a new status.
    pub async fn set_status_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        edge: follow::Model,
        status: FollowStatus,
    ) -> AppResult<follow::Model> {
        let mut active = edge.into_active_model();
        active.status = Set(status);
        active.status_changed_at = Set(chrono::Utc::now().into());
        active
            .update(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete the edge `follower_id -> followee_id`. Returns rows removed.
    pub async fn delete_by_pair(&self, follower_id: &str, followee_id: &str) -> AppResult<u64> {
        let result = Follow::delete_many()
            .filter(follow::Column::FollowerId.eq(follower_id))
            .filter(follow::Column::FolloweeId.eq(followee_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Delete every edge touching a user, in either direction.
    pub async fn delete_all_for_user_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
    ) -> AppResult<u64> {
        let result = Follow::delete_many()
            .filter(
                Condition::any()
                    .add(follow::Column::FollowerId.eq(user_id))
                    .add(follow::Column::FolloweeId.eq(user_id)),
            )
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Edges pointing at `user_id` with the given status, newest first.
    pub async fn find_followers(
        &self,
        user_id: &str,
        status: FollowStatus,
    ) -> AppResult<Vec<follow::Model>> {
        Follow::find()
            .filter(follow::Column::FolloweeId.eq(user_id))
            .filter(follow::Column::Status.eq(status))
            .order_by_desc(follow::Column::StatusChangedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Edges leaving `user_id` with the given status, newest first.
    pub async fn find_following(
        &self,
        user_id: &str,
        status: FollowStatus,
    ) -> AppResult<Vec<follow::Model>> {
        Follow::find()
            .filter(follow::Column::FollowerId.eq(user_id))
            .filter(follow::Column::Status.eq(status))
            .order_by_desc(follow::Column::StatusChangedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Status of the edges from each of `follower_ids` to `followee_id`.
    pub async fn find_statuses_towards(
        &self,
        follower_ids: &[String],
        followee_id: &str,
    ) -> AppResult<Vec<follow::Model>> {
        if follower_ids.is_empty() {
            return Ok(vec![]);
        }

        Follow::find()
            .filter(follow::Column::FollowerId.is_in(follower_ids.iter().cloned()))
            .filter(follow::Column::FolloweeId.eq(followee_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_edge(
        id: &str,
        follower_id: &str,
        followee_id: &str,
        status: FollowStatus,
    ) -> follow::Model {
        follow::Model {
            id: id.to_string(),
            follower_id: follower_id.to_string(),
            followee_id: followee_id.to_string(),
            status,
            created_at: Utc::now().into(),
            status_changed_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_pair_found() {
        let edge = create_test_edge("f1", "user1", "user2", FollowStatus::Pending);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[edge.clone()]])
                .into_connection(),
        );

        let repo = FollowRepository::new(db);
        let result = repo.find_by_pair("user1", "user2").await.unwrap();

        assert_eq!(result, Some(edge));
    }

    #[tokio::test]
    async fn test_is_following_requires_accepted() {
        let pending = create_test_edge("f1", "user1", "user2", FollowStatus::Pending);
        let accepted = create_test_edge("f1", "user1", "user2", FollowStatus::Accepted);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[pending]])
                .append_query_results([[accepted]])
                .append_query_results([Vec::<follow::Model>::new()])
                .into_connection(),
        );

        let repo = FollowRepository::new(db);
        assert!(!repo.is_following("user1", "user2").await.unwrap());
        assert!(repo.is_following("user1", "user2").await.unwrap());
        assert!(!repo.is_following("user1", "user3").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_status_in() {
        let edge = create_test_edge("f1", "user1", "user2", FollowStatus::Pending);
        let accepted = create_test_edge("f1", "user1", "user2", FollowStatus::Accepted);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[accepted]])
                .into_connection(),
        );

        let repo = FollowRepository::new(db.clone());
        let result = repo
            .set_status_in(db.as_ref(), edge, FollowStatus::Accepted)
            .await
            .unwrap();

        assert_eq!(result.status, FollowStatus::Accepted);
    }

    #[tokio::test]
    async fn test_delete_by_pair_is_idempotent() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 0,
                    },
                ])
                .into_connection(),
        );

        let repo = FollowRepository::new(db);
        assert_eq!(repo.delete_by_pair("user1", "user2").await.unwrap(), 1);
        assert_eq!(repo.delete_by_pair("user1", "user2").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_followers() {
        let f1 = create_test_edge("f1", "user2", "user1", FollowStatus::Accepted);
        let f2 = create_test_edge("f2", "user3", "user1", FollowStatus::Accepted);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[f1, f2]])
                .into_connection(),
        );

        let repo = FollowRepository::new(db);
        let result = repo
            .find_followers("user1", FollowStatus::Accepted)
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|f| f.followee_id == "user1"));
    }
}
