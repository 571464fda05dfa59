//! Notification repository.

use std::sync::Arc;

use crate::entities::{Notification, notification, notification::NotificationType};
use mappoint_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set, sea_query::Expr,
};

/// Notification repository for database operations.
#[derive(Clone)]
pub struct NotificationRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationRepository {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the notification identified by the dedup key.
    pub async fn find_by_key(
        &self,
        receiver_id: &str,
        sender_id: &str,
        notification_type: NotificationType,
    ) -> AppResult<Option<notification::Model>> {
        Notification::find()
            .filter(notification::Column::ReceiverId.eq(receiver_id))
            .filter(notification::Column::SenderId.eq(sender_id))
            .filter(notification::Column::NotificationType.eq(notification_type))
            .order_by_desc(notification::Column::CreatedAt)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a notification.
    pub async fn create(
        &self,
        model: notification::ActiveModel,
    ) -> AppResult<notification::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Replace the content of an existing notification and mark it unread.
    pub async fn update_content(
        &self,
        existing: notification::Model,
        content: Option<String>,
        event_id: Option<String>,
    ) -> AppResult<notification::Model> {
        let mut active = existing.into_active_model();
        active.content = Set(content);
        active.event_id = Set(event_id);
        active.is_read = Set(false);
        active.updated_at = Set(Some(chrono::Utc::now().into()));
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Notifications of a receiver, newest first.
    pub async fn find_by_receiver(&self, receiver_id: &str) -> AppResult<Vec<notification::Model>> {
        Notification::find()
            .filter(notification::Column::ReceiverId.eq(receiver_id))
            .order_by_desc(notification::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark one notification read. Returns `false` when the receiver does not own it.
    pub async fn mark_as_read(&self, id: &str, receiver_id: &str) -> AppResult<bool> {
        let result = Notification::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .filter(notification::Column::Id.eq(id))
            .filter(notification::Column::ReceiverId.eq(receiver_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Mark all notifications of a receiver read.
    pub async fn mark_all_as_read(&self, receiver_id: &str) -> AppResult<u64> {
        let result = Notification::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .filter(notification::Column::ReceiverId.eq(receiver_id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Delete one notification. Returns `false` when the receiver does not own it.
    pub async fn delete(&self, id: &str, receiver_id: &str) -> AppResult<bool> {
        let result = Notification::delete_many()
            .filter(notification::Column::Id.eq(id))
            .filter(notification::Column::ReceiverId.eq(receiver_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Delete everything a user sent or received.
    pub async fn delete_all_for_user_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
    ) -> AppResult<u64> {
        let result = Notification::delete_many()
            .filter(
                Condition::any()
                    .add(notification::Column::ReceiverId.eq(user_id))
                    .add(notification::Column::SenderId.eq(user_id)),
            )
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Count unread notifications.
    pub async fn count_unread(&self, receiver_id: &str) -> AppResult<u64> {
        Notification::find()
            .filter(notification::Column::ReceiverId.eq(receiver_id))
            .filter(notification::Column::IsRead.eq(false))
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
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_notification(id: &str, receiver_id: &str) -> notification::Model {
        notification::Model {
            id: id.to_string(),
            receiver_id: receiver_id.to_string(),
            sender_id: "sender1".to_string(),
            notification_type: NotificationType::FollowRequest,
            content: Some("hi".to_string()),
            is_read: false,
            event_id: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_key() {
        let n = create_test_notification("n1", "user1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[n.clone()]])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        let result = repo
            .find_by_key("user1", "sender1", NotificationType::FollowRequest)
            .await
            .unwrap();

        assert_eq!(result, Some(n));
    }

    #[tokio::test]
    async fn test_update_content_marks_unread() {
        let mut n = create_test_notification("n1", "user1");
        n.is_read = true;
        let mut updated = n.clone();
        updated.content = Some("new".to_string());
        updated.is_read = false;

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[updated]])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        let result = repo
            .update_content(n, Some("new".to_string()), None)
            .await
            .unwrap();

        assert_eq!(result.content.as_deref(), Some("new"));
        assert!(!result.is_read);
    }

    #[tokio::test]
    async fn test_mark_as_read_foreign_notification() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        assert!(!repo.mark_as_read("n1", "intruder").await.unwrap());
    }

    #[tokio::test]
    async fn test_count_unread() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(3))
                }]])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        assert_eq!(repo.count_unread("user1").await.unwrap(), 3);
    }
}
