//! Notification service.
//!
//! `notify_user` keeps at most one row per (receiver, sender, type);
//! `notify_followers` writes one row per follower and reports per-follower
//! outcomes instead of stopping at the first failure.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use futures::future::join_all;
use mappoint_common::{AppError, AppResult, IdGenerator};
use mappoint_db::{
    entities::{
        follow::FollowStatus,
        notification::{self, NotificationType},
    },
    repositories::{FollowRepository, NotificationRepository, UserRepository},
};
use sea_orm::Set;
use serde::Serialize;

use crate::services::notification_sink::{NotificationEvent, NotificationSinkService};

/// What `notify_user` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Inserted(notification::Model),
    Updated(notification::Model),
    /// An identical notification already existed.
    Unchanged,
}

/// Per-follower outcome counts of a fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FanOutReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Follow state from the sender towards the receiver, as shown next to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderFollowStatus {
    Accepted,
    Pending,
    Rejected,
    None,
}

impl From<Option<FollowStatus>> for SenderFollowStatus {
    fn from(status: Option<FollowStatus>) -> Self {
        match status {
            Some(FollowStatus::Accepted) => Self::Accepted,
            Some(FollowStatus::Pending) => Self::Pending,
            Some(FollowStatus::Rejected) => Self::Rejected,
            None => Self::None,
        }
    }
}

/// A notification with sender details, as listed to its receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationItem {
    pub id: String,
    pub sender_id: String,
    pub sender_username: Option<String>,
    pub sender_profile_image: Option<String>,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub content: Option<String>,
    pub is_read: bool,
    pub event_id: Option<String>,
    pub follow_status: SenderFollowStatus,
    pub created_at: DateTime<FixedOffset>,
}

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    follow_repo: FollowRepository,
    user_repo: UserRepository,
    sink: Option<NotificationSinkService>,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(
        notification_repo: NotificationRepository,
        follow_repo: FollowRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            notification_repo,
            follow_repo,
            user_repo,
            sink: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the real-time sink.
    pub fn set_sink(&mut self, sink: NotificationSinkService) {
        self.sink = Some(sink);
    }

    async fn push(&self, model: &notification::Model) {
        if let Some(ref sink) = self.sink
            && let Err(e) = sink.deliver(&NotificationEvent::from(model)).await
        {
            tracing::warn!(
                error = %e,
                receiver_id = %model.receiver_id,
                "Failed to push notification"
            );
        }
    }

    fn new_row(
        &self,
        sender_id: &str,
        receiver_id: &str,
        notification_type: NotificationType,
        content: Option<String>,
        event_id: Option<String>,
    ) -> notification::ActiveModel {
        notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            receiver_id: Set(receiver_id.to_string()),
            sender_id: Set(sender_id.to_string()),
            notification_type: Set(notification_type),
            content: Set(content),
            is_read: Set(false),
            event_id: Set(event_id),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        }
    }

    /// Notify one user, deduplicating by (receiver, sender, type).
    pub async fn notify_user(
        &self,
        sender_id: &str,
        receiver_id: &str,
        notification_type: NotificationType,
        content: Option<String>,
        event_id: Option<String>,
    ) -> AppResult<NotifyOutcome> {
        let existing = self
            .notification_repo
            .find_by_key(receiver_id, sender_id, notification_type)
            .await?;

        let outcome = match existing {
            Some(existing) if existing.content == content => {
                tracing::debug!(
                    notification_id = %existing.id,
                    "Identical notification already exists"
                );
                return Ok(NotifyOutcome::Unchanged);
            }
            Some(existing) => NotifyOutcome::Updated(
                self.notification_repo
                    .update_content(existing, content, event_id)
                    .await?,
            ),
            None => NotifyOutcome::Inserted(
                self.notification_repo
                    .create(self.new_row(
                        sender_id,
                        receiver_id,
                        notification_type,
                        content,
                        event_id,
                    ))
                    .await?,
            ),
        };

        if let NotifyOutcome::Inserted(ref model) | NotifyOutcome::Updated(ref model) = outcome {
            self.push(model).await;
        }

        Ok(outcome)
    }

    /// Notify every follower of `owner_id` whose edge has `status`.
    pub async fn notify_followers(
        &self,
        owner_id: &str,
        notification_type: NotificationType,
        content: Option<String>,
        status: FollowStatus,
        event_id: Option<String>,
    ) -> AppResult<FanOutReport> {
        let followers = self.follow_repo.find_followers(owner_id, status).await?;

        let attempts = followers.iter().map(|edge| {
            let row = self.new_row(
                owner_id,
                &edge.follower_id,
                notification_type,
                content.clone(),
                event_id.clone(),
            );
            async move {
                let model = self.notification_repo.create(row).await?;
                self.push(&model).await;
                Ok::<_, AppError>(())
            }
        });

        let mut report = FanOutReport::default();
        for (edge, result) in followers.iter().zip(join_all(attempts).await) {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        error = %e,
                        follower_id = %edge.follower_id,
                        "Failed to notify follower"
                    );
                }
            }
        }

        tracing::debug!(
            owner_id = %owner_id,
            delivered = report.delivered,
            failed = report.failed,
            "Follower fan-out finished"
        );
        Ok(report)
    }

    /// Create a notification on behalf of `sender_id`.
    pub async fn create(
        &self,
        sender_id: &str,
        receiver_id: &str,
        notification_type: NotificationType,
        content: Option<String>,
    ) -> AppResult<NotifyOutcome> {
        self.user_repo.get_by_id(receiver_id).await?;
        self.notify_user(sender_id, receiver_id, notification_type, content, None)
            .await
    }

    /// List a user's notifications, newest first.
    pub async fn list(&self, receiver_id: &str) -> AppResult<Vec<NotificationItem>> {
        let rows = self.notification_repo.find_by_receiver(receiver_id).await?;
        if rows.is_empty() {
            return Err(AppError::NotFound("No notifications found".to_string()));
        }

        let mut sender_ids: Vec<String> = rows.iter().map(|n| n.sender_id.clone()).collect();
        sender_ids.sort();
        sender_ids.dedup();

        let senders: HashMap<String, _> = self
            .user_repo
            .find_by_ids(&sender_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();
        let statuses: HashMap<String, FollowStatus> = self
            .follow_repo
            .find_statuses_towards(&sender_ids, receiver_id)
            .await?
            .into_iter()
            .map(|edge| (edge.follower_id, edge.status))
            .collect();

        Ok(rows
            .into_iter()
            .map(|n| {
                let sender = senders.get(&n.sender_id);
                NotificationItem {
                    sender_username: sender.map(|u| u.username.clone()),
                    sender_profile_image: sender.and_then(|u| u.profile_image_url.clone()),
                    follow_status: statuses.get(&n.sender_id).copied().into(),
                    id: n.id,
                    sender_id: n.sender_id,
                    notification_type: n.notification_type,
                    content: n.content,
                    is_read: n.is_read,
                    event_id: n.event_id,
                    created_at: n.created_at,
                }
            })
            .collect())
    }

    /// Mark one notification as read.
    pub async fn mark_as_read(&self, id: &str, receiver_id: &str) -> AppResult<()> {
        if !self.notification_repo.mark_as_read(id, receiver_id).await? {
            return Err(AppError::NotFound(
                "Notification not found or unauthorized".to_string(),
            ));
        }
        Ok(())
    }

    /// Mark every notification of a user as read.
    pub async fn mark_all_as_read(&self, receiver_id: &str) -> AppResult<u64> {
        self.notification_repo.mark_all_as_read(receiver_id).await
    }

    /// Delete one notification.
    pub async fn delete(&self, id: &str, receiver_id: &str) -> AppResult<()> {
        if !self.notification_repo.delete(id, receiver_id).await? {
            return Err(AppError::NotFound(
                "Notification not found or unauthorized".to_string(),
            ));
        }
        Ok(())
    }

    /// Count unread notifications.
    pub async fn unread_count(&self, receiver_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(receiver_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::notification_sink::testing::RecordingSink;
    use crate::services::test_fixtures;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn empty_db() -> Arc<DatabaseConnection> {
        Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
    }

    fn service_with(
        notification_db: Arc<DatabaseConnection>,
        follow_db: Arc<DatabaseConnection>,
        user_db: Arc<DatabaseConnection>,
    ) -> NotificationService {
        NotificationService::new(
            NotificationRepository::new(notification_db),
            FollowRepository::new(follow_db),
            UserRepository::new(user_db),
        )
    }

    #[tokio::test]
    async fn test_notify_user_inserts_when_absent() {
        let created = test_fixtures::notification(
            "n1",
            "bob",
            "alice",
            NotificationType::FollowRequest,
            Some("hi"),
        );
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<notification::Model>::new()])
                .append_query_results([[created]])
                .into_connection(),
        );
        let sink = Arc::new(RecordingSink::default());
        let mut service = service_with(db, empty_db(), empty_db());
        service.set_sink(sink.clone());

        let outcome = service
            .notify_user(
                "alice",
                "bob",
                NotificationType::FollowRequest,
                Some("hi".to_string()),
                None,
            )
            .await
            .unwrap();

        assert!(matches!(outcome, NotifyOutcome::Inserted(_)));
        assert_eq!(sink.delivered_count(), 1);
    }

    #[tokio::test]
    async fn test_notify_user_identical_content_is_noop() {
        let existing = test_fixtures::notification(
            "n1",
            "bob",
            "alice",
            NotificationType::FollowRequest,
            Some("hi"),
        );
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .into_connection(),
        );
        let sink = Arc::new(RecordingSink::default());
        let mut service = service_with(db, empty_db(), empty_db());
        service.set_sink(sink.clone());

        let outcome = service
            .notify_user(
                "alice",
                "bob",
                NotificationType::FollowRequest,
                Some("hi".to_string()),
                None,
            )
            .await
            .unwrap();

        assert_eq!(outcome, NotifyOutcome::Unchanged);
        assert_eq!(sink.delivered_count(), 0);
    }

    #[tokio::test]
    async fn test_notify_user_different_content_updates_in_place() {
        let existing = test_fixtures::notification(
            "n1",
            "bob",
            "alice",
            NotificationType::FollowRequest,
            Some("hi"),
        );
        let mut updated = existing.clone();
        updated.content = Some("hello".to_string());

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .append_query_results([[updated]])
                .into_connection(),
        );
        let service = service_with(db, empty_db(), empty_db());

        let outcome = service
            .notify_user(
                "alice",
                "bob",
                NotificationType::FollowRequest,
                Some("hello".to_string()),
                None,
            )
            .await
            .unwrap();

        match outcome {
            NotifyOutcome::Updated(model) => {
                assert_eq!(model.id, "n1");
                assert_eq!(model.content.as_deref(), Some("hello"));
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_fail_notify() {
        let created =
            test_fixtures::notification("n1", "bob", "alice", NotificationType::Comment, None);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<notification::Model>::new()])
                .append_query_results([[created]])
                .into_connection(),
        );
        let mut service = service_with(db, empty_db(), empty_db());
        service.set_sink(Arc::new(RecordingSink::failing()));

        let outcome = service
            .notify_user("alice", "bob", NotificationType::Comment, None, None)
            .await;

        assert!(matches!(outcome, Ok(NotifyOutcome::Inserted(_))));
    }

    #[tokio::test]
    async fn test_notify_followers_reports_each_outcome() {
        let follow_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    test_fixtures::edge("f1", "owner", FollowStatus::Accepted),
                    test_fixtures::edge("f2", "owner", FollowStatus::Accepted),
                    test_fixtures::edge("f3", "owner", FollowStatus::Accepted),
                ]])
                .into_connection(),
        );
        // Two inserts succeed; the third finds the mock exhausted and fails.
        let notification_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_fixtures::notification(
                    "n1",
                    "f1",
                    "owner",
                    NotificationType::Marker,
                    None,
                )]])
                .append_query_results([[test_fixtures::notification(
                    "n2",
                    "f2",
                    "owner",
                    NotificationType::Marker,
                    None,
                )]])
                .into_connection(),
        );
        let sink = Arc::new(RecordingSink::default());
        let mut service = service_with(notification_db, follow_db, empty_db());
        service.set_sink(sink.clone());

        let report = service
            .notify_followers(
                "owner",
                NotificationType::Marker,
                Some("New marker".to_string()),
                FollowStatus::Accepted,
                Some("m1".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(
            report,
            FanOutReport {
                delivered: 2,
                failed: 1
            }
        );
        assert_eq!(sink.delivered_count(), 2);
    }

    #[tokio::test]
    async fn test_notify_followers_without_followers() {
        let follow_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<mappoint_db::entities::follow::Model>::new()])
                .into_connection(),
        );
        let service = service_with(empty_db(), follow_db, empty_db());

        let report = service
            .notify_followers(
                "owner",
                NotificationType::Marker,
                None,
                FollowStatus::Accepted,
                None,
            )
            .await
            .unwrap();

        assert_eq!(report, FanOutReport::default());
    }

    #[tokio::test]
    async fn test_list_empty_is_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<notification::Model>::new()])
                .into_connection(),
        );
        let service = service_with(db, empty_db(), empty_db());

        assert!(matches!(
            service.list("bob").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_attaches_sender_and_follow_status() {
        let n1 = test_fixtures::notification(
            "n1",
            "bob",
            "alice",
            NotificationType::FollowRequest,
            None,
        );
        let n2 =
            test_fixtures::notification("n2", "bob", "carol", NotificationType::Comment, None);

        let notification_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[n1, n2]])
                .into_connection(),
        );
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    test_fixtures::user("alice", "alice"),
                    test_fixtures::user("carol", "carol"),
                ]])
                .into_connection(),
        );
        let follow_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_fixtures::edge(
                    "alice",
                    "bob",
                    FollowStatus::Pending,
                )]])
                .into_connection(),
        );
        let service = service_with(notification_db, follow_db, user_db);

        let items = service.list("bob").await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].sender_username.as_deref(), Some("alice"));
        assert_eq!(items[0].follow_status, SenderFollowStatus::Pending);
        assert_eq!(items[1].follow_status, SenderFollowStatus::None);
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
        let service = service_with(db, empty_db(), empty_db());

        assert!(matches!(
            service.mark_as_read("n1", "mallory").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_requires_existing_receiver() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<mappoint_db::entities::user::Model>::new()])
                .into_connection(),
        );
        let service = service_with(empty_db(), empty_db(), user_db);

        let result = service
            .create("alice", "ghost", NotificationType::Custom, None)
            .await;

        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }
}
