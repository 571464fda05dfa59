//! Real-time delivery capability.
//!
//! Services that need to push something to connected clients receive a
//! [`NotificationSinkService`] at construction time. The HTTP layer provides
//! the concrete implementation (server-sent events).

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use mappoint_common::AppResult;
use mappoint_db::entities::notification::{self, NotificationType};
use serde::Serialize;
use std::sync::Arc;

/// A notification as pushed to its receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationEvent {
    pub id: String,
    pub receiver_id: String,
    pub sender_id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub content: Option<String>,
    pub event_id: Option<String>,
    pub created_at: DateTime<FixedOffset>,
}

impl From<&notification::Model> for NotificationEvent {
    fn from(model: &notification::Model) -> Self {
        Self {
            id: model.id.clone(),
            receiver_id: model.receiver_id.clone(),
            sender_id: model.sender_id.clone(),
            notification_type: model.notification_type,
            content: model.content.clone(),
            event_id: model.event_id.clone(),
            created_at: model.updated_at.unwrap_or(model.created_at),
        }
    }
}

/// Pushes events to connected clients.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver a notification to its receiver's channel.
    async fn deliver(&self, event: &NotificationEvent) -> AppResult<()>;

    /// Tell every connected client that the marker set changed.
    async fn publish_markers_updated(&self, marker_id: &str) -> AppResult<()>;
}

/// Sink that drops everything. Used when no real-time transport is wired.
#[derive(Debug, Clone, Default)]
pub struct NoOpNotificationSink;

#[async_trait]
impl NotificationSink for NoOpNotificationSink {
    async fn deliver(&self, _event: &NotificationEvent) -> AppResult<()> {
        Ok(())
    }

    async fn publish_markers_updated(&self, _marker_id: &str) -> AppResult<()> {
        Ok(())
    }
}

/// Shared sink handle.
pub type NotificationSinkService = Arc<dyn NotificationSink>;
