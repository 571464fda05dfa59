//! Server-Sent Events for real-time updates.
//!
//! [`SseBroadcaster`] is the in-process [`NotificationSink`]: notifications go
//! to per-user channels, marker changes to one global channel every stream
//! listens on.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use futures::stream::{self, Stream};
use mappoint_common::AppResult;
use mappoint_core::{NotificationEvent, NotificationSink};
use serde::Serialize;
use tokio::sync::{RwLock, broadcast};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use crate::{extractors::AuthUser, middleware::AppState};

/// Events written to a stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum SseEvent {
    /// A notification for the connected user.
    Notification(NotificationEvent),
    /// A marker was created, changed or removed.
    MarkersUpdated {
        #[serde(rename = "markerId")]
        marker_id: String,
    },
    /// Connection established.
    Connected,
}

/// Broadcast channels behind the notification streams.
#[derive(Clone)]
pub struct SseBroadcaster {
    /// Marker change events, shared by every subscriber.
    pub markers: broadcast::Sender<SseEvent>,
    user_channels: Arc<RwLock<HashMap<String, broadcast::Sender<SseEvent>>>>,
}

impl SseBroadcaster {
    #[must_use]
    pub fn new() -> Self {
        let (markers, _) = broadcast::channel(256);

        Self {
            markers,
            user_channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get or create a user-specific channel.
    pub async fn user_channel(&self, user_id: &str) -> broadcast::Sender<SseEvent> {
        let mut channels = self.user_channels.write().await;

        if let Some(sender) = channels.get(user_id) {
            return sender.clone();
        }

        let (sender, _) = broadcast::channel(100);
        channels.insert(user_id.to_string(), sender.clone());
        sender
    }

    /// Send to one user's channel. Returns how many streams received it.
    pub async fn broadcast_to_user(&self, user_id: &str, event: SseEvent) -> usize {
        let channels = self.user_channels.read().await;
        channels
            .get(user_id)
            .and_then(|sender| sender.send(event).ok())
            .unwrap_or(0)
    }

    /// Drop channels nobody listens to anymore.
    pub async fn cleanup(&self) {
        let mut channels = self.user_channels.write().await;
        channels.retain(|_, sender| sender.receiver_count() > 0);
    }
}

impl Default for SseBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSink for SseBroadcaster {
    async fn deliver(&self, event: &NotificationEvent) -> AppResult<()> {
        let received = self
            .broadcast_to_user(&event.receiver_id, SseEvent::Notification(event.clone()))
            .await;
        tracing::debug!(
            receiver_id = %event.receiver_id,
            received,
            "Notification pushed to streams"
        );
        Ok(())
    }

    async fn publish_markers_updated(&self, marker_id: &str) -> AppResult<()> {
        // No subscribers is not an error.
        let _ = self.markers.send(SseEvent::MarkersUpdated {
            marker_id: marker_id.to_string(),
        });
        Ok(())
    }
}

fn to_event(event: &SseEvent) -> Event {
    Event::default()
        .json_data(event)
        .unwrap_or_else(|_| Event::default().data("error"))
}

/// The caller's notifications merged with marker updates.
async fn notification_stream(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let personal = state
        .sse_broadcaster
        .user_channel(&identity.user_id)
        .await
        .subscribe();
    let markers = state.sse_broadcaster.markers.subscribe();

    let updates = BroadcastStream::new(personal)
        .merge(BroadcastStream::new(markers))
        .filter_map(|result| result.ok().map(|event| Ok(to_event(&event))));

    let initial = stream::once(async { Ok(to_event(&SseEvent::Connected)) });

    Sse::new(initial.chain(updates)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}

/// Stream routes, nested under `/notifications`.
pub fn router() -> Router<AppState> {
    Router::new().route("/stream", get(notification_stream))
}
