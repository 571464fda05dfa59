//! Follow service.
//!
//! State machine over directed edges: `none -> pending -> accepted`.
//! Rejecting or unfollowing deletes the edge, so both are idempotent.

use chrono::{DateTime, FixedOffset};
use mappoint_common::{AppError, AppResult, IdGenerator};
use mappoint_db::{
    entities::{
        follow::{self, FollowStatus},
        notification::NotificationType,
        user,
    },
    repositories::{FollowRepository, UserRepository},
};
use sea_orm::{Set, TransactionTrait};
use serde::Serialize;

use crate::services::notification::NotificationService;

/// A user in a follower/following listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowListEntry {
    pub id: String,
    pub username: String,
    pub gender: user::Gender,
    pub last_login: Option<DateTime<FixedOffset>>,
    pub followed_at: DateTime<FixedOffset>,
}

/// An incoming pending request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowRequestEntry {
    pub id: String,
    pub username: String,
    pub gender: user::Gender,
    pub last_login: Option<DateTime<FixedOffset>>,
    pub requested_at: DateTime<FixedOffset>,
}

/// Follow service for business logic.
#[derive(Clone)]
pub struct FollowService {
    follow_repo: FollowRepository,
    user_repo: UserRepository,
    notifications: Option<NotificationService>,
    id_gen: IdGenerator,
}

impl FollowService {
    /// Create a new follow service.
    #[must_use]
    pub const fn new(follow_repo: FollowRepository, user_repo: UserRepository) -> Self {
        Self {
            follow_repo,
            user_repo,
            notifications: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the notification service used to tell users about requests.
    pub fn set_notifications(&mut self, notifications: NotificationService) {
        self.notifications = Some(notifications);
    }

    async fn notify(
        &self,
        sender_id: &str,
        receiver_id: &str,
        notification_type: NotificationType,
        content: String,
    ) {
        if let Some(ref notifications) = self.notifications
            && let Err(e) = notifications
                .notify_user(sender_id, receiver_id, notification_type, Some(content), None)
                .await
        {
            tracing::warn!(error = %e, receiver_id = %receiver_id, "Failed to send follow notification");
        }
    }

    /// Ask to follow `followee_id`.
    ///
    /// A previously rejected edge goes back to pending.
    pub async fn send_request(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> AppResult<follow::Model> {
        if follower_id == followee_id {
            return Err(AppError::BadRequest("Cannot follow yourself".to_string()));
        }

        let follower = self.user_repo.get_by_id(follower_id).await?;
        self.user_repo.get_by_id(followee_id).await?;

        let conn = self.follow_repo.connection();
        let edge = match self
            .follow_repo
            .find_by_pair_in(conn, follower_id, followee_id)
            .await?
        {
            Some(edge) if edge.status == FollowStatus::Accepted => {
                return Err(AppError::AlreadyFollowing);
            }
            Some(edge) if edge.status == FollowStatus::Pending => {
                return Err(AppError::RequestAlreadyPending);
            }
            Some(edge) => {
                self.follow_repo
                    .set_status_in(conn, edge, FollowStatus::Pending)
                    .await?
            }
            None => {
                let now = chrono::Utc::now();
                let model = follow::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    follower_id: Set(follower_id.to_string()),
                    followee_id: Set(followee_id.to_string()),
                    status: Set(FollowStatus::Pending),
                    created_at: Set(now.into()),
                    status_changed_at: Set(now.into()),
                };
                self.follow_repo.create_in(conn, model).await?
            }
        };

        tracing::info!(follower_id = %follower_id, followee_id = %followee_id, "Follow requested");

        self.notify(
            follower_id,
            followee_id,
            NotificationType::FollowRequest,
            format!("{} wants to follow you", follower.username),
        )
        .await;

        Ok(edge)
    }

    /// `user_id` accepts the pending request from `requester_id`.
    ///
    /// Returns the requester.
    pub async fn accept(&self, user_id: &str, requester_id: &str) -> AppResult<user::Model> {
        let txn = self
            .follow_repo
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let edge = self
            .follow_repo
            .find_by_pair_in(&txn, requester_id, user_id)
            .await?
            .filter(|edge| edge.status == FollowStatus::Pending)
            .ok_or(AppError::NoPendingRequest)?;

        self.follow_repo
            .set_status_in(&txn, edge, FollowStatus::Accepted)
            .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let requester = self.user_repo.get_by_id(requester_id).await?;
        let accepter = self.user_repo.get_by_id(user_id).await?;

        tracing::info!(follower_id = %requester_id, followee_id = %user_id, "Follow accepted");

        self.notify(
            user_id,
            requester_id,
            NotificationType::FollowAccepted,
            format!("{} accepted your request", accepter.username),
        )
        .await;

        Ok(requester)
    }

    /// `user_id` rejects (or revokes) the edge from `requester_id`.
    pub async fn reject(&self, user_id: &str, requester_id: &str) -> AppResult<()> {
        let removed = self
            .follow_repo
            .delete_by_pair(requester_id, user_id)
            .await?;
        tracing::debug!(removed, follower_id = %requester_id, followee_id = %user_id, "Follow rejected");
        Ok(())
    }

    /// `user_id` stops following `followee_id`.
    pub async fn unfollow(&self, user_id: &str, followee_id: &str) -> AppResult<()> {
        let removed = self.follow_repo.delete_by_pair(user_id, followee_id).await?;
        tracing::debug!(removed, follower_id = %user_id, followee_id = %followee_id, "Unfollowed");
        Ok(())
    }

    /// Whether `follower_id` follows `followee_id` with an accepted edge.
    pub async fn is_following(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        self.follow_repo.is_following(follower_id, followee_id).await
    }

    async fn with_users(
        &self,
        edges: Vec<follow::Model>,
        other_end: impl Fn(&follow::Model) -> &str,
    ) -> AppResult<Vec<(follow::Model, user::Model)>> {
        let ids: Vec<String> = edges.iter().map(|e| other_end(e).to_string()).collect();
        let users = self.user_repo.find_by_ids(&ids).await?;

        Ok(edges
            .into_iter()
            .filter_map(|edge| {
                let user = users.iter().find(|u| u.id == other_end(&edge))?.clone();
                Some((edge, user))
            })
            .collect())
    }

    /// Accepted followers of `user_id`.
    pub async fn followers(&self, user_id: &str) -> AppResult<Vec<FollowListEntry>> {
        let edges = self
            .follow_repo
            .find_followers(user_id, FollowStatus::Accepted)
            .await?;
        Ok(self
            .with_users(edges, |e| e.follower_id.as_str())
            .await?
            .into_iter()
            .map(|(edge, user)| list_entry(edge, user))
            .collect())
    }

    /// Users `user_id` follows with an accepted edge.
    pub async fn following(&self, user_id: &str) -> AppResult<Vec<FollowListEntry>> {
        let edges = self
            .follow_repo
            .find_following(user_id, FollowStatus::Accepted)
            .await?;
        Ok(self
            .with_users(edges, |e| e.followee_id.as_str())
            .await?
            .into_iter()
            .map(|(edge, user)| list_entry(edge, user))
            .collect())
    }

    /// Incoming requests still waiting for an answer.
    pub async fn pending_requests(&self, user_id: &str) -> AppResult<Vec<FollowRequestEntry>> {
        let edges = self
            .follow_repo
            .find_followers(user_id, FollowStatus::Pending)
            .await?;
        Ok(self
            .with_users(edges, |e| e.follower_id.as_str())
            .await?
            .into_iter()
            .map(|(edge, user)| FollowRequestEntry {
                id: user.id,
                username: user.username,
                gender: user.gender,
                last_login: user.last_login,
                requested_at: edge.status_changed_at,
            })
            .collect())
    }
}

fn list_entry(edge: follow::Model, user: user::Model) -> FollowListEntry {
    FollowListEntry {
        id: user.id,
        username: user.username,
        gender: user.gender,
        last_login: user.last_login,
        followed_at: edge.status_changed_at,
    }
}
