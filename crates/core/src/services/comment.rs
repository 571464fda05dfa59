//! Marker comment service.

use chrono::{DateTime, FixedOffset};
use mappoint_common::{AppError, AppResult, IdGenerator};
use mappoint_db::{
    entities::{marker_comment, notification::NotificationType},
    repositories::{FollowRepository, MarkerCommentRepository, MarkerRepository},
};
use sea_orm::{IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::notification::NotificationService;
use crate::services::ratings::{MAX_RATING, MIN_RATING};
use crate::services::visibility::{self, Viewer};

/// Input for creating a comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentInput {
    pub marker_id: String,
    #[validate(length(min = 1, max = 2000))]
    pub comment: String,
    #[validate(range(min = MIN_RATING, max = MAX_RATING))]
    pub rating: i32,
}

/// Input for editing a comment.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentInput {
    pub comment_id: String,
    #[validate(length(min = 1, max = 2000))]
    pub comment: String,
    #[validate(range(min = MIN_RATING, max = MAX_RATING))]
    pub rating: i32,
}

/// A comment with its author's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentView {
    pub id: String,
    pub marker_id: String,
    pub user_id: String,
    pub username: Option<String>,
    pub comment: String,
    pub rating: i32,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: Option<DateTime<FixedOffset>>,
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: MarkerCommentRepository,
    marker_repo: MarkerRepository,
    follow_repo: FollowRepository,
    notifications: Option<NotificationService>,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: MarkerCommentRepository,
        marker_repo: MarkerRepository,
        follow_repo: FollowRepository,
    ) -> Self {
        Self {
            comment_repo,
            marker_repo,
            follow_repo,
            notifications: None,
            id_gen: IdGenerator::new(),
        }
    }

    pub fn set_notifications(&mut self, notifications: NotificationService) {
        self.notifications = Some(notifications);
    }

    /// Comment on a marker the viewer can see. One comment per user and marker.
    pub async fn create(
        &self,
        viewer: &Viewer,
        mut input: CreateCommentInput,
    ) -> AppResult<marker_comment::Model> {
        input.comment = input.comment.trim().to_string();
        input.validate()?;

        let marker = visibility::load_visible(
            &self.marker_repo,
            &self.follow_repo,
            viewer,
            &input.marker_id,
        )
        .await?;

        if self
            .comment_repo
            .find_by_marker_and_user(&marker.id, &viewer.user_id)
            .await?
            .is_some()
        {
            return Err(AppError::AlreadyCommented);
        }

        let now = chrono::Utc::now();
        let model = marker_comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            marker_id: Set(marker.id.clone()),
            user_id: Set(viewer.user_id.clone()),
            comment: Set(input.comment),
            rating: Set(input.rating),
            created_at: Set(now.into()),
            updated_at: Set(None),
        };
        let comment = self.comment_repo.create(model).await.map_err(|e| match e {
            AppError::Conflict(_) => AppError::AlreadyCommented,
            other => other,
        })?;

        tracing::info!(comment_id = %comment.id, marker_id = %marker.id, "Comment created");

        if marker.user_id != viewer.user_id
            && let Some(ref notifications) = self.notifications
            && let Err(e) = notifications
                .notify_user(
                    &viewer.user_id,
                    &marker.user_id,
                    NotificationType::Comment,
                    Some(format!("New comment on {}", marker.title)),
                    Some(marker.id.clone()),
                )
                .await
        {
            tracing::warn!(error = %e, marker_id = %marker.id, "Failed to notify marker owner");
        }

        Ok(comment)
    }

    async fn authored(&self, user_id: &str, comment_id: &str) -> AppResult<marker_comment::Model> {
        let comment = self
            .comment_repo
            .find_by_id(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;
        if comment.user_id != user_id {
            return Err(AppError::Forbidden(
                "You can only modify your own comments".to_string(),
            ));
        }
        Ok(comment)
    }

    /// Edit a comment. Author only.
    pub async fn update(
        &self,
        user_id: &str,
        mut input: UpdateCommentInput,
    ) -> AppResult<marker_comment::Model> {
        input.comment = input.comment.trim().to_string();
        input.validate()?;

        let comment = self.authored(user_id, &input.comment_id).await?;
        let mut active = comment.into_active_model();
        active.comment = Set(input.comment);
        active.rating = Set(input.rating);
        active.updated_at = Set(Some(chrono::Utc::now().into()));

        self.comment_repo.update(active).await
    }

    /// Delete a comment. Author only.
    pub async fn delete(&self, user_id: &str, comment_id: &str) -> AppResult<()> {
        self.authored(user_id, comment_id).await?;
        self.comment_repo.delete(comment_id).await?;
        tracing::info!(comment_id = %comment_id, "Comment deleted");
        Ok(())
    }

    /// Comments of a marker, newest first.
    pub async fn list(&self, marker_id: &str) -> AppResult<Vec<CommentView>> {
        let rows = self.comment_repo.find_by_marker_with_authors(marker_id).await?;
        Ok(rows
            .into_iter()
            .map(|(comment, author)| CommentView {
                id: comment.id,
                marker_id: comment.marker_id,
                user_id: comment.user_id,
                username: author.map(|a| a.username),
                comment: comment.comment,
                rating: comment.rating,
                created_at: comment.created_at,
                updated_at: comment.updated_at,
            })
            .collect())
    }
}
