//! Administration: marker moderation, rating label catalog, roles and stats.

use std::collections::HashSet;

use mappoint_common::{AppError, AppResult, IdGenerator};
use mappoint_db::{
    entities::{
        marker::{MarkerType, Visibility},
        rating_label,
        user::{self, UserRole},
    },
    repositories::{
        ActiveUserRepository, ConnectionTypeCount, MarkerCommentRepository, MarkerRatingRepository,
        MarkerRepository, MarkerTypeCount, MonthlyActiveCount, RatingLabelRepository,
        UserRepository,
    },
};
use sea_orm::{IntoActiveModel, Set, TransactionTrait};
use serde::Serialize;

use crate::services::aggregator::{MarkerAggregator, MarkerView};

/// Row counts shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsOverview {
    pub users: u64,
    pub markers: u64,
    pub comments: u64,
    pub ratings: u64,
}

/// Admin service.
#[derive(Clone)]
pub struct AdminService {
    marker_repo: MarkerRepository,
    label_repo: RatingLabelRepository,
    user_repo: UserRepository,
    comment_repo: MarkerCommentRepository,
    rating_repo: MarkerRatingRepository,
    activity_repo: ActiveUserRepository,
    aggregator: MarkerAggregator,
    id_gen: IdGenerator,
}

impl AdminService {
    #[must_use]
    pub const fn new(
        marker_repo: MarkerRepository,
        label_repo: RatingLabelRepository,
        user_repo: UserRepository,
        comment_repo: MarkerCommentRepository,
        rating_repo: MarkerRatingRepository,
        activity_repo: ActiveUserRepository,
        aggregator: MarkerAggregator,
    ) -> Self {
        Self {
            marker_repo,
            label_repo,
            user_repo,
            comment_repo,
            rating_repo,
            activity_repo,
            aggregator,
            id_gen: IdGenerator::new(),
        }
    }

    /// Markers for moderation, blocked ones included. `None` means every
    /// visibility; an empty `types` means every type.
    pub async fn markers(
        &self,
        visibility: Option<Visibility>,
        types: &[MarkerType],
    ) -> AppResult<Vec<MarkerView>> {
        let markers = self.marker_repo.find_for_moderation(visibility, types).await?;
        if markers.is_empty() {
            return Err(AppError::NotFound("No markers found".to_string()));
        }
        self.aggregator.aggregate(markers).await
    }

    /// Block or unblock a marker.
    pub async fn set_blocked(&self, marker_id: &str, blocked: bool) -> AppResult<()> {
        if !self.marker_repo.set_blocked(marker_id, blocked).await? {
            return Err(AppError::MarkerNotFound(marker_id.to_string()));
        }
        tracing::info!(marker_id = %marker_id, blocked, "Marker moderation flag changed");
        Ok(())
    }

    /// Add labels to a type's catalog. Labels already present are skipped.
    /// Returns the number inserted.
    pub async fn add_labels(&self, marker_type: MarkerType, labels: &[String]) -> AppResult<usize> {
        let mut wanted: Vec<String> = Vec::new();
        for label in labels {
            let label = label.trim();
            if !label.is_empty() && !wanted.iter().any(|w| w == label) {
                wanted.push(label.to_string());
            }
        }
        if wanted.is_empty() {
            return Err(AppError::Validation("At least one label is required".to_string()));
        }

        let txn = self
            .label_repo
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let existing: HashSet<String> = self
            .label_repo
            .find_by_type_in(&txn, marker_type)
            .await?
            .into_iter()
            .map(|l| l.label)
            .collect();

        let mut inserted = 0;
        for label in wanted.into_iter().filter(|l| !existing.contains(l)) {
            let model = rating_label::ActiveModel {
                id: Set(self.id_gen.generate()),
                marker_type: Set(marker_type),
                label: Set(label),
                created_at: Set(chrono::Utc::now().into()),
            };
            self.label_repo.create_in(&txn, model).await?;
            inserted += 1;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(marker_type = ?marker_type, inserted, "Rating labels added");
        Ok(inserted)
    }

    /// Change a user's role.
    pub async fn set_role(&self, user_id: &str, role: UserRole) -> AppResult<user::Model> {
        let user = self.user_repo.get_by_id(user_id).await?;
        let mut active = user.into_active_model();
        active.role = Set(role);
        active.updated_at = Set(Some(chrono::Utc::now().into()));
        let updated = self.user_repo.update(active).await?;
        tracing::info!(user_id = %user_id, role = ?role, "User role changed");
        Ok(updated)
    }

    pub async fn overview(&self) -> AppResult<StatsOverview> {
        Ok(StatsOverview {
            users: self.user_repo.count().await?,
            markers: self.marker_repo.count().await?,
            comments: self.comment_repo.count().await?,
            ratings: self.rating_repo.count().await?,
        })
    }

    pub async fn markers_by_type(&self) -> AppResult<Vec<MarkerTypeCount>> {
        self.marker_repo.count_by_type().await
    }

    pub async fn users_by_connection(&self) -> AppResult<Vec<ConnectionTypeCount>> {
        self.user_repo.count_by_connection_type().await
    }

    /// Distinct active users per month of `year`.
    pub async fn active_users(&self, year: i32) -> AppResult<Vec<MonthlyActiveCount>> {
        self.activity_repo.count_by_month(year).await
    }
}
