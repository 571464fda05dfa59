//! Monthly activity repository.

use std::sync::Arc;

use crate::entities::{ActiveUser, active_user};
use mappoint_common::{AppError, AppResult};
use serde::Serialize;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter, QueryOrder,
    QuerySelect, Set, sea_query::OnConflict,
};

/// Distinct active users in one month.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct MonthlyActiveCount {
    pub month: i32,
    pub count: i64,
}

/// Monthly activity repository for database operations.
#[derive(Clone)]
pub struct ActiveUserRepository {
    db: Arc<DatabaseConnection>,
}

impl ActiveUserRepository {
    /// Create a new activity repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Record that a user was active in a month. Repeated calls are no-ops.
    pub async fn record(&self, id: String, user_id: &str, year: i32, month: i32) -> AppResult<()> {
        let model = active_user::ActiveModel {
            id: Set(id),
            user_id: Set(user_id.to_string()),
            year: Set(year),
            month: Set(month),
            created_at: Set(chrono::Utc::now().into()),
        };

        ActiveUser::insert(model)
            .on_conflict(
                OnConflict::columns([
                    active_user::Column::UserId,
                    active_user::Column::Year,
                    active_user::Column::Month,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Active users per month of a year.
    pub async fn count_by_month(&self, year: i32) -> AppResult<Vec<MonthlyActiveCount>> {
        ActiveUser::find()
            .filter(active_user::Column::Year.eq(year))
            .select_only()
            .column(active_user::Column::Month)
            .column_as(active_user::Column::UserId.count(), "count")
            .group_by(active_user::Column::Month)
            .order_by_asc(active_user::Column::Month)
            .into_model::<MonthlyActiveCount>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
