//! Monthly activity tracking.

use chrono::{Datelike, Utc};
use mappoint_common::{AppResult, IdGenerator};
use mappoint_db::repositories::ActiveUserRepository;

/// Records which users were active in which month.
#[derive(Clone)]
pub struct ActivityService {
    repo: ActiveUserRepository,
    id_gen: IdGenerator,
}

impl ActivityService {
    #[must_use]
    pub const fn new(repo: ActiveUserRepository) -> Self {
        Self {
            repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Mark `user_id` active in the current month.
    pub async fn record(&self, user_id: &str) -> AppResult<()> {
        let now = Utc::now();
        self.repo
            .record(
                self.id_gen.generate(),
                user_id,
                now.year(),
                i32::try_from(now.month()).unwrap_or(1),
            )
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_record_current_month() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );
        let service = ActivityService::new(ActiveUserRepository::new(db.clone()));

        service.record("u1").await.unwrap();

        drop(service);
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        let sql = format!("{log:?}");
        assert!(sql.contains("ON CONFLICT"));
        assert!(sql.contains(&Utc::now().year().to_string()));
    }
}
