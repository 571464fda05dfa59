//! User service.

use mappoint_common::{AppError, AppResult};
use mappoint_db::{
    entities::user::{self, Gender},
    repositories::{FollowRepository, NotificationRepository, PushTokenRepository, UserRepository},
};
use sea_orm::{IntoActiveModel, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::password;

/// Public listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub email: String,
    pub gender: Gender,
}

impl From<user::Model> for UserSummary {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            gender: user.gender,
        }
    }
}

/// Input for updating a profile.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserInput {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    pub gender: Gender,
}

/// Input for changing a password.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordInput {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    follow_repo: FollowRepository,
    notification_repo: NotificationRepository,
    push_repo: PushTokenRepository,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        follow_repo: FollowRepository,
        notification_repo: NotificationRepository,
        push_repo: PushTokenRepository,
    ) -> Self {
        Self {
            user_repo,
            follow_repo,
            notification_repo,
            push_repo,
        }
    }

    /// Get a user by ID.
    pub async fn get(&self, user_id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(user_id).await
    }

    /// Every user.
    pub async fn all(&self) -> AppResult<Vec<UserSummary>> {
        Ok(self
            .user_repo
            .find_all()
            .await?
            .into_iter()
            .map(UserSummary::from)
            .collect())
    }

    /// Every user except the caller.
    pub async fn all_except(&self, user_id: &str) -> AppResult<Vec<UserSummary>> {
        Ok(self
            .user_repo
            .find_all_except(user_id)
            .await?
            .into_iter()
            .map(UserSummary::from)
            .collect())
    }

    /// Change username and gender.
    pub async fn update(&self, user_id: &str, mut input: UpdateUserInput) -> AppResult<user::Model> {
        input.username = input.username.trim().to_string();
        input.validate()?;

        let user = self.user_repo.get_by_id(user_id).await?;
        if user.username != input.username
            && let Some(holder) = self.user_repo.find_by_username(&input.username).await?
            && holder.id != user_id
        {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        let mut active = user.into_active_model();
        active.username = Set(input.username);
        active.gender = Set(input.gender);
        active.updated_at = Set(Some(chrono::Utc::now().into()));

        let updated = self.user_repo.update(active).await?;
        tracing::info!(user_id = %user_id, "User profile updated");
        Ok(updated)
    }

    /// Change the password after checking the current one.
    pub async fn change_password(&self, user_id: &str, input: ChangePasswordInput) -> AppResult<()> {
        if input.new_password != input.confirm_password {
            return Err(AppError::Validation("Passwords do not match".to_string()));
        }
        password::check_strength(&input.new_password)?;

        let user = self.user_repo.get_by_id(user_id).await?;
        let hash = user
            .password_hash
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("This account has no password".to_string()))?;
        if !password::verify_password(&input.old_password, hash)? {
            return Err(AppError::BadRequest(
                "Current password is incorrect".to_string(),
            ));
        }

        let mut active = user.into_active_model();
        active.password_hash = Set(Some(password::hash_password(&input.new_password)?));
        active.updated_at = Set(Some(chrono::Utc::now().into()));
        self.user_repo.update(active).await?;

        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    /// Delete an account and everything that references it.
    ///
    /// Markers, images, ratings and comments go through foreign key cascades.
    pub async fn delete(&self, user_id: &str) -> AppResult<()> {
        let txn = self
            .follow_repo
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let notifications = self
            .notification_repo
            .delete_all_for_user_in(&txn, user_id)
            .await?;
        let follows = self.follow_repo.delete_all_for_user_in(&txn, user_id).await?;
        self.push_repo.unlink_all_in(&txn, user_id).await?;
        if self.user_repo.delete_in(&txn, user_id).await? == 0 {
            return Err(AppError::UserNotFound(user_id.to_string()));
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(
            user_id = %user_id,
            notifications,
            follows,
            "User deleted"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::test_fixtures;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn service(db: Arc<DatabaseConnection>) -> UserService {
        UserService::new(
            UserRepository::new(db.clone()),
            FollowRepository::new(db.clone()),
            NotificationRepository::new(db.clone()),
            PushTokenRepository::new(db),
        )
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[tokio::test]
    async fn test_all_except_maps_summaries() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_fixtures::user("u2", "bob")]])
                .into_connection(),
        );

        let users = service(db).all_except("u1").await.unwrap();

        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "bob");
        assert_eq!(users[0].email, "bob@example.com");
    }

    #[tokio::test]
    async fn test_update_rejects_taken_username() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_fixtures::user("u1", "alice")]])
                .append_query_results([[test_fixtures::user("u2", "bob")]])
                .into_connection(),
        );

        let result = service(db)
            .update(
                "u1",
                UpdateUserInput {
                    username: "bob".to_string(),
                    gender: Gender::Female,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_rejects_blank_username() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let result = service(db)
            .update(
                "u1",
                UpdateUserInput {
                    username: "   ".to_string(),
                    gender: Gender::Female,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_keeps_own_username() {
        let mut updated = test_fixtures::user("u1", "alice");
        updated.gender = Gender::Female;
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_fixtures::user("u1", "alice")]])
                .append_query_results([[updated]])
                .into_connection(),
        );

        let user = service(db)
            .update(
                "u1",
                UpdateUserInput {
                    username: "alice".to_string(),
                    gender: Gender::Female,
                },
            )
            .await
            .unwrap();

        assert_eq!(user.gender, Gender::Female);
    }

    #[tokio::test]
    async fn test_change_password_wrong_old_password() {
        let user = user::Model {
            password_hash: Some(password::hash_password("Secret1").unwrap()),
            ..test_fixtures::user("u1", "alice")
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .into_connection(),
        );

        let result = service(db)
            .change_password(
                "u1",
                ChangePasswordInput {
                    old_password: "Wrong1".to_string(),
                    new_password: "Newpass1".to_string(),
                    confirm_password: "Newpass1".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_change_password_mismatch() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let result = service(db)
            .change_password(
                "u1",
                ChangePasswordInput {
                    old_password: "Secret1".to_string(),
                    new_password: "Newpass1".to_string(),
                    confirm_password: "Newpass2".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_runs_in_one_transaction() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(3), exec(2), exec(1), exec(1)])
                .into_connection(),
        );
        let service = service(db.clone());

        service.delete("u1").await.unwrap();

        drop(service);
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert_eq!(log.len(), 1);
        let sql = format!("{log:?}");
        assert!(sql.contains("DELETE FROM \\\"notifications\\\""));
        assert!(sql.contains("DELETE FROM \\\"follow\\\""));
        assert!(sql.contains("DELETE FROM \\\"user_push_tokens\\\""));
        assert!(sql.contains("DELETE FROM \\\"users\\\""));
    }

    #[tokio::test]
    async fn test_delete_missing_user() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(0), exec(0), exec(0), exec(0)])
                .into_connection(),
        );

        assert!(matches!(
            service(db).delete("ghost").await,
            Err(AppError::UserNotFound(_))
        ));
    }
}
