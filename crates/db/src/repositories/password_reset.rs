//! Password reset token repository.

use std::sync::Arc;

use crate::entities::{PasswordResetToken, password_reset_token};
use mappoint_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, Set,
};

/// Password reset token repository for database operations.
#[derive(Clone)]
pub struct PasswordResetRepository {
    db: Arc<DatabaseConnection>,
}

impl PasswordResetRepository {
    /// Create a new password reset token repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Underlying connection, for opening transactions.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    /// Store a token hash.
    pub async fn create(
        &self,
        model: password_reset_token::ActiveModel,
    ) -> AppResult<password_reset_token::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an unused token by hash on the given connection.
    pub async fn find_unused_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        token_hash: &str,
    ) -> AppResult<Option<password_reset_token::Model>> {
        PasswordResetToken::find()
            .filter(password_reset_token::Column::TokenHash.eq(token_hash))
            .filter(password_reset_token::Column::UsedAt.is_null())
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Consume a token on the given connection.
    pub async fn mark_used_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        token: password_reset_token::Model,
    ) -> AppResult<()> {
        let mut active = token.into_active_model();
        active.used_at = Set(Some(chrono::Utc::now().into()));
        active
            .update(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
