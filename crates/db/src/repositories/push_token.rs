//! Push token repository.

use std::sync::Arc;

use crate::entities::{PushToken, UserPushToken, push_token, user_push_token};
use mappoint_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, JoinType,
    QueryFilter, QuerySelect, RelationTrait, Set, sea_query::OnConflict,
};

/// Push token repository for database operations.
#[derive(Clone)]
pub struct PushTokenRepository {
    db: Arc<DatabaseConnection>,
}

impl PushTokenRepository {
    /// Create a new push token repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a token row by its value.
    pub async fn find_by_token(&self, token: &str) -> AppResult<Option<push_token::Model>> {
        PushToken::find()
            .filter(push_token::Column::Token.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a token row.
    pub async fn create(&self, model: push_token::ActiveModel) -> AppResult<push_token::Model> {
        model.insert(self.db.as_ref()).await.map_err(AppError::from)
    }

    /// Link a token to a user; linking twice is a no-op.
    pub async fn link(&self, id: String, user_id: &str, push_token_id: &str) -> AppResult<()> {
        let model = user_push_token::ActiveModel {
            id: Set(id),
            user_id: Set(user_id.to_string()),
            push_token_id: Set(push_token_id.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        UserPushToken::insert(model)
            .on_conflict(
                OnConflict::columns([
                    user_push_token::Column::UserId,
                    user_push_token::Column::PushTokenId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Remove a user's link to a token. The token row stays.
    pub async fn unlink(&self, user_id: &str, push_token_id: &str) -> AppResult<u64> {
        let result = UserPushToken::delete_many()
            .filter(user_push_token::Column::UserId.eq(user_id))
            .filter(user_push_token::Column::PushTokenId.eq(push_token_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Remove every link of a user.
    pub async fn unlink_all_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
    ) -> AppResult<u64> {
        let result = UserPushToken::delete_many()
            .filter(user_push_token::Column::UserId.eq(user_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Distinct token values linked to any of the users.
    pub async fn find_tokens_for_users(&self, user_ids: &[String]) -> AppResult<Vec<String>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        PushToken::find()
            .join(JoinType::InnerJoin, push_token::Relation::UserLinks.def())
            .filter(user_push_token::Column::UserId.is_in(user_ids.iter().cloned()))
            .select_only()
            .column(push_token::Column::Token)
            .distinct()
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
