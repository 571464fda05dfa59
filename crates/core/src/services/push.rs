//! Push token registry and delivery through an Expo-compatible gateway.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use mappoint_common::{AppError, AppResult, IdGenerator};
use mappoint_db::{entities::push_token, repositories::PushTokenRepository};
use sea_orm::Set;
use serde::{Deserialize, Serialize};

/// One message as accepted by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    pub to: String,
    pub sound: String,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

impl PushMessage {
    #[must_use]
    pub fn new(to: impl Into<String>, title: &str, body: &str) -> Self {
        Self {
            to: to.into(),
            sound: "default".to_string(),
            title: title.to_string(),
            body: body.to_string(),
            data: serde_json::json!({}),
        }
    }
}

/// Outbound push gateway.
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(&self, message: &PushMessage) -> AppResult<()>;
}

pub type PushGatewayService = Arc<dyn PushGateway>;

/// Gateway speaking the Expo push HTTP API.
pub struct ExpoPushGateway {
    url: String,
    http_client: reqwest::Client,
}

impl ExpoPushGateway {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PushGateway for ExpoPushGateway {
    async fn send(&self, message: &PushMessage) -> AppResult<()> {
        let response = self
            .http_client
            .post(&self.url)
            .header("Accept", "application/json")
            .json(message)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Push request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Push gateway returned {}",
                response.status()
            )));
        }

        tracing::debug!(to = %message.to, "Push notification sent");
        Ok(())
    }
}

/// Result of registering a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredToken {
    pub token_id: String,
    pub created: bool,
}

/// Push service.
#[derive(Clone)]
pub struct PushService {
    repo: PushTokenRepository,
    gateway: PushGatewayService,
    id_gen: IdGenerator,
}

impl PushService {
    #[must_use]
    pub fn new(repo: PushTokenRepository, gateway: PushGatewayService) -> Self {
        Self {
            repo,
            gateway,
            id_gen: IdGenerator::new(),
        }
    }

    /// Store a token once. Registering an existing token returns its id.
    pub async fn add_token(&self, token: &str) -> AppResult<RegisteredToken> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::Validation("Push token is required".to_string()));
        }

        if let Some(existing) = self.repo.find_by_token(token).await? {
            return Ok(RegisteredToken {
                token_id: existing.id,
                created: false,
            });
        }

        let model = push_token::ActiveModel {
            id: Set(self.id_gen.generate()),
            token: Set(token.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };
        let created = self.repo.create(model).await?;
        tracing::info!(token_id = %created.id, "Push token registered");

        Ok(RegisteredToken {
            token_id: created.id,
            created: true,
        })
    }

    /// Ensure the token exists and link it to the user.
    pub async fn link(&self, user_id: &str, token: &str) -> AppResult<RegisteredToken> {
        let registered = self.add_token(token).await?;
        self.repo
            .link(self.id_gen.generate(), user_id, &registered.token_id)
            .await?;
        Ok(registered)
    }

    /// Remove the user's association with a token. Unknown tokens are ignored.
    pub async fn unlink(&self, user_id: &str, token: &str) -> AppResult<()> {
        if let Some(existing) = self.repo.find_by_token(token.trim()).await? {
            let removed = self.repo.unlink(user_id, &existing.id).await?;
            tracing::debug!(user_id = %user_id, removed, "Push token unlinked");
        }
        Ok(())
    }

    /// Send to every device of one user.
    pub async fn send_to_user(&self, user_id: &str, title: &str, body: &str) -> AppResult<usize> {
        self.send_to_users(&[user_id.to_string()], title, body).await
    }

    /// Send to the distinct devices of several users. Returns the number of
    /// messages sent; any gateway failure fails the call after all attempts.
    pub async fn send_to_users(
        &self,
        user_ids: &[String],
        title: &str,
        body: &str,
    ) -> AppResult<usize> {
        if title.trim().is_empty() || body.trim().is_empty() {
            return Err(AppError::Validation(
                "Title and body are required".to_string(),
            ));
        }

        let tokens = self.repo.find_tokens_for_users(user_ids).await?;
        if tokens.is_empty() {
            return Err(AppError::NotFound("No push tokens found".to_string()));
        }

        let messages: Vec<PushMessage> = tokens
            .into_iter()
            .map(|token| PushMessage::new(token, title, body))
            .collect();
        let results = join_all(messages.iter().map(|m| self.gateway.send(m))).await;

        let mut first_error = None;
        for (message, result) in messages.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!(error = %e, to = %message.to, "Push delivery failed");
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        Ok(messages.len())
    }
}
