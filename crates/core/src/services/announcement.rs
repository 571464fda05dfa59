//! Announcement service.

use chrono::{DateTime, FixedOffset};
use mappoint_common::{AppError, AppResult, IdGenerator};
use mappoint_db::{entities::announcement, repositories::AnnouncementRepository};
use sea_orm::{IntoActiveModel, Set};
use serde::Serialize;

/// Listing entry without the markdown body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnouncementSummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<FixedOffset>,
}

/// Decode an uploaded markdown file.
pub fn markdown_from_bytes(data: Vec<u8>) -> AppResult<String> {
    String::from_utf8(data)
        .map_err(|_| AppError::Validation("Announcement file must be UTF-8 text".to_string()))
}

/// Announcement service for business logic.
#[derive(Clone)]
pub struct AnnouncementService {
    repo: AnnouncementRepository,
    id_gen: IdGenerator,
}

impl AnnouncementService {
    /// Create a new announcement service.
    #[must_use]
    pub const fn new(repo: AnnouncementRepository) -> Self {
        Self {
            repo,
            id_gen: IdGenerator::new(),
        }
    }

    fn check_title(title: &str) -> AppResult<String> {
        let title = title.trim();
        if title.is_empty() || title.chars().count() > 255 {
            return Err(AppError::Validation(
                "Title must be between 1 and 255 characters".to_string(),
            ));
        }
        Ok(title.to_string())
    }

    /// Publish an announcement.
    pub async fn create(
        &self,
        author_id: &str,
        title: &str,
        content: String,
    ) -> AppResult<announcement::Model> {
        let title = Self::check_title(title)?;
        if content.trim().is_empty() {
            return Err(AppError::Validation(
                "Announcement content is required".to_string(),
            ));
        }

        let model = announcement::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(author_id.to_string()),
            title: Set(title),
            content: Set(content),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };
        let created = self.repo.create(model).await?;
        tracing::info!(announcement_id = %created.id, "Announcement created");
        Ok(created)
    }

    /// Every announcement, newest first.
    pub async fn list(&self) -> AppResult<Vec<AnnouncementSummary>> {
        Ok(self
            .repo
            .find_all()
            .await?
            .into_iter()
            .map(|a| AnnouncementSummary {
                id: a.id,
                title: a.title,
                created_at: a.created_at,
            })
            .collect())
    }

    pub async fn get(&self, id: &str) -> AppResult<announcement::Model> {
        self.repo.get_by_id(id).await
    }

    /// Change the title and, when given, the content.
    pub async fn update(
        &self,
        id: &str,
        title: &str,
        content: Option<String>,
    ) -> AppResult<announcement::Model> {
        let title = Self::check_title(title)?;
        let existing = self.repo.get_by_id(id).await?;

        let mut active = existing.into_active_model();
        active.title = Set(title);
        if let Some(content) = content.filter(|c| !c.trim().is_empty()) {
            active.content = Set(content);
        }
        active.updated_at = Set(Some(chrono::Utc::now().into()));

        self.repo.update(active).await
    }

    /// Delete an announcement. Only its author may.
    pub async fn delete(&self, user_id: &str, id: &str) -> AppResult<()> {
        let existing = self.repo.get_by_id(id).await?;
        if existing.user_id != user_id {
            return Err(AppError::Forbidden(
                "Only the author can delete this announcement".to_string(),
            ));
        }
        self.repo.delete(id).await?;
        tracing::info!(announcement_id = %id, "Announcement deleted");
        Ok(())
    }
}
