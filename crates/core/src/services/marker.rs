//! Marker service.

use std::collections::HashSet;

use mappoint_common::{AppError, AppResult, HostedImage, IdGenerator, ImageHostService};
use mappoint_db::{
    entities::{
        follow::FollowStatus,
        marker::{self, MarkerType, Visibility},
        marker_image,
        notification::NotificationType,
        rating_label,
    },
    repositories::{
        FollowRepository, MarkerImageRepository, MarkerRatingRepository, MarkerRepository,
        RatingLabelRepository,
    },
};
use sea_orm::{ConnectionTrait, IntoActiveModel, Set, TransactionTrait};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::services::aggregator::{MarkerAggregator, MarkerView};
use crate::services::notification::NotificationService;
use crate::services::notification_sink::NotificationSinkService;
use crate::services::ratings::RatingInput;
use crate::services::visibility::{self, Viewer, VisibilityScope};

/// Images required to create a marker.
pub const MIN_MARKER_IMAGES: usize = 2;

/// An image file received from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Fields of a marker as submitted on create and update.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct MarkerInput {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    pub marker_type: MarkerType,
    pub visibility: Visibility,
    pub comment: Option<String>,
    pub ratings: RatingInput,
}

impl MarkerInput {
    fn normalized(mut self) -> AppResult<Self> {
        self.title = self.title.trim().to_string();
        self.description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self.comment = self
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        self.validate()?;
        Ok(self)
    }
}

/// Parse a snake_case enum value such as a marker type or visibility.
pub fn parse_enum<T: DeserializeOwned>(field: &str, raw: &str) -> AppResult<T> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_string()))
        .map_err(|_| AppError::Validation(format!("Invalid {field}: {raw}")))
}

/// Marker service for business logic.
#[derive(Clone)]
pub struct MarkerService {
    marker_repo: MarkerRepository,
    image_repo: MarkerImageRepository,
    rating_repo: MarkerRatingRepository,
    label_repo: RatingLabelRepository,
    follow_repo: FollowRepository,
    aggregator: MarkerAggregator,
    image_host: ImageHostService,
    image_folder: String,
    notifications: Option<NotificationService>,
    sink: Option<NotificationSinkService>,
    id_gen: IdGenerator,
}

impl MarkerService {
    /// Create a new marker service.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        marker_repo: MarkerRepository,
        image_repo: MarkerImageRepository,
        rating_repo: MarkerRatingRepository,
        label_repo: RatingLabelRepository,
        follow_repo: FollowRepository,
        aggregator: MarkerAggregator,
        image_host: ImageHostService,
        image_folder: String,
    ) -> Self {
        Self {
            marker_repo,
            image_repo,
            rating_repo,
            label_repo,
            follow_repo,
            aggregator,
            image_host,
            image_folder,
            notifications: None,
            sink: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the notification service used to tell followers about new markers.
    pub fn set_notifications(&mut self, notifications: NotificationService) {
        self.notifications = Some(notifications);
    }

    /// Set the real-time sink.
    pub fn set_sink(&mut self, sink: NotificationSinkService) {
        self.sink = Some(sink);
    }

    async fn publish_updated(&self, marker_id: &str) {
        if let Some(ref sink) = self.sink
            && let Err(e) = sink.publish_markers_updated(marker_id).await
        {
            tracing::warn!(error = %e, marker_id = %marker_id, "Failed to publish marker update");
        }
    }

    async fn upload_all(&self, images: &[UploadedImage]) -> AppResult<Vec<(HostedImage, String)>> {
        let mut hosted = Vec::with_capacity(images.len());
        for image in images {
            match self
                .image_host
                .upload(
                    &self.image_folder,
                    &image.file_name,
                    &image.data,
                    &image.content_type,
                )
                .await
            {
                Ok(h) => hosted.push((h, image.file_name.clone())),
                Err(e) => {
                    self.discard(public_ids(&hosted)).await;
                    return Err(e);
                }
            }
        }
        Ok(hosted)
    }

    async fn discard(&self, public_ids: Vec<String>) {
        for public_id in public_ids {
            if let Err(e) = self.image_host.destroy(&public_id).await {
                tracing::warn!(error = %e, public_id = %public_id, "Failed to delete hosted image");
            }
        }
    }

    fn image_rows(
        &self,
        marker_id: &str,
        user_id: &str,
        hosted: &[(HostedImage, String)],
    ) -> Vec<marker_image::ActiveModel> {
        let now = chrono::Utc::now();
        hosted
            .iter()
            .map(|(image, original_name)| marker_image::ActiveModel {
                id: Set(self.id_gen.generate()),
                marker_id: Set(marker_id.to_string()),
                user_id: Set(user_id.to_string()),
                image_url: Set(image.url.clone()),
                public_id: Set(image.public_id.clone()),
                original_name: Set(original_name.clone()),
                created_at: Set(now.into()),
            })
            .collect()
    }

    async fn write_ratings<C: ConnectionTrait>(
        &self,
        conn: &C,
        marker_id: &str,
        ratings: &[(String, i32)],
    ) -> AppResult<()> {
        for (label_id, rating) in ratings {
            self.rating_repo
                .upsert_in(conn, self.id_gen.generate(), marker_id, label_id, *rating)
                .await?;
        }
        Ok(())
    }

    async fn insert_marker(
        &self,
        owner_id: &str,
        input: &MarkerInput,
        ratings: &[(String, i32)],
        hosted: &[(HostedImage, String)],
    ) -> AppResult<marker::Model> {
        let txn = self
            .marker_repo
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let marker_id = self.id_gen.generate();
        let model = marker::ActiveModel {
            id: Set(marker_id.clone()),
            user_id: Set(owner_id.to_string()),
            title: Set(input.title.clone()),
            description: Set(input.description.clone()),
            latitude: Set(input.latitude),
            longitude: Set(input.longitude),
            marker_type: Set(input.marker_type),
            comment: Set(input.comment.clone()),
            visibility: Set(input.visibility),
            blocked: Set(false),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };
        let marker = self.marker_repo.create_in(&txn, model).await?;

        self.write_ratings(&txn, &marker_id, ratings).await?;
        self.image_repo
            .create_many_in(&txn, self.image_rows(&marker_id, owner_id, hosted))
            .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(marker)
    }

    /// Create a marker with its images and label ratings.
    ///
    /// Images are uploaded first; if the database write fails they are
    /// removed from the host again.
    pub async fn create(
        &self,
        owner_id: &str,
        input: MarkerInput,
        images: Vec<UploadedImage>,
    ) -> AppResult<marker::Model> {
        let input = input.normalized()?;
        if images.len() < MIN_MARKER_IMAGES {
            return Err(AppError::Validation(format!(
                "At least {MIN_MARKER_IMAGES} images are required"
            )));
        }

        let catalog = self.label_repo.find_by_type(input.marker_type).await?;
        let ratings = input.ratings.resolve(&catalog);

        let hosted = self.upload_all(&images).await?;
        let marker = match self
            .insert_marker(owner_id, &input, &ratings, &hosted)
            .await
        {
            Ok(marker) => marker,
            Err(e) => {
                self.discard(public_ids(&hosted)).await;
                return Err(e);
            }
        };

        tracing::info!(
            marker_id = %marker.id,
            user_id = %owner_id,
            images = hosted.len(),
            ratings = ratings.len(),
            "Marker created"
        );

        self.publish_updated(&marker.id).await;

        if marker.visibility != Visibility::Private
            && let Some(ref notifications) = self.notifications
            && let Err(e) = notifications
                .notify_followers(
                    owner_id,
                    NotificationType::Marker,
                    Some(format!("New marker: {}", marker.title)),
                    FollowStatus::Accepted,
                    Some(marker.id.clone()),
                )
                .await
        {
            tracing::warn!(error = %e, marker_id = %marker.id, "Failed to notify followers");
        }

        Ok(marker)
    }

    async fn owned(&self, user_id: &str, marker_id: &str, action: &str) -> AppResult<marker::Model> {
        let marker = self.marker_repo.get_by_id(marker_id).await?;
        if marker.user_id != user_id {
            return Err(AppError::Forbidden(format!(
                "You can only {action} your own markers"
            )));
        }
        Ok(marker)
    }

    /// Update a marker. Owner only.
    ///
    /// When `images` is non-empty it is the complete new image set: stored
    /// images whose original file name is not in it are removed, files not
    /// stored yet are uploaded. An empty `images` leaves images untouched.
    pub async fn update(
        &self,
        user_id: &str,
        marker_id: &str,
        input: MarkerInput,
        images: Vec<UploadedImage>,
    ) -> AppResult<marker::Model> {
        let existing = self.owned(user_id, marker_id, "edit").await?;
        let input = input.normalized()?;

        let catalog = self.label_repo.find_by_type(input.marker_type).await?;
        let ratings = input.ratings.resolve(&catalog);

        let (to_upload, to_remove) = if images.is_empty() {
            (vec![], vec![])
        } else {
            let current = self.image_repo.find_by_marker(marker_id).await?;
            reconcile_images(current, images)
        };

        let hosted = self.upload_all(&to_upload).await?;
        let updated = match self
            .apply_update(existing, user_id, &input, &ratings, &hosted, &to_remove)
            .await
        {
            Ok(updated) => updated,
            Err(e) => {
                self.discard(public_ids(&hosted)).await;
                return Err(e);
            }
        };

        self.discard(to_remove.iter().map(|img| img.public_id.clone()).collect())
            .await;

        tracing::info!(
            marker_id = %marker_id,
            added = hosted.len(),
            removed = to_remove.len(),
            "Marker updated"
        );
        self.publish_updated(marker_id).await;

        Ok(updated)
    }

    async fn apply_update(
        &self,
        existing: marker::Model,
        user_id: &str,
        input: &MarkerInput,
        ratings: &[(String, i32)],
        hosted: &[(HostedImage, String)],
        to_remove: &[marker_image::Model],
    ) -> AppResult<marker::Model> {
        let txn = self
            .marker_repo
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let marker_id = existing.id.clone();
        let mut active = existing.into_active_model();
        active.title = Set(input.title.clone());
        active.description = Set(input.description.clone());
        active.latitude = Set(input.latitude);
        active.longitude = Set(input.longitude);
        active.marker_type = Set(input.marker_type);
        active.visibility = Set(input.visibility);
        active.comment = Set(input.comment.clone());
        active.updated_at = Set(Some(chrono::Utc::now().into()));
        let updated = self.marker_repo.update_in(&txn, active).await?;

        self.write_ratings(&txn, &marker_id, ratings).await?;
        self.image_repo
            .create_many_in(&txn, self.image_rows(&marker_id, user_id, hosted))
            .await?;
        let removed_ids: Vec<String> = to_remove.iter().map(|img| img.id.clone()).collect();
        self.image_repo.delete_many_in(&txn, &removed_ids).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(updated)
    }

    /// Delete a marker. Owner only.
    pub async fn delete(&self, user_id: &str, marker_id: &str) -> AppResult<()> {
        self.owned(user_id, marker_id, "delete").await?;
        let images = self.image_repo.find_by_marker(marker_id).await?;

        self.marker_repo.delete(marker_id).await?;
        self.discard(images.into_iter().map(|img| img.public_id).collect())
            .await;

        tracing::info!(marker_id = %marker_id, user_id = %user_id, "Marker deleted");
        self.publish_updated(marker_id).await;
        Ok(())
    }

    async fn follows(&self, viewer: &Viewer, owner_id: &str) -> AppResult<bool> {
        if viewer.user_id == owner_id {
            return Ok(false);
        }
        self.follow_repo.is_following(&viewer.user_id, owner_id).await
    }

    /// Load a marker `viewer` may see. Hidden markers read as missing.
    pub async fn find_visible(&self, viewer: &Viewer, marker_id: &str) -> AppResult<marker::Model> {
        visibility::load_visible(&self.marker_repo, &self.follow_repo, viewer, marker_id).await
    }

    /// Fetch one aggregated marker if `viewer` may see it.
    pub async fn get(&self, viewer: &Viewer, marker_id: &str) -> AppResult<MarkerView> {
        let marker = self.find_visible(viewer, marker_id).await?;
        self.aggregator.aggregate_one(marker).await
    }

    /// List markers in a scope. An empty result is `NotFound`.
    pub async fn list(&self, viewer: &Viewer, scope: VisibilityScope) -> AppResult<Vec<MarkerView>> {
        let condition = visibility::scope_condition(viewer, scope)?;
        let markers = self.marker_repo.find_matching(condition).await?;
        if markers.is_empty() {
            return Err(AppError::NotFound("No markers found".to_string()));
        }
        self.aggregator.aggregate(markers).await
    }

    /// Markers of one owner as seen by `viewer`.
    pub async fn list_by_owner(&self, viewer: &Viewer, owner_id: &str) -> AppResult<Vec<MarkerView>> {
        let follows_owner = !viewer.is_admin && self.follows(viewer, owner_id).await?;
        let condition = visibility::owner_condition(viewer, owner_id, follows_owner);
        let markers = self.marker_repo.find_matching(condition).await?;
        self.aggregator.aggregate(markers).await
    }

    /// Rating labels available for a marker type.
    pub async fn labels(&self, marker_type: MarkerType) -> AppResult<Vec<rating_label::Model>> {
        self.label_repo.find_by_type(marker_type).await
    }
}

fn public_ids(hosted: &[(HostedImage, String)]) -> Vec<String> {
    hosted.iter().map(|(h, _)| h.public_id.clone()).collect()
}

/// Split an update's images into files to upload and stored rows to remove.
///
/// Files are matched to stored images by original file name.
fn reconcile_images(
    current: Vec<marker_image::Model>,
    incoming: Vec<UploadedImage>,
) -> (Vec<UploadedImage>, Vec<marker_image::Model>) {
    let stored: HashSet<&str> = current.iter().map(|img| img.original_name.as_str()).collect();
    let wanted: HashSet<&str> = incoming.iter().map(|img| img.file_name.as_str()).collect();

    let to_remove: Vec<marker_image::Model> = current
        .iter()
        .filter(|img| !wanted.contains(img.original_name.as_str()))
        .cloned()
        .collect();
    let to_upload: Vec<UploadedImage> = incoming
        .iter()
        .filter(|img| !stored.contains(img.file_name.as_str()))
        .cloned()
        .collect();

    (to_upload, to_remove)
}
