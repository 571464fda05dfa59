//! Marker aggregation.
//!
//! Attaches images, per-label ratings and comment statistics to markers.
//! The two averages are kept apart: `average_rating` is over label ratings,
//! `average_comment_rating` over the ratings carried by comments.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use mappoint_common::{AppError, AppResult};
use mappoint_db::{
    entities::{marker, marker_comment, marker_image, marker_rating, rating_label},
    repositories::{MarkerCommentRepository, MarkerImageRepository, MarkerRatingRepository},
};
use serde::Serialize;

/// A `{label, rating}` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelRating {
    pub label: String,
    pub rating: i32,
}

/// A marker with everything a client renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerView {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "type")]
    pub marker_type: marker::MarkerType,
    pub comment: Option<String>,
    pub visibility: marker::Visibility,
    pub blocked: bool,
    pub created_at: DateTime<FixedOffset>,
    pub images: Vec<String>,
    pub ratings: Vec<LabelRating>,
    pub comments_count: usize,
    pub average_rating: f64,
    pub average_comment_rating: f64,
}

fn mean(values: &[i32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    f64::from(values.iter().sum::<i32>()) / values.len() as f64
}

/// Shape loaded rows into views, keeping the order of `markers`.
#[must_use]
pub fn assemble(
    markers: Vec<marker::Model>,
    images: Vec<marker_image::Model>,
    ratings: Vec<(marker_rating::Model, Option<rating_label::Model>)>,
    comments: Vec<marker_comment::Model>,
) -> Vec<MarkerView> {
    let mut images_by_marker: HashMap<String, Vec<String>> = HashMap::new();
    for image in images {
        images_by_marker
            .entry(image.marker_id)
            .or_default()
            .push(image.image_url);
    }

    let mut labelled: HashMap<String, Vec<LabelRating>> = HashMap::new();
    let mut scores: HashMap<String, Vec<i32>> = HashMap::new();
    for (rating, label) in ratings {
        scores
            .entry(rating.marker_id.clone())
            .or_default()
            .push(rating.rating);
        if let Some(label) = label {
            labelled
                .entry(rating.marker_id)
                .or_default()
                .push(LabelRating {
                    label: label.label,
                    rating: rating.rating,
                });
        }
    }

    let mut comment_scores: HashMap<String, Vec<i32>> = HashMap::new();
    for comment in comments {
        comment_scores
            .entry(comment.marker_id)
            .or_default()
            .push(comment.rating);
    }

    markers
        .into_iter()
        .map(|m| {
            let marker_scores = scores.remove(&m.id).unwrap_or_default();
            let marker_comment_scores = comment_scores.remove(&m.id).unwrap_or_default();
            MarkerView {
                images: images_by_marker.remove(&m.id).unwrap_or_default(),
                ratings: labelled.remove(&m.id).unwrap_or_default(),
                comments_count: marker_comment_scores.len(),
                average_rating: mean(&marker_scores),
                average_comment_rating: mean(&marker_comment_scores),
                id: m.id,
                user_id: m.user_id,
                title: m.title,
                description: m.description,
                latitude: m.latitude,
                longitude: m.longitude,
                marker_type: m.marker_type,
                comment: m.comment,
                visibility: m.visibility,
                blocked: m.blocked,
                created_at: m.created_at,
            }
        })
        .collect()
}

/// Loads the rows [`assemble`] needs for a batch of markers.
#[derive(Clone)]
pub struct MarkerAggregator {
    image_repo: MarkerImageRepository,
    rating_repo: MarkerRatingRepository,
    comment_repo: MarkerCommentRepository,
}

impl MarkerAggregator {
    #[must_use]
    pub const fn new(
        image_repo: MarkerImageRepository,
        rating_repo: MarkerRatingRepository,
        comment_repo: MarkerCommentRepository,
    ) -> Self {
        Self {
            image_repo,
            rating_repo,
            comment_repo,
        }
    }

    /// Aggregate a batch of markers with three queries in total.
    pub async fn aggregate(&self, markers: Vec<marker::Model>) -> AppResult<Vec<MarkerView>> {
        if markers.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<String> = markers.iter().map(|m| m.id.clone()).collect();
        let images = self.image_repo.find_by_markers(&ids).await?;
        let ratings = self.rating_repo.find_with_labels(&ids).await?;
        let comments = self.comment_repo.find_by_markers(&ids).await?;

        Ok(assemble(markers, images, ratings, comments))
    }

    /// Aggregate a single marker.
    pub async fn aggregate_one(&self, marker: marker::Model) -> AppResult<MarkerView> {
        let id = marker.id.clone();
        self.aggregate(vec![marker])
            .await?
            .pop()
            .ok_or(AppError::MarkerNotFound(id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_marker(id: &str) -> marker::Model {
        marker::Model {
            id: id.to_string(),
            user_id: "owner".to_string(),
            title: "Central Park".to_string(),
            description: Some("Big and green".to_string()),
            latitude: 40.785_091,
            longitude: -73.968_285,
            marker_type: marker::MarkerType::Park,
            comment: None,
            visibility: marker::Visibility::Public,
            blocked: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn image(marker_id: &str, url: &str) -> marker_image::Model {
        marker_image::Model {
            id: format!("img-{url}"),
            marker_id: marker_id.to_string(),
            user_id: "owner".to_string(),
            image_url: url.to_string(),
            public_id: url.to_string(),
            original_name: format!("{url}.jpg"),
            created_at: Utc::now().into(),
        }
    }

    fn rating(marker_id: &str, label: &str, value: i32) -> (marker_rating::Model, Option<rating_label::Model>) {
        (
            marker_rating::Model {
                id: format!("r-{label}"),
                marker_id: marker_id.to_string(),
                label_id: format!("l-{label}"),
                rating: value,
                created_at: Utc::now().into(),
                updated_at: None,
            },
            Some(rating_label::Model {
                id: format!("l-{label}"),
                marker_type: marker::MarkerType::Park,
                label: label.to_string(),
                created_at: Utc::now().into(),
            }),
        )
    }

    fn comment(marker_id: &str, user_id: &str, value: i32) -> marker_comment::Model {
        marker_comment::Model {
            id: format!("c-{user_id}"),
            marker_id: marker_id.to_string(),
            user_id: user_id.to_string(),
            comment: "Nice".to_string(),
            rating: value,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[test]
    fn test_empty_marker_has_zero_averages() {
        let views = assemble(vec![create_test_marker("m1")], vec![], vec![], vec![]);

        assert_eq!(views.len(), 1);
        assert!(views[0].images.is_empty());
        assert!(views[0].ratings.is_empty());
        assert_eq!(views[0].comments_count, 0);
        assert_eq!(views[0].average_rating, 0.0);
        assert_eq!(views[0].average_comment_rating, 0.0);
    }

    #[test]
    fn test_averages_are_kept_apart() {
        let views = assemble(
            vec![create_test_marker("m1")],
            vec![],
            vec![rating("m1", "cleanliness", 5), rating("m1", "calm", 2)],
            vec![comment("m1", "u1", 1), comment("m1", "u2", 2)],
        );

        assert_eq!(views[0].average_rating, 3.5);
        assert_eq!(views[0].average_comment_rating, 1.5);
        assert_eq!(views[0].comments_count, 2);
    }

    #[test]
    fn test_rows_go_to_their_marker() {
        let views = assemble(
            vec![create_test_marker("m1"), create_test_marker("m2")],
            vec![image("m1", "a"), image("m1", "b"), image("m2", "c")],
            vec![rating("m2", "cleanliness", 4)],
            vec![comment("m1", "u1", 3)],
        );

        assert_eq!(views[0].id, "m1");
        assert_eq!(views[0].images, vec!["a".to_string(), "b".to_string()]);
        assert!(views[0].ratings.is_empty());
        assert_eq!(views[1].images, vec!["c".to_string()]);
        assert_eq!(
            views[1].ratings,
            vec![LabelRating {
                label: "cleanliness".to_string(),
                rating: 4
            }]
        );
        assert_eq!(views[1].comments_count, 0);
    }

    #[test]
    fn test_rating_without_label_still_averages() {
        let (orphan, _) = rating("m1", "gone", 1);
        let views = assemble(
            vec![create_test_marker("m1")],
            vec![],
            vec![(orphan, None), rating("m1", "calm", 3)],
            vec![],
        );

        assert_eq!(views[0].ratings.len(), 1);
        assert_eq!(views[0].average_rating, 2.0);
    }

    #[test]
    fn test_view_serializes_type_field() {
        let views = assemble(vec![create_test_marker("m1")], vec![], vec![], vec![]);
        let json = serde_json::to_value(&views[0]).unwrap();

        assert_eq!(json["type"], "park");
        assert_eq!(json["visibility"], "public");
        assert_eq!(json["images"], serde_json::json!([]));
        assert_eq!(json["average_rating"], 0.0);
    }

    #[tokio::test]
    async fn test_aggregate_empty_batch_skips_queries() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let aggregator = MarkerAggregator::new(
            MarkerImageRepository::new(db.clone()),
            MarkerRatingRepository::new(db.clone()),
            MarkerCommentRepository::new(db),
        );

        assert!(aggregator.aggregate(vec![]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_aggregate_one() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[image("m1", "a"), image("m1", "b")]])
                .append_query_results([Vec::<marker_rating::Model>::new()])
                .append_query_results([[comment("m1", "u1", 4)]])
                .into_connection(),
        );
        let aggregator = MarkerAggregator::new(
            MarkerImageRepository::new(db.clone()),
            MarkerRatingRepository::new(db.clone()),
            MarkerCommentRepository::new(db),
        );

        let view = aggregator
            .aggregate_one(create_test_marker("m1"))
            .await
            .unwrap();

        assert_eq!(view.images.len(), 2);
        assert_eq!(view.average_rating, 0.0);
        assert_eq!(view.average_comment_rating, 4.0);
    }
}
