//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test -p mappoint-db --features test-utils --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `mappoint_test`)
//!   `TEST_DB_PASSWORD` (default: `mappoint_test`)
//!   `TEST_DB_NAME` (default: `mappoint_test`)

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use mappoint_common::{AppError, IdGenerator};
use mappoint_db::entities::{follow, marker, marker_comment, rating_label, user};
use mappoint_db::repositories::{
    FollowRepository, MarkerCommentRepository, MarkerRatingRepository, MarkerRepository,
    RatingLabelRepository, UserRepository,
};
use mappoint_db::test_utils::{TestDatabase, TestDbConfig};
use sea_orm::Set;

async fn seed_user(repo: &UserRepository, username: &str) -> user::Model {
    repo.create(user::ActiveModel {
        id: Set(IdGenerator::new().generate()),
        username: Set(username.to_string()),
        email: Set(format!("{username}@example.com")),
        password_hash: Set(None),
        gender: Set(user::Gender::Other),
        profile_image_url: Set(None),
        role: Set(user::UserRole::User),
        connection_type: Set(user::ConnectionType::Mail),
        joined_at: Set(Utc::now().into()),
        last_login: Set(None),
        updated_at: Set(None),
    })
    .await
    .unwrap()
}

async fn seed_marker(repo: &MarkerRepository, owner: &str) -> marker::Model {
    repo.create_in(
        repo.connection(),
        marker::ActiveModel {
            id: Set(IdGenerator::new().generate()),
            user_id: Set(owner.to_string()),
            title: Set("Central Park".to_string()),
            description: Set(None),
            latitude: Set(40.785_091),
            longitude: Set(-73.968_285),
            marker_type: Set(marker::MarkerType::Park),
            comment: Set(None),
            visibility: Set(marker::Visibility::Friends),
            blocked: Set(false),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        },
    )
    .await
    .unwrap()
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_database_connection() {
    let config = TestDbConfig::default();
    let result = TestDatabase::with_config(config).await;
    assert!(result.is_ok(), "Failed to connect: {:?}", result.err());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_follow_edge_unique_per_direction() {
    let db = TestDatabase::create_unique().await.unwrap();
    let conn = db.conn.clone();
    let users = UserRepository::new(conn.clone());
    let follows = FollowRepository::new(conn.clone());

    let alice = seed_user(&users, "alice").await;
    let bob = seed_user(&users, "bob").await;

    let edge = |id: String| follow::ActiveModel {
        id: Set(id),
        follower_id: Set(alice.id.clone()),
        followee_id: Set(bob.id.clone()),
        status: Set(follow::FollowStatus::Pending),
        created_at: Set(Utc::now().into()),
        status_changed_at: Set(Utc::now().into()),
    };

    follows
        .create_in(conn.as_ref(), edge(IdGenerator::new().generate()))
        .await
        .unwrap();
    let duplicate = follows
        .create_in(conn.as_ref(), edge(IdGenerator::new().generate()))
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    assert_eq!(follows.delete_by_pair(&alice.id, &bob.id).await.unwrap(), 1);
    assert_eq!(follows.delete_by_pair(&alice.id, &bob.id).await.unwrap(), 0);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_rating_upsert_and_comment_uniqueness() {
    let db = TestDatabase::create_unique().await.unwrap();
    let conn = db.conn.clone();
    let users = UserRepository::new(conn.clone());
    let markers = MarkerRepository::new(conn.clone());
    let labels = RatingLabelRepository::new(conn.clone());
    let ratings = MarkerRatingRepository::new(conn.clone());
    let comments = MarkerCommentRepository::new(conn.clone());

    let owner = seed_user(&users, "owner").await;
    let marker = seed_marker(&markers, &owner.id).await;
    let label = labels
        .create_in(
            conn.as_ref(),
            rating_label::ActiveModel {
                id: Set(IdGenerator::new().generate()),
                marker_type: Set(marker::MarkerType::Park),
                label: Set("cleanliness".to_string()),
                created_at: Set(Utc::now().into()),
            },
        )
        .await
        .unwrap();

    for score in [3, 5] {
        ratings
            .upsert_in(
                conn.as_ref(),
                IdGenerator::new().generate(),
                &marker.id,
                &label.id,
                score,
            )
            .await
            .unwrap();
    }
    let stored = ratings.find_with_labels(&[marker.id.clone()]).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].0.rating, 5);

    let comment = |id: String| marker_comment::ActiveModel {
        id: Set(id),
        marker_id: Set(marker.id.clone()),
        user_id: Set(owner.id.clone()),
        comment: Set("Nice".to_string()),
        rating: Set(4),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    };
    comments
        .create(comment(IdGenerator::new().generate()))
        .await
        .unwrap();
    let second = comments.create(comment(IdGenerator::new().generate())).await;
    assert!(matches!(second, Err(AppError::Conflict(_))));

    db.drop_database().await.unwrap();
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.database.is_empty());
}
