//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250101_000001_create_users_table;
mod m20250101_000002_create_follow_table;
mod m20250101_000003_create_markers_table;
mod m20250101_000004_create_marker_images_table;
mod m20250101_000005_create_rating_labels_table;
mod m20250101_000006_create_marker_ratings_table;
mod m20250101_000007_create_marker_comments_table;
mod m20250101_000008_create_notifications_table;
mod m20250101_000009_create_push_token_tables;
mod m20250101_000010_create_password_reset_tokens_table;
mod m20250101_000011_create_announcements_table;
mod m20250101_000012_create_active_users_table;

/// Database migrator.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_users_table::Migration),
            Box::new(m20250101_000002_create_follow_table::Migration),
            Box::new(m20250101_000003_create_markers_table::Migration),
            Box::new(m20250101_000004_create_marker_images_table::Migration),
            Box::new(m20250101_000005_create_rating_labels_table::Migration),
            Box::new(m20250101_000006_create_marker_ratings_table::Migration),
            Box::new(m20250101_000007_create_marker_comments_table::Migration),
            Box::new(m20250101_000008_create_notifications_table::Migration),
            Box::new(m20250101_000009_create_push_token_tables::Migration),
            Box::new(m20250101_000010_create_password_reset_tokens_table::Migration),
            Box::new(m20250101_000011_create_announcements_table::Migration),
            Box::new(m20250101_000012_create_active_users_table::Migration),
        ]
    }
}
