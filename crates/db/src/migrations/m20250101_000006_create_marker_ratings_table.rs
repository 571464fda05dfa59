//! Create marker ratings table migration.

use sea_orm_migration::prelude::*;

use super::m20250101_000003_create_markers_table::Markers;
use super::m20250101_000005_create_rating_labels_table::RatingLabels;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MarkerRatings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MarkerRatings::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MarkerRatings::MarkerId).string_len(32).not_null())
                    .col(ColumnDef::new(MarkerRatings::LabelId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(MarkerRatings::Rating)
                            .integer()
                            .not_null()
                            .check(Expr::col(MarkerRatings::Rating).between(1, 5)),
                    )
                    .col(
                        ColumnDef::new(MarkerRatings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(MarkerRatings::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_marker_ratings_marker")
                            .from(MarkerRatings::Table, MarkerRatings::MarkerId)
                            .to(Markers::Table, Markers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_marker_ratings_label")
                            .from(MarkerRatings::Table, MarkerRatings::LabelId)
                            .to(RatingLabels::Table, RatingLabels::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (marker_id, label_id) - target of the rating upsert
        manager
            .create_index(
                Index::create()
                    .name("idx_marker_ratings_marker_label")
                    .table(MarkerRatings::Table)
                    .col(MarkerRatings::MarkerId)
                    .col(MarkerRatings::LabelId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MarkerRatings::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum MarkerRatings {
    Table,
    Id,
    MarkerId,
    LabelId,
    Rating,
    CreatedAt,
    UpdatedAt,
}
