//! Create rating labels table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RatingLabels::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RatingLabels::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RatingLabels::MarkerType).string_len(32).not_null())
                    .col(ColumnDef::new(RatingLabels::Label).string_len(100).not_null())
                    .col(
                        ColumnDef::new(RatingLabels::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (marker_type, label) - a label exists once per type
        manager
            .create_index(
                Index::create()
                    .name("idx_rating_labels_type_label")
                    .table(RatingLabels::Table)
                    .col(RatingLabels::MarkerType)
                    .col(RatingLabels::Label)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RatingLabels::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum RatingLabels {
    Table,
    Id,
    MarkerType,
    Label,
    CreatedAt,
}
