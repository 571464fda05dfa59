//! Create marker images table migration.

use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_users_table::Users;
use super::m20250101_000003_create_markers_table::Markers;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MarkerImages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MarkerImages::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MarkerImages::MarkerId).string_len(32).not_null())
                    .col(ColumnDef::new(MarkerImages::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(MarkerImages::ImageUrl).string_len(1024).not_null())
                    .col(ColumnDef::new(MarkerImages::PublicId).string_len(512).not_null())
                    .col(
                        ColumnDef::new(MarkerImages::OriginalName)
                            .string_len(512)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarkerImages::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_marker_images_marker")
                            .from(MarkerImages::Table, MarkerImages::MarkerId)
                            .to(Markers::Table, Markers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_marker_images_user")
                            .from(MarkerImages::Table, MarkerImages::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_marker_images_marker_id")
                    .table(MarkerImages::Table)
                    .col(MarkerImages::MarkerId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MarkerImages::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum MarkerImages {
    Table,
    Id,
    MarkerId,
    UserId,
    ImageUrl,
    PublicId,
    OriginalName,
    CreatedAt,
}
