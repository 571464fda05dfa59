//! Create marker comments table migration.

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
                    .table(MarkerComments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MarkerComments::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MarkerComments::MarkerId).string_len(32).not_null())
                    .col(ColumnDef::new(MarkerComments::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(MarkerComments::Comment).text().not_null())
                    .col(
                        ColumnDef::new(MarkerComments::Rating)
                            .integer()
                            .not_null()
                            .check(Expr::col(MarkerComments::Rating).between(1, 5)),
                    )
                    .col(
                        ColumnDef::new(MarkerComments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(MarkerComments::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_marker_comments_marker")
                            .from(MarkerComments::Table, MarkerComments::MarkerId)
                            .to(Markers::Table, Markers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_marker_comments_user")
                            .from(MarkerComments::Table, MarkerComments::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (marker_id, user_id) - one comment per user per marker
        manager
            .create_index(
                Index::create()
                    .name("idx_marker_comments_marker_user")
                    .table(MarkerComments::Table)
                    .col(MarkerComments::MarkerId)
                    .col(MarkerComments::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MarkerComments::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum MarkerComments {
    Table,
    Id,
    MarkerId,
    UserId,
    Comment,
    Rating,
    CreatedAt,
    UpdatedAt,
}
