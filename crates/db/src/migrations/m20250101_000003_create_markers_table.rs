//! Create markers table migration.

use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_users_table::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Markers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Markers::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Markers::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Markers::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Markers::Description).text())
                    .col(ColumnDef::new(Markers::Latitude).double().not_null())
                    .col(ColumnDef::new(Markers::Longitude).double().not_null())
                    .col(ColumnDef::new(Markers::Type).string_len(32).not_null())
                    .col(ColumnDef::new(Markers::Comment).text())
                    .col(
                        ColumnDef::new(Markers::Visibility)
                            .string_len(16)
                            .not_null()
                            .default("private"),
                    )
                    .col(
                        ColumnDef::new(Markers::Blocked)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Markers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Markers::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_markers_user")
                            .from(Markers::Table, Markers::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: user_id (markers by owner)
        manager
            .create_index(
                Index::create()
                    .name("idx_markers_user_id")
                    .table(Markers::Table)
                    .col(Markers::UserId)
                    .to_owned(),
            )
            .await?;

        // Index: visibility (scope queries)
        manager
            .create_index(
                Index::create()
                    .name("idx_markers_visibility")
                    .table(Markers::Table)
                    .col(Markers::Visibility)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Markers::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Markers {
    Table,
    Id,
    UserId,
    Title,
    Description,
    Latitude,
    Longitude,
    Type,
    Comment,
    Visibility,
    Blocked,
    CreatedAt,
    UpdatedAt,
}
