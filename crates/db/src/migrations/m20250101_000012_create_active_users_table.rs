//! Create active users table migration.

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
                    .table(ActiveUsers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ActiveUsers::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ActiveUsers::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(ActiveUsers::Year).integer().not_null())
                    .col(ColumnDef::new(ActiveUsers::Month).integer().not_null())
                    .col(
                        ColumnDef::new(ActiveUsers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_active_users_user")
                            .from(ActiveUsers::Table, ActiveUsers::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (user_id, year, month) - one row per user per month
        manager
            .create_index(
                Index::create()
                    .name("idx_active_users_user_year_month")
                    .table(ActiveUsers::Table)
                    .col(ActiveUsers::UserId)
                    .col(ActiveUsers::Year)
                    .col(ActiveUsers::Month)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ActiveUsers::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ActiveUsers {
    Table,
    Id,
    UserId,
    Year,
    Month,
    CreatedAt,
}
