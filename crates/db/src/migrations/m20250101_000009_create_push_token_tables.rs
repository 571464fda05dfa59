//! Create push token tables migration.

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
                    .table(PushTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PushTokens::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PushTokens::Token)
                            .string_len(512)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(PushTokens::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserPushTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserPushTokens::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserPushTokens::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(UserPushTokens::PushTokenId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserPushTokens::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_push_tokens_user")
                            .from(UserPushTokens::Table, UserPushTokens::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_push_tokens_token")
                            .from(UserPushTokens::Table, UserPushTokens::PushTokenId)
                            .to(PushTokens::Table, PushTokens::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (user_id, push_token_id) - link once
        manager
            .create_index(
                Index::create()
                    .name("idx_user_push_tokens_user_token")
                    .table(UserPushTokens::Table)
                    .col(UserPushTokens::UserId)
                    .col(UserPushTokens::PushTokenId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserPushTokens::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PushTokens::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PushTokens {
    Table,
    Id,
    Token,
    CreatedAt,
}

#[derive(Iden)]
enum UserPushTokens {
    Table,
    Id,
    UserId,
    PushTokenId,
    CreatedAt,
}
