//! Create notifications table migration.

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
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notifications::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Notifications::ReceiverId).string_len(32).not_null())
                    .col(ColumnDef::new(Notifications::SenderId).string_len(32).not_null())
                    .col(ColumnDef::new(Notifications::Type).string_len(32).not_null())
                    .col(ColumnDef::new(Notifications::Content).text())
                    .col(
                        ColumnDef::new(Notifications::IsRead)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Notifications::EventId).string_len(32))
                    .col(
                        ColumnDef::new(Notifications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Notifications::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notifications_receiver")
                            .from(Notifications::Table, Notifications::ReceiverId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notifications_sender")
                            .from(Notifications::Table, Notifications::SenderId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (receiver_id, sender_id, type) - dedup lookup
        manager
            .create_index(
                Index::create()
                    .name("idx_notifications_receiver_sender_type")
                    .table(Notifications::Table)
                    .col(Notifications::ReceiverId)
                    .col(Notifications::SenderId)
                    .col(Notifications::Type)
                    .to_owned(),
            )
            .await?;

        // Index: (receiver_id, is_read) - unread counts
        manager
            .create_index(
                Index::create()
                    .name("idx_notifications_receiver_is_read")
                    .table(Notifications::Table)
                    .col(Notifications::ReceiverId)
                    .col(Notifications::IsRead)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Notifications {
    Table,
    Id,
    ReceiverId,
    SenderId,
    Type,
    Content,
    IsRead,
    EventId,
    CreatedAt,
    UpdatedAt,
}
