//! Announcement entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Announcement published by an administrator.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "announcements")]
pub struct Model {
    /// Unique announcement ID.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Author.
    pub user_id: String,

    /// Title of the announcement.
    pub title: String,

    /// Markdown body, taken from the uploaded file.
    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// When the announcement was created.
    pub created_at: DateTimeWithTimeZone,

    /// When the announcement was last updated.
    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

/// Relationships.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Author,
}

impl ActiveModelBehavior for ActiveModel {}
