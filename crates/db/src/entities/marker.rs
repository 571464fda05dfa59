//! Marker entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Place category of a marker.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum MarkerType {
    #[sea_orm(string_value = "park")]
    Park,
    #[sea_orm(string_value = "restaurant")]
    Restaurant,
    #[sea_orm(string_value = "bar")]
    Bar,
    #[sea_orm(string_value = "cafe")]
    Cafe,
    #[sea_orm(string_value = "museum")]
    Museum,
    #[sea_orm(string_value = "monument")]
    Monument,
    #[sea_orm(string_value = "store")]
    Store,
    #[sea_orm(string_value = "hotel")]
    Hotel,
    #[sea_orm(string_value = "beach")]
    Beach,
    #[sea_orm(string_value = "other")]
    Other,
}

/// Who may read a marker.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[sea_orm(string_value = "private")]
    Private,
    #[sea_orm(string_value = "friends")]
    Friends,
    #[sea_orm(string_value = "public")]
    Public,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "markers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owner
    pub user_id: String,

    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub latitude: f64,

    pub longitude: f64,

    #[sea_orm(column_name = "type")]
    pub marker_type: MarkerType,

    /// Owner's free-text note
    #[sea_orm(column_type = "Text", nullable)]
    pub comment: Option<String>,

    pub visibility: Visibility,

    /// Set by moderators; hidden from everyone but admins
    #[sea_orm(default_value = false)]
    pub blocked: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,

    #[sea_orm(has_many = "super::marker_image::Entity")]
    Images,

    #[sea_orm(has_many = "super::marker_rating::Entity")]
    Ratings,

    #[sea_orm(has_many = "super::marker_comment::Entity")]
    Comments,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::marker_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl Related<super::marker_rating::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ratings.def()
    }
}

impl Related<super::marker_comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
