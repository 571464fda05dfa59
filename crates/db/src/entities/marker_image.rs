//! Marker image entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "marker_images")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub marker_id: String,

    /// Uploader
    pub user_id: String,

    pub image_url: String,

    /// Identifier on the image host
    pub public_id: String,

    /// File name as uploaded, used to reconcile images on update
    pub original_name: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::marker::Entity",
        from = "Column::MarkerId",
        to = "super::marker::Column::Id",
        on_delete = "Cascade"
    )]
    Marker,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::marker::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Marker.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
