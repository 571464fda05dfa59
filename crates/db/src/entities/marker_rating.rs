//! Marker rating entity (one score per marker and label).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "marker_ratings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub marker_id: String,

    pub label_id: String,

    /// 1..=5
    pub rating: i32,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
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
        belongs_to = "super::rating_label::Entity",
        from = "Column::LabelId",
        to = "super::rating_label::Column::Id",
        on_delete = "Cascade"
    )]
    Label,
}

impl Related<super::marker::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Marker.def()
    }
}

impl Related<super::rating_label::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Label.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
