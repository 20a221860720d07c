//! Title entity: a reviewable work

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "titles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "String(StringLen::N(256))")]
    pub name: String,

    pub year: i32,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    /// Nulled when the category is deleted
    pub category_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Category,

    #[sea_orm(has_many = "super::genre_title::Entity")]
    GenreTitles,

    #[sea_orm(has_many = "super::review::Entity")]
    Reviews,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::genre_title::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GenreTitles.def()
    }
}

impl Related<super::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviews.def()
    }
}

impl Related<super::genre::Entity> for Entity {
    fn to() -> RelationDef {
        super::genre_title::Relation::Genre.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::genre_title::Relation::Title.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
