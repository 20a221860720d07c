//! Title <-> Genre association

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "genre_titles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub genre_id: i32,

    pub title_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::genre::Entity",
        from = "Column::GenreId",
        to = "super::genre::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Genre,

    #[sea_orm(
        belongs_to = "super::title::Entity",
        from = "Column::TitleId",
        to = "super::title::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Title,
}

impl Related<super::genre::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Genre.def()
    }
}

impl Related<super::title::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Title.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
