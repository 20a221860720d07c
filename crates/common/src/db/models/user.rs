//! User entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Access role of a user.
///
/// Stored as a short string; values outside this set are rejected on read.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "moderator")]
    Moderator,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "String(StringLen::N(150))", unique)]
    pub username: String,

    #[sea_orm(column_type = "String(StringLen::N(254))", unique)]
    pub email: String,

    #[sea_orm(column_type = "String(StringLen::N(150))")]
    pub first_name: String,

    #[sea_orm(column_type = "String(StringLen::N(150))")]
    pub last_name: String,

    #[sea_orm(column_type = "Text")]
    pub bio: String,

    pub role: Role,

    pub is_superuser: bool,

    /// SHA-256 digest of the outstanding confirmation code, cleared once exchanged
    #[sea_orm(column_type = "Text", nullable)]
    #[serde(skip_serializing)]
    pub confirmation_code_hash: Option<String>,

    pub date_joined: DateTimeWithTimeZone,
}

impl Model {
    /// Admin capability: the admin role or the superuser flag
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin || self.is_superuser
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::review::Entity")]
    Reviews,

    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,
}

impl Related<super::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviews.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
