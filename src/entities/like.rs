// ABOUTME: Like entity linking a user to a sit they liked
// ABOUTME: One row per (user, sit) pair, enforced by a unique index

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "likes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub sit_id: Uuid,
    pub created_at: i64,
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
    #[sea_orm(
        belongs_to = "super::sit::Entity",
        from = "Column::SitId",
        to = "super::sit::Column::Id",
        on_delete = "Cascade"
    )]
    Sit,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::sit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
