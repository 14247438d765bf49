// ABOUTME: User entity definition for SeaORM with profile fields and counter caches
// ABOUTME: Owns sits, likes, favourites, notifications, and both ends of follow edges

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub private_stream: bool,
    pub streak: i32,
    pub sits_count: i32,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sit::Entity")]
    Sits,
    #[sea_orm(has_many = "super::like::Entity")]
    Likes,
    #[sea_orm(has_many = "super::favourite::Entity")]
    Favourites,
    #[sea_orm(has_many = "super::notification::Entity")]
    Notifications,
}

impl Related<super::sit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sits.def()
    }
}

impl Related<super::like::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Likes.def()
    }
}

impl Related<super::favourite::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Favourites.def()
    }
}

impl Related<super::notification::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notifications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl Model {
    pub fn display_name(&self) -> String {
        match (present(&self.first_name), present(&self.last_name)) {
            (None, _) => self.username.clone(),
            (Some(first), None) => first.to_string(),
            (Some(first), Some(last)) => format!("{} {}", first, last),
        }
    }

    /// "City, Country", whichever half is filled in, or nothing.
    pub fn location(&self) -> Option<String> {
        match (present(&self.city), present(&self.country)) {
            (Some(city), Some(country)) => Some(format!("{}, {}", city, country)),
            (Some(city), None) => Some(city.to_string()),
            (None, Some(country)) => Some(country.to_string()),
            (None, None) => None,
        }
    }
}
