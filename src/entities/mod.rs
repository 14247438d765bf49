// ABOUTME: SeaORM entities module for users, sits, and the social tables around them
// ABOUTME: Exports entity definitions for follow edges, likes, favourites, notifications, and messages

pub mod user;
pub mod sit;
pub mod relationship;
pub mod like;
pub mod favourite;
pub mod notification;
pub mod message;
