// ABOUTME: Shared helpers for tests that need a migrated throwaway database
// ABOUTME: Each call gets its own SQLite file inside a temporary directory

use chrono::{DateTime, TimeZone, Utc};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use tempfile::TempDir;

use crate::entities::{sit, user};
use crate::storage::Storage;
use crate::types::{EntryKind, NewUser};

pub async fn create_test_storage() -> (Arc<Storage>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
    let db = Database::connect(&db_url).await.unwrap();

    crate::migration::Migrator::up(&db, None).await.unwrap();

    (Arc::new(Storage { db }), temp_dir)
}

pub async fn create_test_user(storage: &Storage, username: &str) -> user::Model {
    storage
        .create_user(&NewUser {
            username: username.to_string(),
            ..Default::default()
        })
        .await
        .unwrap()
}

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

/// Logs a 20 minute sit for `author` at noon UTC on the given day.
pub async fn sit_on(
    storage: &Storage,
    author: &user::Model,
    year: i32,
    month: u32,
    day: u32,
) -> sit::Model {
    storage
        .create_sit(
            author,
            &EntryKind::TimedPractice { duration: 20 },
            "",
            None,
            at(year, month, day).timestamp(),
        )
        .await
        .unwrap()
}
