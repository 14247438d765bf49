// ABOUTME: Schema migrations for the opensit database, applied at startup and in test setup
// ABOUTME: Migrations run in the order listed by the Migrator

use sea_orm_migration::prelude::*;

mod m20240301_000001_create_social_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20240301_000001_create_social_tables::Migration)]
    }
}
