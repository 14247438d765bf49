// ABOUTME: Initial migration creating users, sits, follow edges, likes, favourites, notifications, and messages
// ABOUTME: Follow edges, likes, and favourites carry unique indexes; ownership is expressed as cascading foreign keys

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::Username).string_len(20).not_null().unique_key())
                    .col(ColumnDef::new(Users::Email).string())
                    .col(ColumnDef::new(Users::FirstName).string())
                    .col(ColumnDef::new(Users::LastName).string())
                    .col(ColumnDef::new(Users::City).string())
                    .col(ColumnDef::new(Users::Country).string())
                    .col(ColumnDef::new(Users::PrivateStream).boolean().not_null().default(false))
                    .col(ColumnDef::new(Users::Streak).integer().not_null().default(0))
                    .col(ColumnDef::new(Users::SitsCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Users::CreatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        // Create sits table
        manager
            .create_table(
                Table::create()
                    .table(Sits::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Sits::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Sits::UserId).uuid().not_null())
                    .col(ColumnDef::new(Sits::SType).integer().not_null().default(0))
                    .col(ColumnDef::new(Sits::Duration).integer())
                    .col(ColumnDef::new(Sits::Title).string())
                    .col(ColumnDef::new(Sits::Body).text().not_null().default(""))
                    .col(ColumnDef::new(Sits::Private).boolean().not_null().default(false))
                    .col(ColumnDef::new(Sits::CreatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sits_user_id")
                            .from(Sits::Table, Sits::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sits_user_created")
                    .table(Sits::Table)
                    .col(Sits::UserId)
                    .col(Sits::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Create relationships table
        manager
            .create_table(
                Table::create()
                    .table(Relationships::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Relationships::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Relationships::FollowerId).uuid().not_null())
                    .col(ColumnDef::new(Relationships::FollowedId).uuid().not_null())
                    .col(ColumnDef::new(Relationships::CreatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_relationships_follower_id")
                            .from(Relationships::Table, Relationships::FollowerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_relationships_followed_id")
                            .from(Relationships::Table, Relationships::FollowedId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .index(
                        Index::create()
                            .name("idx_relationship_unique")
                            .table(Relationships::Table)
                            .col(Relationships::FollowerId)
                            .col(Relationships::FollowedId)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;

        // Create likes table
        manager
            .create_table(
                Table::create()
                    .table(Likes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Likes::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Likes::UserId).uuid().not_null())
                    .col(ColumnDef::new(Likes::SitId).uuid().not_null())
                    .col(ColumnDef::new(Likes::CreatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_likes_user_id")
                            .from(Likes::Table, Likes::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_likes_sit_id")
                            .from(Likes::Table, Likes::SitId)
                            .to(Sits::Table, Sits::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .index(
                        Index::create()
                            .name("idx_like_unique")
                            .table(Likes::Table)
                            .col(Likes::UserId)
                            .col(Likes::SitId)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;

        // Create favourites table
        manager
            .create_table(
                Table::create()
                    .table(Favourites::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Favourites::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Favourites::UserId).uuid().not_null())
                    .col(ColumnDef::new(Favourites::SitId).uuid().not_null())
                    .col(ColumnDef::new(Favourites::CreatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_favourites_user_id")
                            .from(Favourites::Table, Favourites::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_favourites_sit_id")
                            .from(Favourites::Table, Favourites::SitId)
                            .to(Sits::Table, Sits::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .index(
                        Index::create()
                            .name("idx_favourite_unique")
                            .table(Favourites::Table)
                            .col(Favourites::UserId)
                            .col(Favourites::SitId)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;

        // Create notifications table
        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Notifications::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Notifications::UserId).uuid().not_null())
                    .col(ColumnDef::new(Notifications::EventType).string().not_null())
                    .col(ColumnDef::new(Notifications::Payload).text().not_null())
                    .col(ColumnDef::new(Notifications::Read).boolean().not_null().default(false))
                    .col(ColumnDef::new(Notifications::CreatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notifications_user_id")
                            .from(Notifications::Table, Notifications::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Messages outlive either participant, so no foreign keys here
        manager
            .create_table(
                Table::create()
                    .table(Messages::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Messages::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Messages::FromUserId).uuid().not_null())
                    .col(ColumnDef::new(Messages::ToUserId).uuid().not_null())
                    .col(ColumnDef::new(Messages::Subject).string().not_null())
                    .col(ColumnDef::new(Messages::Body).text().not_null())
                    .col(ColumnDef::new(Messages::Read).boolean().not_null().default(false))
                    .col(ColumnDef::new(Messages::SenderDeleted).boolean().not_null().default(false))
                    .col(ColumnDef::new(Messages::ReceiverDeleted).boolean().not_null().default(false))
                    .col(ColumnDef::new(Messages::CreatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Messages::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Favourites::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Likes::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Relationships::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Sits::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Email,
    FirstName,
    LastName,
    City,
    Country,
    PrivateStream,
    Streak,
    SitsCount,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Sits {
    Table,
    Id,
    UserId,
    #[sea_orm(iden = "s_type")]
    SType,
    Duration,
    Title,
    Body,
    Private,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Relationships {
    Table,
    Id,
    FollowerId,
    FollowedId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Likes {
    Table,
    Id,
    UserId,
    SitId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Favourites {
    Table,
    Id,
    UserId,
    SitId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Notifications {
    Table,
    Id,
    UserId,
    EventType,
    Payload,
    Read,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Messages {
    Table,
    Id,
    FromUserId,
    ToUserId,
    Subject,
    Body,
    Read,
    SenderDeleted,
    ReceiverDeleted,
    CreatedAt,
}
