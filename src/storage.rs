// ABOUTME: SeaORM storage layer for users, sits, follow edges, and the social tables around them
// ABOUTME: Owns every query and transaction; the graph and stream modules build on these primitives

use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, Database, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
    TransactionTrait,
};
use sea_orm_migration::MigratorTrait;
use std::collections::HashMap;
use uuid::Uuid;

use crate::entities::{favourite, like, message, notification, relationship, sit, user};
use crate::error::{AppError, Result};
use crate::types::{EntryKind, NewUser};

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 20;
const SEARCH_LIMIT: u64 = 50;

/// Half-open `[from, until)` window over `created_at`, in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub from: i64,
    pub until: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitOrder {
    NewestFirst,
    OldestFirst,
}

pub struct Storage {
    pub db: DatabaseConnection,
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn validate_username(username: &str) -> Result<()> {
    let length = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&length) {
        return Err(AppError::InvalidArgument(format!(
            "Username must be between {} and {} characters",
            USERNAME_MIN, USERNAME_MAX
        )));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(AppError::InvalidArgument(
            "Username can't contain spaces".to_string(),
        ));
    }
    Ok(())
}

/// Parses the privacy toggle the way the profile form submits it.
pub fn parse_privacy_flag(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(AppError::InvalidArgument(
            "Argument must be either 'true' or 'false'".to_string(),
        )),
    }
}

/// Restores the order of `ids` over rows fetched with an `IN` filter.
fn in_id_order<T>(ids: &[Uuid], rows: Vec<T>, id_of: impl Fn(&T) -> Uuid) -> Vec<T> {
    let mut by_id: HashMap<Uuid, T> = rows.into_iter().map(|row| (id_of(&row), row)).collect();
    ids.iter().filter_map(|id| by_id.remove(id)).collect()
}

impl Storage {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let db = Database::connect(database_url).await?;
        crate::migration::Migrator::up(&db, None).await?;
        tracing::info!("database ready at {}", database_url);

        Ok(Self { db })
    }

    // Users

    pub async fn create_user(&self, new_user: &NewUser) -> Result<user::Model> {
        validate_username(&new_user.username)?;

        if self.find_user_by_username(&new_user.username).await?.is_some() {
            return Err(AppError::Conflict("Username has already been taken".to_string()));
        }

        let user = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(new_user.username.clone()),
            email: Set(new_user.email.clone()),
            first_name: Set(new_user.first_name.clone()),
            last_name: Set(new_user.last_name.clone()),
            city: Set(new_user.city.clone()),
            country: Set(new_user.country.clone()),
            private_stream: Set(new_user.private_stream),
            streak: Set(0),
            sits_count: Set(0),
            created_at: Set(now()),
        };

        user.insert(&self.db).await.map_err(|err| {
            if is_unique_violation(&err) {
                AppError::Conflict("Username has already been taken".to_string())
            } else {
                err.into()
            }
        })
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<user::Model> {
        user::Entity::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<user::Model>> {
        Ok(user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?)
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<user::Model> {
        self.find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", username)))
    }

    pub async fn get_users(&self, user_ids: &[Uuid]) -> Result<Vec<user::Model>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let users = user::Entity::find()
            .filter(user::Column::Id.is_in(user_ids.to_vec()))
            .all(&self.db)
            .await?;
        Ok(in_id_order(user_ids, users, |u| u.id))
    }

    /// Deletes the user with everything they own and every follow edge touching them.
    pub async fn delete_user(&self, user_id: Uuid) -> Result<()> {
        let txn = self.db.begin().await?;

        relationship::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(relationship::Column::FollowerId.eq(user_id))
                    .add(relationship::Column::FollowedId.eq(user_id)),
            )
            .exec(&txn)
            .await?;

        let sit_ids: Vec<Uuid> = sit::Entity::find()
            .select_only()
            .column(sit::Column::Id)
            .filter(sit::Column::UserId.eq(user_id))
            .into_tuple::<Uuid>()
            .all(&txn)
            .await?;

        like::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(like::Column::UserId.eq(user_id))
                    .add(like::Column::SitId.is_in(sit_ids.clone())),
            )
            .exec(&txn)
            .await?;

        favourite::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(favourite::Column::UserId.eq(user_id))
                    .add(favourite::Column::SitId.is_in(sit_ids)),
            )
            .exec(&txn)
            .await?;

        sit::Entity::delete_many()
            .filter(sit::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        notification::Entity::delete_many()
            .filter(notification::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        let deleted = user::Entity::delete_by_id(user_id).exec(&txn).await?;
        if deleted.rows_affected == 0 {
            // Dropping the transaction rolls it back
            return Err(AppError::NotFound(format!("User {}", user_id)));
        }

        txn.commit().await?;
        tracing::info!(%user_id, "deleted user and owned records");
        Ok(())
    }

    /// Sets the stream privacy flag and applies it to every existing sit of the user.
    pub async fn set_private_stream(&self, user_id: Uuid, value: &str) -> Result<bool> {
        let private = parse_privacy_flag(value)?;
        let txn = self.db.begin().await?;

        let updated = user::Entity::update_many()
            .col_expr(user::Column::PrivateStream, Expr::value(private))
            .filter(user::Column::Id.eq(user_id))
            .exec(&txn)
            .await?;
        if updated.rows_affected == 0 {
            return Err(AppError::NotFound(format!("User {}", user_id)));
        }

        sit::Entity::update_many()
            .col_expr(sit::Column::Private, Expr::value(private))
            .filter(sit::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(private)
    }

    pub async fn set_streak(&self, user_id: Uuid, streak: i32) -> Result<()> {
        user::Entity::update_many()
            .col_expr(user::Column::Streak, Expr::value(streak))
            .filter(user::Column::Id.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    pub async fn search_users(&self, query: &str) -> Result<Vec<user::Model>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let matches = Condition::any()
            .add(user::Column::Username.contains(query))
            .add(user::Column::FirstName.contains(query))
            .add(user::Column::LastName.contains(query))
            .add(user::Column::City.contains(query))
            .add(user::Column::Country.contains(query));

        Ok(user::Entity::find()
            .filter(matches)
            .order_by_asc(user::Column::Username)
            .limit(SEARCH_LIMIT)
            .all(&self.db)
            .await?)
    }

    pub async fn newest_users(&self, count: u64) -> Result<Vec<user::Model>> {
        Ok(user::Entity::find()
            .order_by_desc(user::Column::CreatedAt)
            .order_by_desc(user::Column::Id)
            .limit(count)
            .all(&self.db)
            .await?)
    }

    /// Users with public streams, most prolific first.
    pub async fn active_users(&self) -> Result<Vec<user::Model>> {
        Ok(user::Entity::find()
            .filter(user::Column::PrivateStream.eq(false))
            .order_by_desc(user::Column::SitsCount)
            .order_by_asc(user::Column::Username)
            .all(&self.db)
            .await?)
    }

    // Sits

    /// Stores a new sit. Privacy falls back to the author's stream setting.
    pub async fn create_sit(
        &self,
        author: &user::Model,
        kind: &EntryKind,
        body: &str,
        private: Option<bool>,
        created_at: i64,
    ) -> Result<sit::Model> {
        kind.validate()?;
        let txn = self.db.begin().await?;

        let sit = sit::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(author.id),
            s_type: Set(kind.code()),
            duration: Set(kind.duration()),
            title: Set(kind.title().map(str::to_string)),
            body: Set(body.to_string()),
            private: Set(private.unwrap_or(author.private_stream)),
            created_at: Set(created_at),
        }
        .insert(&txn)
        .await?;

        user::Entity::update_many()
            .col_expr(
                user::Column::SitsCount,
                Expr::col(user::Column::SitsCount).add(1),
            )
            .filter(user::Column::Id.eq(author.id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(sit)
    }

    pub async fn get_sit(&self, sit_id: Uuid) -> Result<sit::Model> {
        sit::Entity::find_by_id(sit_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Sit {}", sit_id)))
    }

    /// Deletes a sit on behalf of `owner_id`; only the author may do so.
    pub async fn delete_sit(&self, owner_id: Uuid, sit_id: Uuid) -> Result<()> {
        let sit = self.get_sit(sit_id).await?;
        if sit.user_id != owner_id {
            return Err(AppError::Forbidden("Only the author can delete a sit".to_string()));
        }

        let txn = self.db.begin().await?;

        like::Entity::delete_many()
            .filter(like::Column::SitId.eq(sit_id))
            .exec(&txn)
            .await?;
        favourite::Entity::delete_many()
            .filter(favourite::Column::SitId.eq(sit_id))
            .exec(&txn)
            .await?;
        sit::Entity::delete_by_id(sit_id).exec(&txn).await?;

        user::Entity::update_many()
            .col_expr(
                user::Column::SitsCount,
                Expr::col(user::Column::SitsCount).sub(1),
            )
            .filter(user::Column::Id.eq(owner_id))
            .filter(user::Column::SitsCount.gt(0))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }

    /// A user's sits, optionally restricted to a period, in the given order.
    pub async fn entries_of(
        &self,
        user_id: Uuid,
        period: Option<Period>,
        order: SitOrder,
        limit: Option<u64>,
        include_private: bool,
    ) -> Result<Vec<sit::Model>> {
        let mut query = sit::Entity::find().filter(sit::Column::UserId.eq(user_id));
        if !include_private {
            query = query.filter(sit::Column::Private.eq(false));
        }
        if let Some(period) = period {
            query = query
                .filter(sit::Column::CreatedAt.gte(period.from))
                .filter(sit::Column::CreatedAt.lt(period.until));
        }
        query = match order {
            SitOrder::NewestFirst => query
                .order_by_desc(sit::Column::CreatedAt)
                .order_by_desc(sit::Column::Id),
            SitOrder::OldestFirst => query
                .order_by_asc(sit::Column::CreatedAt)
                .order_by_asc(sit::Column::Id),
        };
        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        Ok(query.all(&self.db).await?)
    }

    pub async fn count_entries(&self, user_id: Uuid, period: Period) -> Result<u64> {
        Ok(sit::Entity::find()
            .filter(sit::Column::UserId.eq(user_id))
            .filter(sit::Column::CreatedAt.gte(period.from))
            .filter(sit::Column::CreatedAt.lt(period.until))
            .count(&self.db)
            .await?)
    }

    /// Sits authored by any of `author_ids`, newest first. `page` is zero-based.
    pub async fn entries_by_authors(
        &self,
        author_ids: &[Uuid],
        page: Option<(u64, u64)>,
    ) -> Result<Vec<sit::Model>> {
        if author_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = sit::Entity::find()
            .filter(sit::Column::UserId.is_in(author_ids.to_vec()))
            .order_by_desc(sit::Column::CreatedAt)
            .order_by_desc(sit::Column::Id);

        match page {
            Some((page, per_page)) => {
                // Pages past the addressable range are simply empty
                let Some(offset) = page
                    .checked_mul(per_page)
                    .filter(|offset| i64::try_from(*offset).is_ok())
                else {
                    return Ok(Vec::new());
                };
                Ok(query.offset(offset).limit(per_page).all(&self.db).await?)
            }
            None => Ok(query.all(&self.db).await?),
        }
    }

    /// The author's sit immediately older than `sit`.
    pub async fn previous_entry(
        &self,
        sit: &sit::Model,
        include_private: bool,
    ) -> Result<Option<sit::Model>> {
        let older = Condition::any()
            .add(sit::Column::CreatedAt.lt(sit.created_at))
            .add(
                Condition::all()
                    .add(sit::Column::CreatedAt.eq(sit.created_at))
                    .add(sit::Column::Id.lt(sit.id)),
            );

        let mut query = sit::Entity::find()
            .filter(sit::Column::UserId.eq(sit.user_id))
            .filter(older);
        if !include_private {
            query = query.filter(sit::Column::Private.eq(false));
        }

        Ok(query
            .order_by_desc(sit::Column::CreatedAt)
            .order_by_desc(sit::Column::Id)
            .one(&self.db)
            .await?)
    }

    /// The author's sit immediately newer than `sit`.
    pub async fn next_entry(
        &self,
        sit: &sit::Model,
        include_private: bool,
    ) -> Result<Option<sit::Model>> {
        let newer = Condition::any()
            .add(sit::Column::CreatedAt.gt(sit.created_at))
            .add(
                Condition::all()
                    .add(sit::Column::CreatedAt.eq(sit.created_at))
                    .add(sit::Column::Id.gt(sit.id)),
            );

        let mut query = sit::Entity::find()
            .filter(sit::Column::UserId.eq(sit.user_id))
            .filter(newer);
        if !include_private {
            query = query.filter(sit::Column::Private.eq(false));
        }

        Ok(query
            .order_by_asc(sit::Column::CreatedAt)
            .order_by_asc(sit::Column::Id)
            .one(&self.db)
            .await?)
    }

    // Follow edges

    pub async fn find_edge(
        &self,
        follower_id: Uuid,
        followed_id: Uuid,
    ) -> Result<Option<relationship::Model>> {
        Ok(relationship::Entity::find()
            .filter(relationship::Column::FollowerId.eq(follower_id))
            .filter(relationship::Column::FollowedId.eq(followed_id))
            .one(&self.db)
            .await?)
    }

    pub async fn insert_edge(
        &self,
        follower_id: Uuid,
        followed_id: Uuid,
    ) -> Result<relationship::Model> {
        let edge = relationship::ActiveModel {
            id: Set(Uuid::new_v4()),
            follower_id: Set(follower_id),
            followed_id: Set(followed_id),
            created_at: Set(now()),
        };

        edge.insert(&self.db).await.map_err(|err| {
            if is_unique_violation(&err) {
                AppError::DuplicateEdge(format!("{} already follows {}", follower_id, followed_id))
            } else {
                err.into()
            }
        })
    }

    /// Returns how many edges were removed (0 or 1).
    pub async fn delete_edge(&self, follower_id: Uuid, followed_id: Uuid) -> Result<u64> {
        let result = relationship::Entity::delete_many()
            .filter(relationship::Column::FollowerId.eq(follower_id))
            .filter(relationship::Column::FollowedId.eq(followed_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Ids of users `user_id` follows, newest edge first.
    pub async fn followed_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(relationship::Entity::find()
            .select_only()
            .column(relationship::Column::FollowedId)
            .filter(relationship::Column::FollowerId.eq(user_id))
            .order_by_desc(relationship::Column::CreatedAt)
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await?)
    }

    /// Ids of users following `user_id`, newest edge first.
    pub async fn follower_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(relationship::Entity::find()
            .select_only()
            .column(relationship::Column::FollowerId)
            .filter(relationship::Column::FollowedId.eq(user_id))
            .order_by_desc(relationship::Column::CreatedAt)
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await?)
    }

    pub async fn count_followers(&self, user_id: Uuid) -> Result<u64> {
        Ok(relationship::Entity::find()
            .filter(relationship::Column::FollowedId.eq(user_id))
            .count(&self.db)
            .await?)
    }

    pub async fn count_following(&self, user_id: Uuid) -> Result<u64> {
        Ok(relationship::Entity::find()
            .filter(relationship::Column::FollowerId.eq(user_id))
            .count(&self.db)
            .await?)
    }

    pub async fn count_edges_touching(&self, user_id: Uuid) -> Result<u64> {
        Ok(relationship::Entity::find()
            .filter(
                Condition::any()
                    .add(relationship::Column::FollowerId.eq(user_id))
                    .add(relationship::Column::FollowedId.eq(user_id)),
            )
            .count(&self.db)
            .await?)
    }

    // Likes

    pub async fn like(&self, user_id: Uuid, sit_id: Uuid) -> Result<()> {
        self.get_sit(sit_id).await?;
        if self.likes(user_id, sit_id).await? {
            return Err(AppError::Conflict("Sit already liked".to_string()));
        }
        self.insert_like(user_id, sit_id).await?;
        Ok(())
    }

    /// Inserts the row; a concurrent duplicate surfaces as `Conflict` via the unique index.
    pub async fn insert_like(&self, user_id: Uuid, sit_id: Uuid) -> Result<like::Model> {
        like::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            sit_id: Set(sit_id),
            created_at: Set(now()),
        }
        .insert(&self.db)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                AppError::Conflict("Sit already liked".to_string())
            } else {
                err.into()
            }
        })
    }

    pub async fn likes(&self, user_id: Uuid, sit_id: Uuid) -> Result<bool> {
        let count = like::Entity::find()
            .filter(like::Column::UserId.eq(user_id))
            .filter(like::Column::SitId.eq(sit_id))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    pub async fn unlike(&self, user_id: Uuid, sit_id: Uuid) -> Result<()> {
        let result = like::Entity::delete_many()
            .filter(like::Column::UserId.eq(user_id))
            .filter(like::Column::SitId.eq(sit_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Like".to_string()));
        }
        Ok(())
    }

    // Favourites

    pub async fn favourite(&self, user_id: Uuid, sit_id: Uuid) -> Result<()> {
        self.get_sit(sit_id).await?;
        if self.favourited(user_id, sit_id).await? {
            return Err(AppError::Conflict("Sit already in favourites".to_string()));
        }
        self.insert_favourite(user_id, sit_id).await?;
        Ok(())
    }

    /// Inserts the row; a concurrent duplicate surfaces as `Conflict` via the unique index.
    pub async fn insert_favourite(&self, user_id: Uuid, sit_id: Uuid) -> Result<favourite::Model> {
        favourite::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            sit_id: Set(sit_id),
            created_at: Set(now()),
        }
        .insert(&self.db)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                AppError::Conflict("Sit already in favourites".to_string())
            } else {
                err.into()
            }
        })
    }

    pub async fn favourited(&self, user_id: Uuid, sit_id: Uuid) -> Result<bool> {
        let count = favourite::Entity::find()
            .filter(favourite::Column::UserId.eq(user_id))
            .filter(favourite::Column::SitId.eq(sit_id))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    pub async fn unfavourite(&self, user_id: Uuid, sit_id: Uuid) -> Result<()> {
        let result = favourite::Entity::delete_many()
            .filter(favourite::Column::UserId.eq(user_id))
            .filter(favourite::Column::SitId.eq(sit_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Favourite".to_string()));
        }
        Ok(())
    }

    /// Favourited sits, most recently favourited first.
    pub async fn favourite_sits(&self, user_id: Uuid) -> Result<Vec<sit::Model>> {
        let sit_ids: Vec<Uuid> = favourite::Entity::find()
            .select_only()
            .column(favourite::Column::SitId)
            .filter(favourite::Column::UserId.eq(user_id))
            .order_by_desc(favourite::Column::CreatedAt)
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await?;
        if sit_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sits = sit::Entity::find()
            .filter(sit::Column::Id.is_in(sit_ids.clone()))
            .all(&self.db)
            .await?;
        Ok(in_id_order(&sit_ids, sits, |s| s.id))
    }

    // Notifications

    pub async fn insert_notification(
        &self,
        user_id: Uuid,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<notification::Model> {
        Ok(notification::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            event_type: Set(event_type.to_string()),
            payload: Set(payload.to_string()),
            read: Set(false),
            created_at: Set(now()),
        }
        .insert(&self.db)
        .await?)
    }

    pub async fn notifications(&self, user_id: Uuid) -> Result<Vec<notification::Model>> {
        Ok(notification::Entity::find()
            .filter(notification::Column::UserId.eq(user_id))
            .order_by_desc(notification::Column::CreatedAt)
            .order_by_desc(notification::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Unread notification count, or `None` when there are none.
    pub async fn new_notifications(&self, user_id: Uuid) -> Result<Option<u64>> {
        let count = notification::Entity::find()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::Read.eq(false))
            .count(&self.db)
            .await?;
        Ok(Some(count).filter(|n| *n > 0))
    }

    pub async fn mark_notifications_read(&self, user_id: Uuid) -> Result<u64> {
        let result = notification::Entity::update_many()
            .col_expr(notification::Column::Read, Expr::value(true))
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::Read.eq(false))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    // Messages

    pub async fn send_message(
        &self,
        from_user_id: Uuid,
        to_user_id: Uuid,
        subject: &str,
        body: &str,
    ) -> Result<message::Model> {
        if subject.trim().is_empty() {
            return Err(AppError::InvalidArgument("Subject can't be blank".to_string()));
        }

        Ok(message::ActiveModel {
            id: Set(Uuid::new_v4()),
            from_user_id: Set(from_user_id),
            to_user_id: Set(to_user_id),
            subject: Set(subject.to_string()),
            body: Set(body.to_string()),
            read: Set(false),
            sender_deleted: Set(false),
            receiver_deleted: Set(false),
            created_at: Set(now()),
        }
        .insert(&self.db)
        .await?)
    }

    pub async fn inbox(&self, user_id: Uuid) -> Result<Vec<message::Model>> {
        Ok(message::Entity::find()
            .filter(message::Column::ToUserId.eq(user_id))
            .filter(message::Column::ReceiverDeleted.eq(false))
            .order_by_desc(message::Column::CreatedAt)
            .order_by_desc(message::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn outbox(&self, user_id: Uuid) -> Result<Vec<message::Model>> {
        Ok(message::Entity::find()
            .filter(message::Column::FromUserId.eq(user_id))
            .filter(message::Column::SenderDeleted.eq(false))
            .order_by_desc(message::Column::CreatedAt)
            .order_by_desc(message::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Unread received message count, or `None` when there are none.
    pub async fn unread_count(&self, user_id: Uuid) -> Result<Option<u64>> {
        let count = message::Entity::find()
            .filter(message::Column::ToUserId.eq(user_id))
            .filter(message::Column::ReceiverDeleted.eq(false))
            .filter(message::Column::Read.eq(false))
            .count(&self.db)
            .await?;
        Ok(Some(count).filter(|n| *n > 0))
    }

    pub async fn mark_message_read(&self, user_id: Uuid, message_id: Uuid) -> Result<()> {
        let result = message::Entity::update_many()
            .col_expr(message::Column::Read, Expr::value(true))
            .filter(message::Column::Id.eq(message_id))
            .filter(message::Column::ToUserId.eq(user_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Message {}", message_id)));
        }
        Ok(())
    }

    /// Hides the message from whichever side `user_id` is on.
    pub async fn delete_message(&self, user_id: Uuid, message_id: Uuid) -> Result<()> {
        let message = message::Entity::find_by_id(message_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Message {}", message_id)))?;

        let is_sender = message.from_user_id == user_id;
        let is_receiver = message.to_user_id == user_id;
        if !is_sender && !is_receiver {
            return Err(AppError::NotFound(format!("Message {}", message_id)));
        }

        let mut active: message::ActiveModel = message.into();
        if is_sender {
            active.sender_deleted = Set(true);
        }
        if is_receiver {
            active.receiver_deleted = Set(true);
        }
        active.update(&self.db).await?;
        Ok(())
    }
}
