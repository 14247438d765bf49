// ABOUTME: Social graph manager maintaining directed follow edges between users
// ABOUTME: Follows notify the followed user; edge cleanup on account deletion lives in Storage::delete_user

use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::user;
use crate::error::{AppError, Result};
use crate::notify::{NotificationEvent, NotificationSink};
use crate::storage::Storage;

#[derive(Clone)]
pub struct SocialGraph {
    storage: Arc<Storage>,
    notifications: Arc<dyn NotificationSink>,
}

impl SocialGraph {
    pub fn new(storage: Arc<Storage>, notifications: Arc<dyn NotificationSink>) -> Self {
        Self {
            storage,
            notifications,
        }
    }

    /// Creates the edge `follower -> followed` and tells `followed` about it.
    pub async fn follow(&self, follower: &user::Model, followed: &user::Model) -> Result<()> {
        if follower.id == followed.id {
            return Err(AppError::InvalidArgument("Users can't follow themselves".to_string()));
        }
        if self.is_following(follower.id, followed.id).await? {
            return Err(AppError::DuplicateEdge(format!(
                "{} already follows {}",
                follower.username, followed.username
            )));
        }

        // A concurrent follow that wins the race still surfaces as DuplicateEdge via the unique index
        self.storage.insert_edge(follower.id, followed.id).await?;
        tracing::info!(follower = %follower.username, followed = %followed.username, "new follow");

        self.notifications
            .send(
                NotificationEvent::NewFollower,
                followed.id,
                json!({
                    "follower": {
                        "id": follower.id,
                        "username": follower.username,
                    }
                }),
            )
            .await;

        Ok(())
    }

    pub async fn unfollow(&self, follower_id: Uuid, followed_id: Uuid) -> Result<()> {
        let removed = self.storage.delete_edge(follower_id, followed_id).await?;
        if removed == 0 {
            return Err(AppError::NotFound(format!(
                "Follow edge {} -> {}",
                follower_id, followed_id
            )));
        }
        tracing::info!(%follower_id, %followed_id, "unfollow");
        Ok(())
    }

    pub async fn is_following(&self, follower_id: Uuid, followed_id: Uuid) -> Result<bool> {
        Ok(self
            .storage
            .find_edge(follower_id, followed_id)
            .await?
            .is_some())
    }

    /// Users following `user_id`, most recent follower first.
    pub async fn followers(&self, user_id: Uuid) -> Result<Vec<user::Model>> {
        let ids = self.storage.follower_ids(user_id).await?;
        self.storage.get_users(&ids).await
    }

    /// Users `user_id` follows, most recently followed first.
    pub async fn following(&self, user_id: Uuid) -> Result<Vec<user::Model>> {
        let ids = self.storage.followed_ids(user_id).await?;
        self.storage.get_users(&ids).await
    }

    pub async fn follower_count(&self, user_id: Uuid) -> Result<u64> {
        self.storage.count_followers(user_id).await
    }

    pub async fn following_count(&self, user_id: Uuid) -> Result<u64> {
        self.storage.count_following(user_id).await
    }

    /// Makes a freshly registered user follow the house account, when one is configured
    /// and exists. No notification is sent for this edge.
    pub async fn follow_welcome_account(
        &self,
        user: &user::Model,
        welcome_account: Option<&str>,
    ) -> Result<()> {
        let Some(username) = welcome_account else {
            return Ok(());
        };
        if username == user.username {
            return Ok(());
        }

        match self.storage.find_user_by_username(username).await? {
            Some(house) => {
                self.storage.insert_edge(user.id, house.id).await?;
                Ok(())
            }
            None => {
                tracing::warn!("welcome account {} does not exist", username);
                Ok(())
            }
        }
    }
}
