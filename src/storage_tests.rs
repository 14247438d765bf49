// ABOUTME: Tests for the storage layer against a migrated temporary SQLite database
// ABOUTME: Covers user accounts, privacy toggles, cascading deletes, likes, favourites, notifications, and messages

#[cfg(test)]
mod tests {
    use super::super::storage::*;
    use super::super::types::*;
    use crate::entities::{favourite, like, notification, sit};
    use crate::error::AppError;
    use crate::test_support::{create_test_storage, create_test_user, sit_on};
    use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_user_operations() {
        let (storage, _temp_dir) = create_test_storage().await;

        let user = storage
            .create_user(&NewUser {
                username: "meditator".to_string(),
                first_name: Some("Ada".to_string()),
                last_name: Some("Lane".to_string()),
                city: Some("Leeds".to_string()),
                country: Some("UK".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let retrieved = storage.get_user(user.id).await.unwrap();
        assert_eq!(retrieved.username, "meditator");
        assert_eq!(retrieved.display_name(), "Ada Lane");
        assert_eq!(retrieved.location().as_deref(), Some("Leeds, UK"));
        assert_eq!(retrieved.sits_count, 0);

        let by_name = storage.get_user_by_username("meditator").await.unwrap();
        assert_eq!(by_name.id, user.id);

        let missing = storage.get_user(Uuid::new_v4()).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
        assert!(storage
            .find_user_by_username("nobody")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_username_rules() {
        let (storage, _temp_dir) = create_test_storage().await;

        for bad in ["ab", "has space", "abcdefghijklmnopqrstuvwxyz"] {
            let result = storage
                .create_user(&NewUser {
                    username: bad.to_string(),
                    ..Default::default()
                })
                .await;
            assert!(
                matches!(result, Err(AppError::InvalidArgument(_))),
                "{} should be rejected",
                bad
            );
        }

        create_test_user(&storage, "taken").await;
        let duplicate = storage
            .create_user(&NewUser {
                username: "taken".to_string(),
                ..Default::default()
            })
            .await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_get_users_preserves_requested_order() {
        let (storage, _temp_dir) = create_test_storage().await;

        let a = create_test_user(&storage, "first").await;
        let b = create_test_user(&storage, "second").await;
        let c = create_test_user(&storage, "third").await;

        let users = storage.get_users(&[c.id, a.id, b.id]).await.unwrap();
        let names: Vec<_> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["third", "first", "second"]);

        assert!(storage.get_users(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_private_stream_toggle_updates_existing_sits() {
        let (storage, _temp_dir) = create_test_storage().await;

        let user = create_test_user(&storage, "quiet").await;
        let first = sit_on(&storage, &user, 2023, 1, 1).await;
        let second = sit_on(&storage, &user, 2023, 1, 2).await;
        assert!(!first.private);

        // Case-insensitive
        assert!(storage.set_private_stream(user.id, "TRUE").await.unwrap());
        assert!(storage.get_user(user.id).await.unwrap().private_stream);
        assert!(storage.get_sit(first.id).await.unwrap().private);
        assert!(storage.get_sit(second.id).await.unwrap().private);

        // New sits inherit the stream setting
        let user = storage.get_user(user.id).await.unwrap();
        let third = sit_on(&storage, &user, 2023, 1, 3).await;
        assert!(third.private);

        assert!(!storage.set_private_stream(user.id, "false").await.unwrap());
        assert!(!storage.get_sit(third.id).await.unwrap().private);
    }

    #[tokio::test]
    async fn test_invalid_privacy_value_changes_nothing() {
        let (storage, _temp_dir) = create_test_storage().await;

        let user = create_test_user(&storage, "quiet").await;
        let sit = sit_on(&storage, &user, 2023, 1, 1).await;

        let result = storage.set_private_stream(user.id, "yes").await;
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));

        assert!(!storage.get_user(user.id).await.unwrap().private_stream);
        assert!(!storage.get_sit(sit.id).await.unwrap().private);

        let missing = storage.set_private_stream(Uuid::new_v4(), "true").await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_sit_counter_follows_creates_and_deletes() {
        let (storage, _temp_dir) = create_test_storage().await;

        let user = create_test_user(&storage, "counter").await;
        let first = sit_on(&storage, &user, 2023, 3, 1).await;
        sit_on(&storage, &user, 2023, 3, 2).await;
        assert_eq!(storage.get_user(user.id).await.unwrap().sits_count, 2);

        storage.delete_sit(user.id, first.id).await.unwrap();
        assert_eq!(storage.get_user(user.id).await.unwrap().sits_count, 1);
        assert!(matches!(
            storage.get_sit(first.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_only_author_can_delete_sit() {
        let (storage, _temp_dir) = create_test_storage().await;

        let author = create_test_user(&storage, "author").await;
        let other = create_test_user(&storage, "other").await;
        let sit = sit_on(&storage, &author, 2023, 3, 1).await;

        let result = storage.delete_sit(other.id, sit.id).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
        assert!(storage.get_sit(sit.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_entries_are_rejected() {
        let (storage, _temp_dir) = create_test_storage().await;

        let user = create_test_user(&storage, "writer").await;
        let result = storage
            .create_sit(
                &user,
                &EntryKind::Diary {
                    title: " ".to_string(),
                },
                "body",
                None,
                0,
            )
            .await;
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
        assert_eq!(storage.get_user(user.id).await.unwrap().sits_count, 0);
    }

    #[tokio::test]
    async fn test_oversized_duration_is_rejected_before_storing() {
        let (storage, _temp_dir) = create_test_storage().await;

        let user = create_test_user(&storage, "marathon").await;
        let result = storage
            .create_sit(
                &user,
                &EntryKind::TimedPractice {
                    duration: 3_000_000_000,
                },
                "",
                None,
                0,
            )
            .await;
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));

        // Nothing was written, so the author's sits still read back cleanly
        let stored = storage
            .entries_of(user.id, None, SitOrder::NewestFirst, None, true)
            .await
            .unwrap();
        assert!(stored.is_empty());
        assert_eq!(storage.get_user(user.id).await.unwrap().sits_count, 0);
    }

    #[tokio::test]
    async fn test_duplicate_like_and_favourite_rows_are_conflicts() {
        let (storage, _temp_dir) = create_test_storage().await;

        let author = create_test_user(&storage, "author").await;
        let fan = create_test_user(&storage, "fan").await;
        let sit = sit_on(&storage, &author, 2023, 3, 1).await;

        // The unique indexes back the pre-checks when two requests race
        storage.insert_like(fan.id, sit.id).await.unwrap();
        let again = storage.insert_like(fan.id, sit.id).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));

        storage.insert_favourite(fan.id, sit.id).await.unwrap();
        let again = storage.insert_favourite(fan.id, sit.id).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_private_sits_filtered_in_query() {
        let (storage, _temp_dir) = create_test_storage().await;

        let user = create_test_user(&storage, "diarist").await;
        sit_on(&storage, &user, 2023, 3, 1).await;
        storage
            .create_sit(
                &user,
                &EntryKind::Diary {
                    title: "Mine".to_string(),
                },
                "",
                Some(true),
                crate::test_support::at(2023, 3, 2).timestamp(),
            )
            .await
            .unwrap();

        let visible = storage
            .entries_of(user.id, None, SitOrder::NewestFirst, Some(1), false)
            .await
            .unwrap();
        assert_eq!(visible.len(), 1);
        assert!(!visible[0].private);
    }

    #[tokio::test]
    async fn test_likes() {
        let (storage, _temp_dir) = create_test_storage().await;

        let author = create_test_user(&storage, "author").await;
        let fan = create_test_user(&storage, "fan").await;
        let sit = sit_on(&storage, &author, 2023, 3, 1).await;

        assert!(!storage.likes(fan.id, sit.id).await.unwrap());
        storage.like(fan.id, sit.id).await.unwrap();
        assert!(storage.likes(fan.id, sit.id).await.unwrap());

        let again = storage.like(fan.id, sit.id).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));

        storage.unlike(fan.id, sit.id).await.unwrap();
        assert!(!storage.likes(fan.id, sit.id).await.unwrap());
        assert!(matches!(
            storage.unlike(fan.id, sit.id).await,
            Err(AppError::NotFound(_))
        ));

        let missing = storage.like(fan.id, Uuid::new_v4()).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_favourites_newest_first() {
        let (storage, _temp_dir) = create_test_storage().await;

        let author = create_test_user(&storage, "author").await;
        let reader = create_test_user(&storage, "reader").await;
        let older = sit_on(&storage, &author, 2023, 3, 1).await;
        let newer = sit_on(&storage, &author, 2023, 3, 2).await;

        storage.favourite(reader.id, newer.id).await.unwrap();
        storage.favourite(reader.id, older.id).await.unwrap();
        assert!(storage.favourited(reader.id, older.id).await.unwrap());

        let favourites = storage.favourite_sits(reader.id).await.unwrap();
        assert_eq!(favourites.len(), 2);
        assert!(favourites.iter().any(|s| s.id == older.id));
        assert!(favourites.iter().any(|s| s.id == newer.id));

        let again = storage.favourite(reader.id, older.id).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));

        storage.unfavourite(reader.id, older.id).await.unwrap();
        let favourites = storage.favourite_sits(reader.id).await.unwrap();
        assert_eq!(favourites.len(), 1);
        assert_eq!(favourites[0].id, newer.id);
    }

    #[tokio::test]
    async fn test_delete_user_cascades() {
        let (storage, _temp_dir) = create_test_storage().await;

        let leaving = create_test_user(&storage, "leaving").await;
        let staying = create_test_user(&storage, "staying").await;

        let their_sit = sit_on(&storage, &leaving, 2023, 3, 1).await;
        let our_sit = sit_on(&storage, &staying, 2023, 3, 1).await;

        storage.like(staying.id, their_sit.id).await.unwrap();
        storage.like(leaving.id, our_sit.id).await.unwrap();
        storage.favourite(staying.id, their_sit.id).await.unwrap();
        storage.insert_edge(leaving.id, staying.id).await.unwrap();
        storage.insert_edge(staying.id, leaving.id).await.unwrap();
        storage
            .insert_notification(leaving.id, "NewFollower", &serde_json::json!({}))
            .await
            .unwrap();

        storage.delete_user(leaving.id).await.unwrap();

        assert!(matches!(
            storage.get_user(leaving.id).await,
            Err(AppError::NotFound(_))
        ));
        let remaining_sits = sit::Entity::find()
            .filter(sit::Column::UserId.eq(leaving.id))
            .count(&storage.db)
            .await
            .unwrap();
        assert_eq!(remaining_sits, 0);
        assert_eq!(like::Entity::find().count(&storage.db).await.unwrap(), 0);
        assert_eq!(favourite::Entity::find().count(&storage.db).await.unwrap(), 0);
        assert_eq!(
            notification::Entity::find().count(&storage.db).await.unwrap(),
            0
        );
        assert_eq!(storage.count_edges_touching(leaving.id).await.unwrap(), 0);

        // The other account and its sit survive
        assert!(storage.get_sit(our_sit.id).await.is_ok());

        let again = storage.delete_user(leaving.id).await;
        assert!(matches!(again, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_notifications_counts_and_read() {
        let (storage, _temp_dir) = create_test_storage().await;

        let user = create_test_user(&storage, "popular").await;
        assert_eq!(storage.new_notifications(user.id).await.unwrap(), None);

        let payload = serde_json::json!({"follower": {"username": "fan"}});
        storage
            .insert_notification(user.id, "NewFollower", &payload)
            .await
            .unwrap();
        storage
            .insert_notification(user.id, "NewFollower", &payload)
            .await
            .unwrap();

        assert_eq!(storage.new_notifications(user.id).await.unwrap(), Some(2));
        let stored = storage.notifications(user.id).await.unwrap();
        assert_eq!(stored.len(), 2);

        let view = NotificationView::try_from(stored[0].clone()).unwrap();
        assert_eq!(view.payload["follower"]["username"], "fan");

        assert_eq!(storage.mark_notifications_read(user.id).await.unwrap(), 2);
        assert_eq!(storage.new_notifications(user.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_messages() {
        let (storage, _temp_dir) = create_test_storage().await;

        let sender = create_test_user(&storage, "sender").await;
        let receiver = create_test_user(&storage, "receiver").await;
        let stranger = create_test_user(&storage, "stranger").await;

        let blank = storage.send_message(sender.id, receiver.id, "  ", "hi").await;
        assert!(matches!(blank, Err(AppError::InvalidArgument(_))));

        let message = storage
            .send_message(sender.id, receiver.id, "Retreat", "See you there")
            .await
            .unwrap();

        assert_eq!(storage.unread_count(receiver.id).await.unwrap(), Some(1));
        assert_eq!(storage.unread_count(sender.id).await.unwrap(), None);
        assert_eq!(storage.inbox(receiver.id).await.unwrap().len(), 1);
        assert_eq!(storage.outbox(sender.id).await.unwrap().len(), 1);

        // Only the receiver can mark it read
        assert!(matches!(
            storage.mark_message_read(sender.id, message.id).await,
            Err(AppError::NotFound(_))
        ));
        storage.mark_message_read(receiver.id, message.id).await.unwrap();
        assert_eq!(storage.unread_count(receiver.id).await.unwrap(), None);

        // Deleting hides it from one side only
        storage.delete_message(receiver.id, message.id).await.unwrap();
        assert!(storage.inbox(receiver.id).await.unwrap().is_empty());
        assert_eq!(storage.outbox(sender.id).await.unwrap().len(), 1);

        assert!(matches!(
            storage.delete_message(stranger.id, message.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_user_directory_queries() {
        let (storage, _temp_dir) = create_test_storage().await;

        let ada = storage
            .create_user(&NewUser {
                username: "ada".to_string(),
                city: Some("Kyoto".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        let bo = create_test_user(&storage, "bo_sits").await;
        let hidden = storage
            .create_user(&NewUser {
                username: "hidden".to_string(),
                private_stream: true,
                ..Default::default()
            })
            .await
            .unwrap();

        let found = storage.search_users("kyo").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, ada.id);
        assert!(storage.search_users("   ").await.unwrap().is_empty());

        assert_eq!(storage.newest_users(2).await.unwrap().len(), 2);

        sit_on(&storage, &bo, 2023, 1, 1).await;
        sit_on(&storage, &bo, 2023, 1, 2).await;
        sit_on(&storage, &ada, 2023, 1, 1).await;
        sit_on(&storage, &hidden, 2023, 1, 1).await;

        let active: Vec<_> = storage
            .active_users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(active, vec!["bo_sits".to_string(), "ada".to_string()]);
    }

    #[test]
    fn test_privacy_flag_parsing() {
        assert!(parse_privacy_flag("true").unwrap());
        assert!(parse_privacy_flag("True").unwrap());
        assert!(!parse_privacy_flag("FALSE").unwrap());
        assert!(parse_privacy_flag("1").is_err());
        assert!(parse_privacy_flag("").is_err());
    }
}
