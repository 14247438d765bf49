// ABOUTME: JSON HTTP endpoints for users, follows, sits, streams, notifications, and messages
// ABOUTME: Handlers resolve the caller from the session cookie and delegate to storage, graph, and stream

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use uuid::Uuid;

use crate::entities::user;
use crate::error::{AppError, Result};
use crate::session;
use crate::types::*;
use crate::AppState;

const NEWEST_USERS: u64 = 5;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/users", post(register).get(search_users))
        .route("/logout", post(logout))
        .route("/users/newest", get(newest_users))
        .route("/users/active", get(active_users))
        .route("/users/:username", get(profile))
        .route("/users/:username/follow", post(follow).delete(unfollow))
        .route("/users/:username/followers", get(followers))
        .route("/users/:username/following", get(following))
        .route("/users/:username/sits", get(user_sits))
        .route("/users/:username/timeline", get(timeline))
        .route("/users/:username/sits/year/:year", get(sits_in_year))
        .route("/users/:username/sits/month/:year/:month", get(sits_in_month))
        .route("/me", delete(delete_account))
        .route("/me/private_stream", put(set_private_stream))
        .route("/me/counts", get(counts))
        .route("/stream", get(social_stream))
        .route("/sits", post(create_sit))
        .route("/sits/:sit_id", get(show_sit).delete(delete_sit))
        .route("/sits/:sit_id/like", post(like).delete(unlike))
        .route("/sits/:sit_id/favourite", post(favourite).delete(unfavourite))
        .route("/favourites", get(favourites))
        .route("/notifications", get(notifications))
        .route("/notifications/read", post(mark_notifications_read))
        .route("/messages", get(inbox).post(send_message))
        .route("/messages/sent", get(outbox))
        .route("/messages/:message_id/read", post(mark_message_read))
        .route("/messages/:message_id", delete(delete_message))
        .with_state(state)
}

fn viewer_id(jar: &CookieJar, state: &AppState) -> Option<Uuid> {
    session::current_user_id(jar, &state.sessions).ok()
}

async fn current_user(jar: &CookieJar, state: &AppState) -> Result<user::Model> {
    let user_id = session::current_user_id(jar, &state.sessions)?;
    match state.storage.get_user(user_id).await {
        Err(AppError::NotFound(_)) => Err(AppError::Unauthorized(
            "Session user no longer exists".to_string(),
        )),
        other => other,
    }
}

fn summaries(users: &[user::Model]) -> Vec<UserSummary> {
    users.iter().map(UserSummary::from).collect()
}

fn views(entries: Vec<Entry>) -> Vec<EntryView> {
    entries.into_iter().map(EntryView::from).collect()
}

/// Drops other people's private sits from a list shown to `viewer`.
fn visible_to(entries: Vec<Entry>, viewer: Option<Uuid>) -> Vec<Entry> {
    entries
        .into_iter()
        .filter(|entry| !entry.private || Some(entry.user_id) == viewer)
        .collect()
}

// Users

async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<NewUser>,
) -> Result<(StatusCode, CookieJar, Json<UserSummary>)> {
    let user = state.storage.create_user(&req).await?;
    state
        .social
        .follow_welcome_account(&user, state.config.welcome_account.as_deref())
        .await?;

    let session_id = state.sessions.create_session(user.id);
    let jar = jar.add(session::create_session_cookie(
        session_id,
        state.config.cookie_secure,
    ));

    tracing::info!(username = %user.username, "user registered");
    Ok((StatusCode::CREATED, jar, Json(UserSummary::from(&user))))
}

async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    if let Some(cookie) = jar.get(session::SESSION_COOKIE_NAME) {
        state.sessions.remove_session(cookie.value());
    }
    (
        jar.add(session::create_logout_cookie()),
        Json(json!({"success": true})),
    )
}

async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<UserSummary>>> {
    let users = state
        .storage
        .search_users(query.q.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(summaries(&users)))
}

async fn newest_users(State(state): State<AppState>) -> Result<Json<Vec<UserSummary>>> {
    let users = state.storage.newest_users(NEWEST_USERS).await?;
    Ok(Json(summaries(&users)))
}

async fn active_users(State(state): State<AppState>) -> Result<Json<Vec<UserSummary>>> {
    let users = state.storage.active_users().await?;
    Ok(Json(summaries(&users)))
}

async fn profile(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(username): Path<String>,
) -> Result<Json<UserProfile>> {
    let user = state.storage.get_user_by_username(&username).await?;
    let viewer = viewer_id(&jar, &state);

    let streak = if state.stream.break_streak(&user, chrono::Utc::now()).await? {
        0
    } else {
        user.streak
    };
    let latest = state
        .stream
        .latest_entries_seen_by(user.id, state.config.latest_sits, viewer)
        .await?;

    Ok(Json(UserProfile {
        id: user.id,
        username: user.username.clone(),
        display_name: user.display_name(),
        location: user.location(),
        private_stream: user.private_stream,
        streak,
        sits_count: user.sits_count,
        follower_count: state.social.follower_count(user.id).await?,
        following_count: state.social.following_count(user.id).await?,
        last_update: state.stream.last_update(user.id).await?,
        latest_sits: views(latest),
    }))
}

async fn delete_account(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode)> {
    let user = current_user(&jar, &state).await?;
    state.storage.delete_user(user.id).await?;
    state.sessions.remove_user_sessions(user.id);

    tracing::info!(username = %user.username, "account deleted");
    Ok((jar.add(session::create_logout_cookie()), StatusCode::NO_CONTENT))
}

async fn set_private_stream(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<PrivateStreamRequest>,
) -> Result<Json<serde_json::Value>> {
    let user = current_user(&jar, &state).await?;
    let private = state.storage.set_private_stream(user.id, &req.value).await?;
    Ok(Json(json!({"private_stream": private})))
}

async fn counts(State(state): State<AppState>, jar: CookieJar) -> Result<Json<CountsResponse>> {
    let user = current_user(&jar, &state).await?;
    Ok(Json(CountsResponse {
        unread_messages: state.storage.unread_count(user.id).await?,
        new_notifications: state.storage.new_notifications(user.id).await?,
    }))
}

// Social graph

async fn follow(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(username): Path<String>,
) -> Result<StatusCode> {
    let follower = current_user(&jar, &state).await?;
    let followed = state.storage.get_user_by_username(&username).await?;
    state.social.follow(&follower, &followed).await?;
    Ok(StatusCode::CREATED)
}

async fn unfollow(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(username): Path<String>,
) -> Result<StatusCode> {
    let follower = current_user(&jar, &state).await?;
    let followed = state.storage.get_user_by_username(&username).await?;
    state.social.unfollow(follower.id, followed.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn followers(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<UserSummary>>> {
    let user = state.storage.get_user_by_username(&username).await?;
    let users = state.social.followers(user.id).await?;
    Ok(Json(summaries(&users)))
}

async fn following(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<UserSummary>>> {
    let user = state.storage.get_user_by_username(&username).await?;
    let users = state.social.following(user.id).await?;
    Ok(Json(summaries(&users)))
}

// Streams

async fn user_sits(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(username): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<EntryView>>> {
    let user = state.storage.get_user_by_username(&username).await?;
    let limit = query.limit.unwrap_or(state.config.latest_sits);
    let entries = state
        .stream
        .latest_entries_seen_by(user.id, limit, viewer_id(&jar, &state))
        .await?;
    Ok(Json(views(entries)))
}

async fn timeline(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<TimelineResponse>> {
    let user = state.storage.get_user_by_username(&username).await?;
    let buckets = state.stream.timeline(user.id, chrono::Utc::now()).await?;
    Ok(Json(TimelineResponse { buckets }))
}

async fn sits_in_year(
    State(state): State<AppState>,
    Path((username, year)): Path<(String, i32)>,
) -> Result<Json<PeriodCountResponse>> {
    let user = state.storage.get_user_by_username(&username).await?;
    let count = state.stream.entries_in_year(user.id, year).await?;
    Ok(Json(PeriodCountResponse { count }))
}

async fn sits_in_month(
    State(state): State<AppState>,
    Path((username, year, month)): Path<(String, i32, u32)>,
) -> Result<Json<PeriodCountResponse>> {
    let user = state.storage.get_user_by_username(&username).await?;
    let count = state.stream.entries_in_month(user.id, month, year).await?;
    Ok(Json(PeriodCountResponse { count }))
}

async fn social_stream(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<PageQuery>,
) -> Result<Json<StreamResponse>> {
    let user = current_user(&jar, &state).await?;
    let page = query.page.unwrap_or(1).max(1);
    let entries = state
        .stream
        .social_stream_page(user.id, page, state.config.per_page)
        .await?;
    Ok(Json(StreamResponse {
        page,
        sits: views(entries),
    }))
}

// Sits

async fn create_sit(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<CreateSitRequest>,
) -> Result<(StatusCode, Json<EntryView>)> {
    let author = current_user(&jar, &state).await?;
    let sit = state
        .storage
        .create_sit(
            &author,
            &req.kind,
            &req.body,
            req.private,
            chrono::Utc::now().timestamp(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(EntryView::from(Entry::try_from(sit)?))))
}

async fn show_sit(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(sit_id): Path<Uuid>,
) -> Result<Json<SitResponse>> {
    let viewer = viewer_id(&jar, &state);
    let sit = state.storage.get_sit(sit_id).await?;
    if sit.private && viewer != Some(sit.user_id) {
        return Err(AppError::NotFound(format!("Sit {}", sit_id)));
    }

    let (previous, next) = state.stream.adjacent_entries(&sit, viewer).await?;
    let (liked, favourited) = match viewer {
        Some(viewer) => (
            state.storage.likes(viewer, sit_id).await?,
            state.storage.favourited(viewer, sit_id).await?,
        ),
        None => (false, false),
    };

    Ok(Json(SitResponse {
        sit: EntryView::from(Entry::try_from(sit)?),
        previous: previous.map(|entry| entry.id),
        next: next.map(|entry| entry.id),
        liked,
        favourited,
    }))
}

async fn delete_sit(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(sit_id): Path<Uuid>,
) -> Result<StatusCode> {
    let user = current_user(&jar, &state).await?;
    state.storage.delete_sit(user.id, sit_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn like(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(sit_id): Path<Uuid>,
) -> Result<StatusCode> {
    let user = current_user(&jar, &state).await?;
    state.storage.like(user.id, sit_id).await?;
    Ok(StatusCode::CREATED)
}

async fn unlike(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(sit_id): Path<Uuid>,
) -> Result<StatusCode> {
    let user = current_user(&jar, &state).await?;
    state.storage.unlike(user.id, sit_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn favourite(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(sit_id): Path<Uuid>,
) -> Result<StatusCode> {
    let user = current_user(&jar, &state).await?;
    state.storage.favourite(user.id, sit_id).await?;
    Ok(StatusCode::CREATED)
}

async fn unfavourite(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(sit_id): Path<Uuid>,
) -> Result<StatusCode> {
    let user = current_user(&jar, &state).await?;
    state.storage.unfavourite(user.id, sit_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn favourites(State(state): State<AppState>, jar: CookieJar) -> Result<Json<Vec<EntryView>>> {
    let user = current_user(&jar, &state).await?;
    let sits = state.storage.favourite_sits(user.id).await?;
    let entries = visible_to(Entry::from_models(sits)?, Some(user.id));
    Ok(Json(views(entries)))
}

// Notifications and messages

async fn notifications(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<Vec<NotificationView>>> {
    let user = current_user(&jar, &state).await?;
    let notifications = state
        .storage
        .notifications(user.id)
        .await?
        .into_iter()
        .map(NotificationView::try_from)
        .collect::<Result<Vec<_>>>()?;
    Ok(Json(notifications))
}

async fn mark_notifications_read(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<serde_json::Value>> {
    let user = current_user(&jar, &state).await?;
    let marked = state.storage.mark_notifications_read(user.id).await?;
    Ok(Json(json!({"marked": marked})))
}

async fn inbox(State(state): State<AppState>, jar: CookieJar) -> Result<Json<Vec<MessageView>>> {
    let user = current_user(&jar, &state).await?;
    let messages = state.storage.inbox(user.id).await?;
    Ok(Json(messages.into_iter().map(MessageView::from).collect()))
}

async fn outbox(State(state): State<AppState>, jar: CookieJar) -> Result<Json<Vec<MessageView>>> {
    let user = current_user(&jar, &state).await?;
    let messages = state.storage.outbox(user.id).await?;
    Ok(Json(messages.into_iter().map(MessageView::from).collect()))
}

async fn send_message(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageView>)> {
    let sender = current_user(&jar, &state).await?;
    let receiver = state.storage.get_user_by_username(&req.to).await?;
    let message = state
        .storage
        .send_message(sender.id, receiver.id, &req.subject, &req.body)
        .await?;
    Ok((StatusCode::CREATED, Json(MessageView::from(message))))
}

async fn mark_message_read(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(message_id): Path<Uuid>,
) -> Result<StatusCode> {
    let user = current_user(&jar, &state).await?;
    state.storage.mark_message_read(user.id, message_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_message(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(message_id): Path<Uuid>,
) -> Result<StatusCode> {
    let user = current_user(&jar, &state).await?;
    state.storage.delete_message(user.id, message_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
