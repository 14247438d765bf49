// ABOUTME: Type definitions for API requests, responses, and the typed views over stored rows
// ABOUTME: Includes the tagged entry kind, timeline buckets, and profile/stream payloads

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{message, notification, sit, user};
use crate::error::{AppError, Result};

const TIMED_PRACTICE: i32 = 0;
const DIARY: i32 = 1;
const ARTICLE: i32 = 2;

pub const DEFAULT_TEASER_LENGTH: usize = 300;
const TEASER_OMISSION: &str = " ...";

/// What kind of entry a sit is. Stored as a numeric code in `sits.s_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryKind {
    TimedPractice { duration: u32 },
    Diary { title: String },
    Article { title: String },
}

impl EntryKind {
    pub fn code(&self) -> i32 {
        match self {
            EntryKind::TimedPractice { .. } => TIMED_PRACTICE,
            EntryKind::Diary { .. } => DIARY,
            EntryKind::Article { .. } => ARTICLE,
        }
    }

    pub fn duration(&self) -> Option<i32> {
        match self {
            EntryKind::TimedPractice { duration } => i32::try_from(*duration).ok(),
            _ => None,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            EntryKind::TimedPractice { .. } => None,
            EntryKind::Diary { title } | EntryKind::Article { title } => Some(title),
        }
    }

    /// Rebuilds the kind from its stored columns. Unknown codes read as articles.
    pub fn from_columns(code: i32, duration: Option<i32>, title: Option<String>) -> Result<Self> {
        match code {
            TIMED_PRACTICE => {
                let duration = duration.ok_or_else(|| {
                    AppError::Internal("timed practice entry without a duration".to_string())
                })?;
                let duration = u32::try_from(duration).map_err(|_| {
                    AppError::Internal(format!("negative practice duration {}", duration))
                })?;
                Ok(EntryKind::TimedPractice { duration })
            }
            DIARY => Ok(EntryKind::Diary {
                title: title.unwrap_or_default(),
            }),
            _ => Ok(EntryKind::Article {
                title: title.unwrap_or_default(),
            }),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            EntryKind::TimedPractice { duration: 0 } => Err(AppError::InvalidArgument(
                "Practice duration must be at least one minute".to_string(),
            )),
            EntryKind::TimedPractice { duration } if i32::try_from(*duration).is_err() => {
                Err(AppError::InvalidArgument(format!(
                    "Practice duration of {} minutes is too long",
                    duration
                )))
            }
            EntryKind::Diary { title } | EntryKind::Article { title } if title.trim().is_empty() => {
                Err(AppError::InvalidArgument("Title can't be blank".to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// A sit with its kind decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub kind: EntryKind,
    pub body: String,
    pub private: bool,
    pub created_at: i64,
}

impl TryFrom<sit::Model> for Entry {
    type Error = AppError;

    fn try_from(model: sit::Model) -> Result<Self> {
        let kind = EntryKind::from_columns(model.s_type, model.duration, model.title)?;
        Ok(Entry {
            id: model.id,
            user_id: model.user_id,
            kind,
            body: model.body,
            private: model.private,
            created_at: model.created_at,
        })
    }
}

impl Entry {
    pub fn from_models(models: Vec<sit::Model>) -> Result<Vec<Self>> {
        models.into_iter().map(Entry::try_from).collect()
    }

    /// One-line summary used in streams. With `with_verb` the phrase reads after the
    /// author's name ("sat for 30 minutes"); articles always carry their verb.
    pub fn headline(&self, with_verb: bool) -> String {
        match &self.kind {
            EntryKind::TimedPractice { duration } if with_verb => {
                format!("sat for {} minutes", duration)
            }
            EntryKind::TimedPractice { duration } => format!("{} minutes", duration),
            EntryKind::Diary { title } if with_verb => format!("added a new diary: {}", title),
            EntryKind::Diary { title } => title.clone(),
            EntryKind::Article { title } => format!("added a new article: {}", title),
        }
    }

    pub fn teaser(&self, length: usize) -> String {
        truncate(&strip_tags(&self.body), length)
    }
}

fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.trim().to_string()
}

fn truncate(text: &str, length: usize) -> String {
    if text.chars().count() <= length {
        return text.to_string();
    }
    let keep = length.saturating_sub(TEASER_OMISSION.chars().count());
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(TEASER_OMISSION);
    truncated
}

/// A (period, count) pair for the activity navigation sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "period", rename_all = "snake_case")]
pub enum TimelineBucket {
    Year { year: i32, count: u64 },
    Month { year: i32, month: u32, count: u64 },
}

// Users

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    #[serde(default)]
    pub private_stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
}

impl From<&user::Model> for UserSummary {
    fn from(user: &user::Model) -> Self {
        UserSummary {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub location: Option<String>,
    pub private_stream: bool,
    pub streak: i32,
    pub sits_count: i32,
    pub follower_count: u64,
    pub following_count: u64,
    pub last_update: Option<i64>,
    pub latest_sits: Vec<EntryView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PrivateStreamRequest {
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CountsResponse {
    pub unread_messages: Option<u64>,
    pub new_notifications: Option<u64>,
}

// Sits and streams

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSitRequest {
    #[serde(flatten)]
    pub kind: EntryKind,
    #[serde(default)]
    pub body: String,
    pub private: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EntryView {
    #[serde(flatten)]
    pub entry: Entry,
    pub headline: String,
    pub teaser: String,
}

impl From<Entry> for EntryView {
    fn from(entry: Entry) -> Self {
        EntryView {
            headline: entry.headline(false),
            teaser: entry.teaser(DEFAULT_TEASER_LENGTH),
            entry,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SitResponse {
    pub sit: EntryView,
    pub previous: Option<Uuid>,
    pub next: Option<Uuid>,
    pub liked: bool,
    pub favourited: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StreamResponse {
    pub page: u64,
    pub sits: Vec<EntryView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TimelineResponse {
    pub buckets: Vec<TimelineBucket>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PeriodCountResponse {
    pub count: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

// Notifications and messages

#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationView {
    pub id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub read: bool,
    pub created_at: i64,
}

impl TryFrom<notification::Model> for NotificationView {
    type Error = AppError;

    fn try_from(model: notification::Model) -> Result<Self> {
        Ok(NotificationView {
            id: model.id,
            event_type: model.event_type,
            payload: serde_json::from_str(&model.payload)?,
            read: model.read,
            created_at: model.created_at,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageView {
    pub id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub subject: String,
    pub body: String,
    pub read: bool,
    pub created_at: i64,
}

impl From<message::Model> for MessageView {
    fn from(model: message::Model) -> Self {
        MessageView {
            id: model.id,
            from_user_id: model.from_user_id,
            to_user_id: model.to_user_id,
            subject: model.subject,
            body: model.body,
            read: model.read,
            created_at: model.created_at,
        }
    }
}
