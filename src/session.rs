// ABOUTME: Session management with HttpOnly cookies identifying the current user
// ABOUTME: Stands in for the identity provider; handlers only ever ask it "who is calling"

use crate::error::{AppError, Result};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: Uuid,
    pub created_at: i64,
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionData>>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn create_session(&self, user_id: Uuid) -> String {
        let session_id = Uuid::new_v4().to_string();
        let session_data = SessionData {
            user_id,
            created_at: chrono::Utc::now().timestamp(),
        };

        if let Ok(mut sessions) = self.sessions.write() {
            let cutoff = session_data.created_at - SESSION_MAX_AGE;
            sessions.retain(|_, session| session.created_at > cutoff);
            sessions.insert(session_id.clone(), session_data);
        }

        session_id
    }

    /// Looks up a live session. An expired one is evicted on the way.
    pub fn get_session(&self, session_id: &str) -> Option<SessionData> {
        let cutoff = chrono::Utc::now().timestamp() - SESSION_MAX_AGE;
        {
            let sessions = self.sessions.read().ok()?;
            let session = sessions.get(session_id)?;
            if session.created_at > cutoff {
                return Some(session.clone());
            }
        }

        if let Ok(mut sessions) = self.sessions.write() {
            sessions.remove(session_id);
        }
        None
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.sessions.read().map(|sessions| sessions.len()).unwrap_or(0)
    }

    pub fn remove_session(&self, session_id: &str) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.remove(session_id);
        }
    }

    /// Drops every session belonging to `user_id`, used when the account is deleted.
    pub fn remove_user_sessions(&self, user_id: Uuid) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.retain(|_, session| session.user_id != user_id);
        }
    }
}

pub const SESSION_COOKIE_NAME: &str = "opensit_session";
const SESSION_MAX_AGE: i64 = 14 * 24 * 60 * 60; // two weeks

pub fn create_session_cookie(session_id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, session_id))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(SESSION_MAX_AGE))
        .path("/")
        .build()
}

pub fn create_logout_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(0))
        .path("/")
        .build()
}

/// Resolves the calling user's id from the session cookie.
pub fn current_user_id(jar: &CookieJar, session_store: &SessionStore) -> Result<Uuid> {
    let session_cookie = jar
        .get(SESSION_COOKIE_NAME)
        .ok_or_else(|| AppError::Unauthorized("No session cookie found".to_string()))?;

    let session_data = session_store
        .get_session(session_cookie.value())
        .ok_or_else(|| AppError::Unauthorized("Invalid session".to_string()))?;

    Ok(session_data.user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_round_trip_through_cookie() {
        let store = SessionStore::new();
        let user_id = Uuid::new_v4();
        let session_id = store.create_session(user_id);

        let jar = CookieJar::new().add(create_session_cookie(session_id.clone(), false));
        assert_eq!(current_user_id(&jar, &store).unwrap(), user_id);

        store.remove_session(&session_id);
        assert!(matches!(
            current_user_id(&jar, &store),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_missing_cookie_is_unauthorized() {
        let store = SessionStore::new();
        let result = current_user_id(&CookieJar::new(), &store);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    fn insert_stale(store: &SessionStore, user_id: Uuid) -> String {
        let session_id = Uuid::new_v4().to_string();
        let stale = SessionData {
            user_id,
            created_at: chrono::Utc::now().timestamp() - SESSION_MAX_AGE - 60,
        };
        store
            .sessions
            .write()
            .unwrap()
            .insert(session_id.clone(), stale);
        session_id
    }

    #[test]
    fn test_expired_sessions_are_evicted() {
        let store = SessionStore::new();
        let user_id = Uuid::new_v4();

        let stale = insert_stale(&store, user_id);
        assert_eq!(store.len(), 1);
        assert!(store.get_session(&stale).is_none());
        assert_eq!(store.len(), 0);

        // Creating a session sweeps out anything already expired
        insert_stale(&store, user_id);
        insert_stale(&store, user_id);
        let live = store.create_session(user_id);
        assert_eq!(store.len(), 1);
        assert!(store.get_session(&live).is_some());
    }

    #[test]
    fn test_remove_user_sessions_only_drops_that_user() {
        let store = SessionStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let a1 = store.create_session(alice);
        let a2 = store.create_session(alice);
        let b1 = store.create_session(bob);

        store.remove_user_sessions(alice);

        assert!(store.get_session(&a1).is_none());
        assert!(store.get_session(&a2).is_none());
        assert_eq!(store.get_session(&b1).unwrap().user_id, bob);
    }
}
