//! In-memory session store.
//!
//! All state lives behind one async mutex, so every trait method is a
//! single critical section. The `active_by_key` index plays the role of
//! the partial unique index in PostgreSQL.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use tandem_core::error::AppError;
use tandem_core::result::AppResult;
use tandem_core::types::{SessionId, UserId};
use tandem_entity::session::{
    FocusSession, NewFocusSession, ParticipantKey, SessionParticipant, SessionStatus,
    SessionStatusView, SessionTermination,
};

use crate::traits::SessionStore;

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<SessionId, FocusSession>,
    participants: HashMap<SessionId, Vec<SessionParticipant>>,
    active_by_key: HashMap<ParticipantKey, SessionId>,
}

impl Inner {
    fn involving(&self, user_id: UserId) -> impl Iterator<Item = &FocusSession> {
        self.participants
            .iter()
            .filter(move |(_, rows)| rows.iter().any(|p| p.user_id == user_id))
            .filter_map(|(id, _)| self.sessions.get(id))
    }
}

/// In-memory session store.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, new: &NewFocusSession) -> AppResult<SessionStatusView> {
        let mut inner = self.inner.lock().await;

        if inner.active_by_key.contains_key(&new.participant_key) {
            return Err(AppError::conflict(format!(
                "An active session already exists for participants {}",
                new.participant_key
            )));
        }

        let session = FocusSession {
            id: new.id,
            status: SessionStatus::Active,
            origin: new.origin,
            participant_key: new.participant_key.clone(),
            start_time: new.start_time,
            planned_end_time: new.planned_end_time,
            end_time: None,
            minutes: None,
            created_at: new.created_at,
        };
        let participants: Vec<SessionParticipant> = new
            .participants
            .iter()
            .map(|user_id| SessionParticipant {
                session_id: new.id,
                user_id: *user_id,
                is_paused: false,
                updated_at: new.created_at,
            })
            .collect();

        inner
            .active_by_key
            .insert(new.participant_key.clone(), new.id);
        inner.sessions.insert(new.id, session.clone());
        inner.participants.insert(new.id, participants.clone());

        debug!(session_id = %new.id, "Session stored");
        Ok(SessionStatusView::new(session, participants))
    }

    async fn find_by_id(&self, id: SessionId) -> AppResult<Option<FocusSession>> {
        Ok(self.inner.lock().await.sessions.get(&id).cloned())
    }

    async fn participants(&self, id: SessionId) -> AppResult<Vec<SessionParticipant>> {
        Ok(self
            .inner
            .lock()
            .await
            .participants
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn participants_for(&self, ids: &[SessionId]) -> AppResult<Vec<SessionParticipant>> {
        let inner = self.inner.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.participants.get(id))
            .flatten()
            .cloned()
            .collect())
    }

    async fn write_pause(
        &self,
        session_id: SessionId,
        user_id: UserId,
        is_paused: bool,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut inner = self.inner.lock().await;

        let active = inner
            .sessions
            .get(&session_id)
            .is_some_and(|s| s.status == SessionStatus::Active);
        if !active {
            return Ok(false);
        }

        let row = inner
            .participants
            .get_mut(&session_id)
            .and_then(|rows| rows.iter_mut().find(|p| p.user_id == user_id));
        match row {
            Some(row) if row.updated_at <= at => {
                row.is_paused = is_paused;
                row.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn terminate(
        &self,
        id: SessionId,
        termination: &SessionTermination,
    ) -> AppResult<Option<FocusSession>> {
        let mut inner = self.inner.lock().await;

        let Some(session) = inner.sessions.get_mut(&id) else {
            return Ok(None);
        };
        if !session.status.can_transition_to(termination.status) {
            return Ok(None);
        }

        session.status = termination.status;
        session.end_time = Some(termination.end_time);
        session.minutes = Some(termination.minutes);
        let updated = session.clone();

        if inner.active_by_key.get(&updated.participant_key) == Some(&id) {
            inner.active_by_key.remove(&updated.participant_key);
        }
        Ok(Some(updated))
    }

    async fn find_active_by_key(&self, key: &ParticipantKey) -> AppResult<Option<FocusSession>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .active_by_key
            .get(key)
            .and_then(|id| inner.sessions.get(id))
            .cloned())
    }

    async fn find_latest_by_key(&self, key: &ParticipantKey) -> AppResult<Option<FocusSession>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .sessions
            .values()
            .filter(|s| &s.participant_key == key)
            .max_by_key(|s| (s.start_time, s.created_at))
            .cloned())
    }

    async fn find_for_user(
        &self,
        user_id: UserId,
        ended_since: DateTime<Utc>,
    ) -> AppResult<Vec<FocusSession>> {
        let inner = self.inner.lock().await;
        let mut sessions: Vec<FocusSession> = inner
            .involving(user_id)
            .filter(|s| s.is_active() || s.ended_since(ended_since))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(sessions)
    }

    async fn history_for_user(&self, user_id: UserId, limit: i64) -> AppResult<Vec<FocusSession>> {
        let inner = self.inner.lock().await;
        let mut sessions: Vec<FocusSession> = inner
            .involving(user_id)
            .filter(|s| s.status.is_terminal())
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.end_time.cmp(&a.end_time));
        sessions.truncate(usize::try_from(limit.max(0)).unwrap_or(0));
        Ok(sessions)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tandem_core::error::ErrorKind;
    use tandem_entity::session::SessionOrigin;

    fn new_session(users: &[UserId], at: DateTime<Utc>) -> NewFocusSession {
        NewFocusSession::new(
            users.iter().copied(),
            at,
            at + Duration::minutes(60),
            SessionOrigin::Manual,
            at,
        )
    }

    fn ended(at: DateTime<Utc>) -> SessionTermination {
        SessionTermination {
            status: SessionStatus::Completed,
            end_time: at,
            minutes: 5,
        }
    }

    #[tokio::test]
    async fn test_second_active_session_for_same_pair_conflicts() {
        let store = MemorySessionStore::new();
        let (a, b) = (UserId::new(), UserId::new());
        let now = Utc::now();

        store.create(&new_session(&[a, b], now)).await.unwrap();
        let err = store
            .create(&new_session(&[b, a], now))
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Conflict));
    }

    #[tokio::test]
    async fn test_pair_can_start_again_after_termination() {
        let store = MemorySessionStore::new();
        let (a, b) = (UserId::new(), UserId::new());
        let now = Utc::now();

        let first = store.create(&new_session(&[a, b], now)).await.unwrap();
        store
            .terminate(first.session.id, &ended(now))
            .await
            .unwrap()
            .unwrap();

        let second = store.create(&new_session(&[a, b], now)).await.unwrap();
        assert_ne!(first.session.id, second.session.id);
        let latest = store
            .find_latest_by_key(&second.session.participant_key)
            .await
            .unwrap()
            .unwrap();
        assert!(latest.is_active());
    }

    #[tokio::test]
    async fn test_terminate_is_compare_and_set() {
        let store = MemorySessionStore::new();
        let now = Utc::now();
        let view = store
            .create(&new_session(&[UserId::new()], now))
            .await
            .unwrap();

        let first = store.terminate(view.session.id, &ended(now)).await.unwrap();
        assert_eq!(first.unwrap().minutes, Some(5));

        let second = store
            .terminate(
                view.session.id,
                &SessionTermination {
                    status: SessionStatus::Cancelled,
                    end_time: now + Duration::minutes(1),
                    minutes: 9,
                },
            )
            .await
            .unwrap();
        assert!(second.is_none());

        let stored = store.find_by_id(view.session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Completed);
        assert_eq!(stored.minutes, Some(5));
    }

    #[tokio::test]
    async fn test_pause_write_is_last_writer_wins() {
        let store = MemorySessionStore::new();
        let (a, b) = (UserId::new(), UserId::new());
        let now = Utc::now();
        let view = store.create(&new_session(&[a, b], now)).await.unwrap();
        let id = view.session.id;

        let later = now + Duration::seconds(10);
        assert!(store.write_pause(id, a, true, later).await.unwrap());
        // A delayed write stamped earlier must not override.
        assert!(
            !store
                .write_pause(id, a, false, now + Duration::seconds(5))
                .await
                .unwrap()
        );

        let rows = store.participants(id).await.unwrap();
        let row = rows.iter().find(|p| p.user_id == a).unwrap();
        assert!(row.is_paused);
        assert_eq!(row.updated_at, later);
    }

    #[tokio::test]
    async fn test_pause_write_rejected_after_end_and_for_strangers() {
        let store = MemorySessionStore::new();
        let a = UserId::new();
        let now = Utc::now();
        let view = store.create(&new_session(&[a], now)).await.unwrap();
        let id = view.session.id;

        assert!(!store.write_pause(id, UserId::new(), true, now).await.unwrap());

        store.terminate(id, &ended(now)).await.unwrap();
        assert!(!store.write_pause(id, a, true, now).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_for_user_honours_retention() {
        let store = MemorySessionStore::new();
        let a = UserId::new();
        let now = Utc::now();

        let old = store.create(&new_session(&[a], now)).await.unwrap();
        store
            .terminate(old.session.id, &ended(now - Duration::minutes(10)))
            .await
            .unwrap();
        let active = store
            .create(&new_session(&[a, UserId::new()], now))
            .await
            .unwrap();

        let found = store
            .find_for_user(a, now - Duration::seconds(60))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, active.session.id);

        let history = store.history_for_user(a, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, old.session.id);
    }
}
