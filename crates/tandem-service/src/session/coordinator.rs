//! Session lifecycle and pause aggregation.
//!
//! The coordinator is the only writer of session and participant rows.
//! Cross-request coordination relies entirely on the store's atomic
//! operations: the active-per-participant-set fence on create, the
//! conditional participant update on pause, and compare-and-set on
//! terminate.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use tandem_core::clock::Clock;
use tandem_core::config::SessionConfig;
use tandem_core::error::AppError;
use tandem_core::result::AppResult;
use tandem_core::types::{SessionId, UserId};
use tandem_database::traits::SessionStore;
use tandem_entity::session::{
    EndOutcome, FocusSession, NewFocusSession, ParticipantKey, PauseResult, SessionOrigin,
    SessionParticipant, SessionStatus, SessionStatusView, SessionTermination, SessionsSnapshot,
};

/// How far past the server clock a caller-supplied `end_time` may lie.
const END_TIME_SKEW_SECONDS: i64 = 5;

/// Creates, pauses, ends and reports focus sessions.
#[derive(Debug, Clone)]
pub struct SessionCoordinator {
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
}

impl SessionCoordinator {
    /// Creates a new coordinator.
    pub fn new(sessions: Arc<dyn SessionStore>, clock: Arc<dyn Clock>, config: SessionConfig) -> Self {
        Self {
            sessions,
            clock,
            config,
        }
    }

    /// Session settings in effect.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Create an active session for `participants`.
    ///
    /// Duplicates collapse. Fails with `Conflict` if the same participant
    /// set already has an active session.
    pub async fn create(
        &self,
        participants: impl IntoIterator<Item = UserId>,
        start_time: DateTime<Utc>,
        planned_end_time: DateTime<Utc>,
        origin: SessionOrigin,
    ) -> AppResult<SessionStatusView> {
        let new = NewFocusSession::new(
            participants,
            start_time,
            planned_end_time,
            origin,
            self.clock.now(),
        );

        if new.participants.is_empty() {
            return Err(AppError::validation(
                "InvalidParticipants: a session needs at least one participant",
            ));
        }
        if planned_end_time <= start_time {
            return Err(AppError::validation(
                "planned_end_time must be after start_time",
            ));
        }

        let view = self.sessions.create(&new).await?;
        info!(
            session_id = %view.session.id,
            participants = view.participants.len(),
            origin = %origin,
            "Focus session created"
        );
        Ok(view)
    }

    /// Create a session on behalf of `caller`, who must be one of the
    /// participants. Missing times default to now and the configured
    /// duration.
    pub async fn create_for(
        &self,
        caller: UserId,
        participants: Vec<UserId>,
        start_time: Option<DateTime<Utc>>,
        planned_end_time: Option<DateTime<Utc>>,
    ) -> AppResult<SessionStatusView> {
        if !participants.contains(&caller) {
            return Err(AppError::validation(
                "InvalidParticipants: caller must be a participant",
            ));
        }
        let start = start_time.unwrap_or_else(|| self.clock.now());
        let planned_end =
            planned_end_time.unwrap_or_else(|| start + self.config.auto_join.default_duration());
        self.create(participants, start, planned_end, SessionOrigin::Manual)
            .await
    }

    /// Record one participant's pause signal and return the new aggregate.
    pub async fn set_pause_status(
        &self,
        session_id: SessionId,
        user_id: UserId,
        is_paused: bool,
    ) -> AppResult<PauseResult> {
        let session = self.load(session_id).await?;
        let participants = self.sessions.participants(session_id).await?;
        ensure_participant(&participants, user_id)?;
        ensure_active(&session)?;

        let at = self.clock.now();
        let applied = self
            .sessions
            .write_pause(session_id, user_id, is_paused, at)
            .await?;

        if !applied {
            // Either the session ended in between or a newer write landed.
            let current = self.load(session_id).await?;
            ensure_active(&current)?;
            debug!(
                session_id = %session_id,
                user_id = %user_id,
                "Pause write superseded by a newer write"
            );
        }

        let view = SessionStatusView::new(session, self.sessions.participants(session_id).await?);
        debug!(
            session_id = %session_id,
            user_id = %user_id,
            is_paused,
            aggregate_paused = view.aggregate_paused,
            "Pause status recorded"
        );
        Ok(PauseResult {
            session_id,
            aggregate_paused: view.aggregate_paused,
            participants: view.participants,
        })
    }

    /// End a session for every participant.
    ///
    /// `minutes` supplied by the caller is stored as given; otherwise the
    /// whole minutes between `start_time` and `end_time` are recorded.
    pub async fn end(
        &self,
        session_id: SessionId,
        caller: UserId,
        end_time: Option<DateTime<Utc>>,
        minutes: Option<i64>,
    ) -> AppResult<EndOutcome> {
        if minutes.is_some_and(|m| m < 0) {
            return Err(AppError::validation("minutes must not be negative"));
        }
        self.terminate(
            session_id,
            caller,
            SessionStatus::Completed,
            end_time,
            minutes,
        )
        .await
    }

    /// Cancel a session for every participant.
    pub async fn cancel(&self, session_id: SessionId, caller: UserId) -> AppResult<EndOutcome> {
        self.terminate(session_id, caller, SessionStatus::Cancelled, None, None)
            .await
    }

    async fn terminate(
        &self,
        session_id: SessionId,
        caller: UserId,
        target: SessionStatus,
        end_time: Option<DateTime<Utc>>,
        minutes: Option<i64>,
    ) -> AppResult<EndOutcome> {
        let session = self.load(session_id).await?;
        let participants = self.sessions.participants(session_id).await?;
        ensure_participant(&participants, caller)?;

        match session.status {
            SessionStatus::Completed | SessionStatus::Cancelled => {
                return Ok(EndOutcome {
                    session,
                    already_ended: true,
                });
            }
            SessionStatus::Active => {}
        }

        let now = self.clock.now();
        let end_time = end_time.unwrap_or(now);
        if end_time < session.start_time {
            return Err(AppError::validation("end_time must not precede start_time"));
        }
        if end_time > now + Duration::seconds(END_TIME_SKEW_SECONDS) {
            return Err(AppError::validation("end_time must not be in the future"));
        }
        let termination = SessionTermination {
            status: target,
            end_time,
            minutes: minutes.unwrap_or_else(|| session.elapsed_minutes(end_time)),
        };

        match self.sessions.terminate(session_id, &termination).await? {
            Some(updated) => {
                info!(
                    session_id = %session_id,
                    by = %caller,
                    status = %updated.status,
                    minutes = termination.minutes,
                    "Focus session terminated"
                );
                Ok(EndOutcome {
                    session: updated,
                    already_ended: false,
                })
            }
            None => {
                // Lost the compare-and-set to a concurrent end or cancel.
                let current = self.load(session_id).await?;
                Ok(EndOutcome {
                    session: current,
                    already_ended: true,
                })
            }
        }
    }

    /// Authoritative status of a session, visible to its participants only.
    pub async fn status(
        &self,
        session_id: SessionId,
        requester: UserId,
    ) -> AppResult<SessionStatusView> {
        let session = self.load(session_id).await?;
        let participants = self.sessions.participants(session_id).await?;
        ensure_participant(&participants, requester)?;
        Ok(SessionStatusView::new(session, participants))
    }

    /// The active session whose participants are exactly `{a, b}`.
    pub async fn find_active_for_pair(
        &self,
        a: UserId,
        b: UserId,
    ) -> AppResult<Option<FocusSession>> {
        self.sessions
            .find_active_by_key(&ParticipantKey::from_users([&a, &b]))
            .await
    }

    /// Active sessions of `user_id` plus those terminated within the
    /// retention window.
    pub async fn active_snapshot(&self, user_id: UserId) -> AppResult<SessionsSnapshot> {
        let now = self.clock.now();
        let since = now - self.config.recently_ended_retention();
        let sessions = self.sessions.find_for_user(user_id, since).await?;
        let views = self.with_participants(sessions).await?;

        let (active, recently_ended): (Vec<_>, Vec<_>) =
            views.into_iter().partition(|v| v.session.is_active());
        Ok(SessionsSnapshot {
            as_of: now,
            active,
            recently_ended,
        })
    }

    /// Terminal sessions of `user_id`, most recently ended first.
    pub async fn history(
        &self,
        user_id: UserId,
        limit: Option<u32>,
    ) -> AppResult<Vec<SessionStatusView>> {
        let max = self.config.history_limit.max(1);
        let limit = limit.unwrap_or(max).clamp(1, max);
        let sessions = self
            .sessions
            .history_for_user(user_id, i64::from(limit))
            .await?;
        self.with_participants(sessions).await
    }

    async fn load(&self, session_id: SessionId) -> AppResult<FocusSession> {
        self.sessions
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("SessionNotFound: {session_id}")))
    }

    async fn with_participants(
        &self,
        sessions: Vec<FocusSession>,
    ) -> AppResult<Vec<SessionStatusView>> {
        let ids: Vec<SessionId> = sessions.iter().map(|s| s.id).collect();
        let mut by_session: HashMap<SessionId, Vec<SessionParticipant>> = HashMap::new();
        for row in self.sessions.participants_for(&ids).await? {
            by_session.entry(row.session_id).or_default().push(row);
        }
        Ok(sessions
            .into_iter()
            .map(|s| {
                let mut rows = by_session.remove(&s.id).unwrap_or_default();
                rows.sort_by_key(|p| p.user_id);
                SessionStatusView::new(s, rows)
            })
            .collect())
    }
}

fn ensure_participant(participants: &[SessionParticipant], user_id: UserId) -> AppResult<()> {
    if participants.iter().any(|p| p.user_id == user_id) {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "NotParticipant: {user_id} is not in this session"
        )))
    }
}

fn ensure_active(session: &FocusSession) -> AppResult<()> {
    match session.status {
        SessionStatus::Active => Ok(()),
        SessionStatus::Completed | SessionStatus::Cancelled => Err(AppError::invalid_state(
            format!("NotActive: session {} is {}", session.id, session.status),
        )),
    }
}
