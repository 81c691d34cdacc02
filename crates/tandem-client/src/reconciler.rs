//! Client-side session state.
//!
//! Every method takes `now` explicitly; nothing here reads a clock or
//! performs I/O.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tandem_core::types::{SessionId, UserId};
use tandem_entity::session::{
    PauseResult, SessionStatus, SessionStatusView, SessionsSnapshot,
};

/// What the device shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ClientView {
    /// No session on screen.
    Idle,
    /// A running session.
    Focus {
        /// The session being shown.
        session_id: SessionId,
    },
    /// A finished session.
    Summary(SessionSummary),
}

/// Server-confirmed outcome of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session ID.
    pub session_id: SessionId,
    /// Terminal status.
    pub status: SessionStatus,
    /// End time as recorded by the server.
    pub end_time: Option<DateTime<Utc>>,
    /// Minutes as recorded by the server.
    pub minutes: Option<i64>,
}

/// Status shown next to the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    /// Everyone is focused.
    Active,
    /// This device or another participant is paused.
    Paused,
}

/// Raised when the view enters a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusEntry {
    /// The session entered.
    pub session_id: SessionId,
    /// Local pause value to send because this device's row disagrees.
    pub push_pause: Option<bool>,
}

#[derive(Debug, Clone)]
struct FocusTimer {
    baseline: DateTime<Utc>,
    paused_total: Duration,
    paused_since: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
}

impl FocusTimer {
    fn start(baseline: DateTime<Utc>) -> Self {
        Self {
            baseline,
            paused_total: Duration::zero(),
            paused_since: None,
            stopped_at: None,
        }
    }

    fn pause(&mut self, now: DateTime<Utc>) {
        if self.paused_since.is_none() && self.stopped_at.is_none() {
            self.paused_since = Some(now);
        }
    }

    fn resume(&mut self, now: DateTime<Utc>) {
        if let Some(since) = self.paused_since.take() {
            self.paused_total += (now - since).max(Duration::zero());
        }
    }

    fn stop(&mut self, now: DateTime<Utc>) {
        if self.stopped_at.is_none() {
            self.resume(now);
            self.stopped_at = Some(now);
        }
    }

    fn elapsed_active(&self, now: DateTime<Utc>) -> Duration {
        let until = self.stopped_at.unwrap_or(now);
        let paused = self.paused_total
            + self
                .paused_since
                .map(|since| (until - since).max(Duration::zero()))
                .unwrap_or_else(Duration::zero);
        (until - self.baseline - paused).max(Duration::zero())
    }
}

/// A device's view of its shared session.
#[derive(Debug, Clone)]
pub struct ClientReconciler {
    user_id: UserId,
    view: ClientView,
    session_id: Option<SessionId>,
    local_pause: bool,
    remote_aggregate_paused: bool,
    timer: Option<FocusTimer>,
    do_not_disturb: bool,
    seen: HashSet<SessionId>,
    entry: Option<FocusEntry>,
}

impl ClientReconciler {
    /// Fresh state for `user_id`: idle, not paused.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            view: ClientView::Idle,
            session_id: None,
            local_pause: false,
            remote_aggregate_paused: false,
            timer: None,
            do_not_disturb: false,
            seen: HashSet::new(),
            entry: None,
        }
    }

    /// The user this device belongs to.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Current view.
    pub fn view(&self) -> &ClientView {
        &self.view
    }

    /// Session currently tracked, if any.
    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    /// Whether this device's sensor reports paused.
    pub fn local_pause(&self) -> bool {
        self.local_pause
    }

    /// Whether any other participant is paused, per the last server data.
    pub fn remote_aggregate_paused(&self) -> bool {
        self.remote_aggregate_paused
    }

    /// Whether auto-enter is suppressed for the rest of the process.
    pub fn do_not_disturb(&self) -> bool {
        self.do_not_disturb
    }

    /// Take the most recent session entry, if not yet handled.
    pub fn take_entry(&mut self) -> Option<FocusEntry> {
        self.entry.take()
    }

    /// `Paused` if this device or anyone else is paused.
    pub fn display_status(&self) -> DisplayStatus {
        if self.local_pause || self.remote_aggregate_paused {
            DisplayStatus::Paused
        } else {
            DisplayStatus::Active
        }
    }

    /// Focused time: wall clock since the baseline minus paused time.
    pub fn elapsed_active_seconds(&self, now: DateTime<Utc>) -> i64 {
        self.timer
            .as_ref()
            .map(|t| t.elapsed_active(now).num_seconds())
            .unwrap_or(0)
    }

    /// Whole focused minutes, as sent when ending a session.
    pub fn elapsed_active_minutes(&self, now: DateTime<Utc>) -> i64 {
        self.elapsed_active_seconds(now) / 60
    }

    /// Enter a session this device just created.
    pub fn begin_local(&mut self, view: &SessionStatusView, now: DateTime<Utc>) {
        self.seen.insert(view.session.id);
        self.enter_focus(view, now);
    }

    /// Record a sensor reading. Returns `true` if the local flag changed,
    /// meaning the server should be told.
    pub fn on_sensor(&mut self, paused: bool, now: DateTime<Utc>) -> bool {
        if self.local_pause == paused {
            return false;
        }
        self.local_pause = paused;
        self.sync_timer(now);
        self.session_id.is_some() && matches!(self.view, ClientView::Focus { .. })
    }

    /// Apply the server's answer to a pause write.
    pub fn apply_pause_response(&mut self, result: &PauseResult, now: DateTime<Utc>) {
        if self.session_id != Some(result.session_id) {
            return;
        }
        self.remote_aggregate_paused = result
            .participants
            .iter()
            .any(|p| p.user_id != self.user_id && p.is_paused);
        self.sync_timer(now);
    }

    /// Apply a feed or poll snapshot.
    ///
    /// Returns `true` when the tracked session is missing from the snapshot
    /// and the caller should fetch its status to reconcile.
    pub fn apply_snapshot(&mut self, snapshot: &SessionsSnapshot, now: DateTime<Utc>) -> bool {
        if let Some(current) = self.session_id
            && matches!(self.view, ClientView::Focus { .. })
        {
            if let Some(view) = snapshot.find(current) {
                self.reconcile(view, now);
                return false;
            }
            return true;
        }

        if self.do_not_disturb {
            return false;
        }
        let candidate = snapshot
            .active
            .iter()
            .find(|v| v.has_participant(self.user_id) && !self.seen.contains(&v.session.id));
        if let Some(view) = candidate {
            info!(session_id = %view.session.id, "Joining session started elsewhere");
            self.seen.insert(view.session.id);
            self.enter_focus(view, now);
        }
        false
    }

    /// Align with the authoritative status of the tracked session.
    ///
    /// A session that is no longer active moves the view to `Summary` with
    /// the server's end time and minutes, and stops the timer.
    pub fn reconcile(&mut self, status: &SessionStatusView, now: DateTime<Utc>) {
        if self.session_id != Some(status.session.id) {
            return;
        }

        if status.session.is_active() {
            self.remote_aggregate_paused = status.others_paused(self.user_id);
            self.sync_timer(now);
            return;
        }

        if let Some(timer) = self.timer.as_mut() {
            timer.stop(status.session.end_time.unwrap_or(now));
        }
        self.remote_aggregate_paused = false;
        debug!(session_id = %status.session.id, status = %status.status, "Session finished");
        self.view = ClientView::Summary(SessionSummary {
            session_id: status.session.id,
            status: status.status,
            end_time: status.session.end_time,
            minutes: status.session.minutes,
        });
    }

    /// Leave the current session by hand.
    ///
    /// Sets the do-not-disturb latch so later sessions are not entered
    /// automatically. Returns the session that was left.
    pub fn exit(&mut self, now: DateTime<Utc>) -> Option<SessionId> {
        self.do_not_disturb = true;
        if let Some(timer) = self.timer.as_mut() {
            timer.stop(now);
        }
        self.view = ClientView::Idle;
        self.remote_aggregate_paused = false;
        self.session_id.take()
    }

    /// Close the summary screen.
    pub fn dismiss_summary(&mut self) {
        if matches!(self.view, ClientView::Summary(_)) {
            self.view = ClientView::Idle;
            self.session_id = None;
            self.timer = None;
        }
    }

    fn enter_focus(&mut self, view: &SessionStatusView, now: DateTime<Utc>) {
        self.session_id = Some(view.session.id);
        self.view = ClientView::Focus {
            session_id: view.session.id,
        };
        self.timer = Some(FocusTimer::start(view.session.start_time.min(now)));
        self.remote_aggregate_paused = view.others_paused(self.user_id);
        self.sync_timer(now);

        let own_row_differs = view
            .participants
            .iter()
            .find(|p| p.user_id == self.user_id)
            .is_some_and(|p| p.is_paused != self.local_pause);
        self.entry = Some(FocusEntry {
            session_id: view.session.id,
            push_pause: own_row_differs.then_some(self.local_pause),
        });
    }

    fn sync_timer(&mut self, now: DateTime<Utc>) {
        let paused = self.display_status() == DisplayStatus::Paused;
        if let Some(timer) = self.timer.as_mut() {
            if paused {
                timer.pause(now);
            } else {
                timer.resume(now);
            }
        }
    }
}
