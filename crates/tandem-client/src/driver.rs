//! Poll loop tying the reconciler to the transport.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tandem_core::clock::Clock;
use tandem_core::error::ErrorKind;
use tandem_core::result::AppResult;
use tandem_core::types::{SessionId, UserId};
use tandem_entity::session::{EndOutcome, SessionStatusView};

use crate::api::SessionApi;
use crate::debounce::PauseDebouncer;
use crate::reconciler::ClientReconciler;
use crate::reconnect::ReconnectPolicy;

/// Client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server root, e.g. `http://localhost:8080`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Delay between snapshot polls while connected.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Quiet period before a pause change is sent.
    #[serde(default = "default_pause_debounce")]
    pub pause_debounce_ms: u64,
    /// Per-request timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    /// Delay between presence heartbeats; keep it under the server's
    /// online window.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,
    /// Backoff while the server is unreachable.
    #[serde(default)]
    pub reconnect: ReconnectPolicy,
}

impl ClientConfig {
    /// Poll interval as a `Duration`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Debounce period as a `Duration`.
    pub fn pause_debounce(&self) -> Duration {
        Duration::from_millis(self.pause_debounce_ms)
    }

    /// Request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Heartbeat interval as a `Duration`.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            poll_interval_ms: default_poll_interval(),
            pause_debounce_ms: default_pause_debounce(),
            request_timeout_ms: default_request_timeout(),
            heartbeat_interval_ms: default_heartbeat_interval(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_poll_interval() -> u64 {
    2000
}

fn default_pause_debounce() -> u64 {
    300
}

fn default_request_timeout() -> u64 {
    5000
}

fn default_heartbeat_interval() -> u64 {
    30_000
}

/// Drives a [`ClientReconciler`] from a [`SessionApi`].
#[derive(Debug)]
pub struct PollDriver<A> {
    api: A,
    reconciler: ClientReconciler,
    debouncer: PauseDebouncer,
    policy: ReconnectPolicy,
    poll_interval: Duration,
    heartbeat_interval: Duration,
    clock: Arc<dyn Clock>,
    failures: u32,
    heartbeat_failures: u32,
    unsent_pause: Option<bool>,
    unsent_end: Option<(SessionId, i64)>,
}

impl<A: SessionApi> PollDriver<A> {
    /// Creates a driver for `user_id`.
    pub fn new(api: A, user_id: UserId, config: &ClientConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            api,
            reconciler: ClientReconciler::new(user_id),
            debouncer: PauseDebouncer::new(config.pause_debounce()),
            policy: config.reconnect,
            poll_interval: config.poll_interval(),
            heartbeat_interval: config.heartbeat_interval(),
            clock,
            failures: 0,
            heartbeat_failures: 0,
            unsent_pause: None,
            unsent_end: None,
        }
    }

    /// Current client state.
    pub fn reconciler(&self) -> &ClientReconciler {
        &self.reconciler
    }

    /// Mutable client state, for wiring UI actions.
    pub fn reconciler_mut(&mut self) -> &mut ClientReconciler {
        &mut self.reconciler
    }

    /// The transport.
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Consecutive failed polls.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Session whose end could not be delivered yet.
    pub fn unsent_end(&self) -> Option<SessionId> {
        self.unsent_end.map(|(id, _)| id)
    }

    /// Feed a sensor reading; changes are queued for a debounced push.
    pub fn set_local_pause(&mut self, paused: bool) {
        if self.reconciler.on_sensor(paused, self.clock.now()) {
            self.debouncer.push(paused);
        }
    }

    /// Show a session this device just created.
    pub fn begin(&mut self, view: &SessionStatusView) {
        self.reconciler.begin_local(view, self.clock.now());
        self.sync_entry();
    }

    /// Fetch a snapshot and apply it, reconciling the tracked session if
    /// the snapshot no longer lists it.
    pub async fn poll_once(&mut self) -> AppResult<()> {
        let snapshot = self.api.active().await?;
        if self.reconciler.apply_snapshot(&snapshot, self.clock.now()) {
            self.refresh_status().await?;
        }
        self.sync_entry();
        Ok(())
    }

    /// Start pause bookkeeping afresh for a newly entered session and queue
    /// the local value if the server row disagrees.
    fn sync_entry(&mut self) {
        let Some(entry) = self.reconciler.take_entry() else {
            return;
        };
        self.debouncer.reset();
        self.unsent_pause = None;
        if let Some(paused) = entry.push_pause {
            debug!(session_id = %entry.session_id, paused, "Queueing pause state for new session");
            self.debouncer.push(paused);
        }
    }

    /// Fetch and apply the authoritative status of the tracked session.
    pub async fn refresh_status(&mut self) -> AppResult<()> {
        let Some(session_id) = self.reconciler.session_id() else {
            return Ok(());
        };
        let status = self.api.status(session_id).await?;
        self.reconciler.reconcile(&status, self.clock.now());
        Ok(())
    }

    /// Send a pause value to the server.
    pub async fn push_pause(&mut self, paused: bool) -> AppResult<()> {
        let Some(session_id) = self.reconciler.session_id() else {
            return Ok(());
        };
        match self.api.set_pause(session_id, paused).await {
            Ok(result) => {
                self.debouncer.mark_sent(paused);
                self.unsent_pause = None;
                self.reconciler.apply_pause_response(&result, self.clock.now());
                Ok(())
            }
            // The session ended under us.
            Err(e) if e.is(ErrorKind::InvalidState) => {
                self.unsent_pause = None;
                self.refresh_status().await
            }
            Err(e) => {
                if e.kind.is_retryable() {
                    self.unsent_pause = Some(paused);
                }
                Err(e)
            }
        }
    }

    /// Leave the current session and end it with the locally tracked minutes.
    ///
    /// The view leaves at once. If the server cannot be reached the end is
    /// kept and resent by [`tick`](Self::tick) once polls succeed again.
    pub async fn exit(&mut self) -> AppResult<Option<EndOutcome>> {
        let now = self.clock.now();
        let minutes = self.reconciler.elapsed_active_minutes(now);
        let Some(session_id) = self.reconciler.exit(now) else {
            return Ok(None);
        };
        self.debouncer.reset();
        self.unsent_pause = None;
        self.send_end(session_id, minutes).await.map(Some)
    }

    async fn send_end(&mut self, session_id: SessionId, minutes: i64) -> AppResult<EndOutcome> {
        match self.api.end(session_id, Some(minutes)).await {
            Ok(outcome) => {
                self.unsent_end = None;
                info!(
                    session_id = %session_id,
                    minutes = ?outcome.session.minutes,
                    already_ended = outcome.already_ended,
                    "Left session"
                );
                Ok(outcome)
            }
            Err(e) => {
                if e.kind.is_retryable() {
                    warn!(session_id = %session_id, error = %e, "Ending session failed, will retry");
                    self.unsent_end = Some((session_id, minutes));
                } else {
                    self.unsent_end = None;
                }
                Err(e)
            }
        }
    }

    /// Send one heartbeat. Returns the delay before the next one.
    pub async fn beat(&mut self) -> Duration {
        match self.api.heartbeat().await {
            Ok(()) => {
                self.heartbeat_failures = 0;
                self.heartbeat_interval
            }
            Err(e) if e.kind.is_retryable() => {
                let delay = self.policy.delay_for_attempt(self.heartbeat_failures);
                self.heartbeat_failures = self.heartbeat_failures.saturating_add(1);
                debug!(
                    error = %e,
                    failures = self.heartbeat_failures,
                    retry_in_ms = delay.as_millis() as u64,
                    "Heartbeat failed"
                );
                delay
            }
            Err(e) => {
                warn!(error = %e, "Heartbeat rejected");
                self.heartbeat_interval
            }
        }
    }

    /// One poll with error handling. Returns the delay before the next one.
    ///
    /// The first successful poll after a failure reconciles the tracked
    /// session and resends any pause value that could not be delivered.
    /// A pending end is retried after every successful poll.
    pub async fn tick(&mut self) -> Duration {
        match self.poll_once().await {
            Ok(()) => {
                if self.failures > 0 {
                    info!(failures = self.failures, "Reconnected");
                    self.failures = 0;
                    if let Err(e) = self.refresh_status().await {
                        warn!(error = %e, "Reconcile after reconnect failed");
                    }
                    if let Some(paused) = self.unsent_pause
                        && let Err(e) = self.push_pause(paused).await
                    {
                        warn!(error = %e, "Resending pause state failed");
                    }
                }
                if let Some((session_id, minutes)) = self.unsent_end
                    && let Err(e) = self.send_end(session_id, minutes).await
                {
                    debug!(error = %e, "Resending session end failed");
                }
                self.poll_interval
            }
            Err(e) if e.kind.is_retryable() => {
                let delay = self.policy.delay_for_attempt(self.failures);
                self.failures = self.failures.saturating_add(1);
                debug!(
                    error = %e,
                    failures = self.failures,
                    retry_in_ms = delay.as_millis() as u64,
                    "Poll failed"
                );
                delay
            }
            Err(e) => {
                warn!(error = %e, "Poll rejected");
                self.poll_interval
            }
        }
    }

    /// Heartbeat, poll and push until `cancel` fires.
    pub async fn run(&mut self, cancel: CancellationToken) {
        let next_poll = sleep(Duration::ZERO);
        let next_heartbeat = sleep(Duration::ZERO);
        tokio::pin!(next_poll, next_heartbeat);

        loop {
            self.sync_entry();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = &mut next_heartbeat => {
                    let delay = self.beat().await;
                    next_heartbeat.as_mut().reset(Instant::now() + delay);
                }
                paused = self.debouncer.ready() => {
                    if let Err(e) = self.push_pause(paused).await {
                        debug!(error = %e, "Pause push failed");
                    }
                }
                _ = &mut next_poll => {
                    let delay = self.tick().await;
                    next_poll.as_mut().reset(Instant::now() + delay);
                }
            }
        }
    }
}
