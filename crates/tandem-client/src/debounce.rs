//! Coalesces rapid local pause flips into one server write.

use std::time::Duration;

use tokio::time::{Instant, sleep_until};

/// Debouncer for the local pause flag.
///
/// Each [`push`](Self::push) restarts the delay; when it elapses the last
/// pushed value is released, unless it equals the last value sent.
#[derive(Debug, Clone)]
pub struct PauseDebouncer {
    delay: Duration,
    pending: Option<(bool, Instant)>,
    last_sent: Option<bool>,
}

impl PauseDebouncer {
    /// Creates a debouncer with the given quiet period.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            last_sent: None,
        }
    }

    /// Queue `paused`, replacing anything still pending.
    pub fn push(&mut self, paused: bool) {
        self.pending = Some((paused, Instant::now() + self.delay));
    }

    /// Value waiting to be released, if any.
    pub fn pending(&self) -> Option<bool> {
        self.pending.map(|(value, _)| value)
    }

    /// Record that `paused` reached the server.
    pub fn mark_sent(&mut self, paused: bool) {
        self.last_sent = Some(paused);
    }

    /// Forget pending and sent values. Called when the tracked session
    /// changes, since a value sent to one session says nothing about the next.
    pub fn reset(&mut self) {
        self.pending = None;
        self.last_sent = None;
    }

    /// Wait for the next value to send.
    ///
    /// Cancel-safe: dropping the future before it completes keeps the
    /// pending value.
    pub async fn ready(&mut self) -> bool {
        loop {
            match self.pending {
                Some((value, deadline)) => {
                    sleep_until(deadline).await;
                    self.pending = None;
                    if self.last_sent != Some(value) {
                        return value;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        }
    }
}

impl Default for PauseDebouncer {
    fn default() -> Self {
        Self::new(Duration::from_millis(300))
    }
}
