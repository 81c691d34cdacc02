//! Feed metrics counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Counters shared by every feed.
#[derive(Debug, Default)]
pub struct FeedMetrics {
    feeds_opened: AtomicU64,
    feeds_active: AtomicU64,
    feeds_evicted: AtomicU64,
    frames_sent: AtomicU64,
    frames_skipped: AtomicU64,
    feed_errors: AtomicU64,
}

impl FeedMetrics {
    /// Create zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a feed opening.
    pub fn feed_opened(&self) {
        self.feeds_opened.fetch_add(1, Ordering::Relaxed);
        self.feeds_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a feed closing.
    pub fn feed_closed(&self) {
        self.feeds_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a feed pushed out by the per-user cap.
    pub fn feed_evicted(&self) {
        self.feeds_evicted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a delivered frame.
    pub fn frame_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a frame skipped on timeout or full buffer.
    pub fn frame_skipped(&self) {
        self.frames_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a feed torn down by a query error.
    pub fn feed_error(&self) {
        self.feed_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            feeds_opened: self.feeds_opened.load(Ordering::Relaxed),
            feeds_active: self.feeds_active.load(Ordering::Relaxed),
            feeds_evicted: self.feeds_evicted.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_skipped: self.frames_skipped.load(Ordering::Relaxed),
            feed_errors: self.feed_errors.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Feeds ever opened.
    pub feeds_opened: u64,
    /// Feeds currently running.
    pub feeds_active: u64,
    /// Feeds closed to make room for a newer one.
    pub feeds_evicted: u64,
    /// Frames delivered.
    pub frames_sent: u64,
    /// Frames skipped.
    pub frames_skipped: u64,
    /// Feeds closed by an error.
    pub feed_errors: u64,
}
