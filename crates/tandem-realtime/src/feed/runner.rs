//! The per-connection feed loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tandem_core::types::{ConnectionId, UserId};

use super::source::SnapshotSource;
use crate::message::OutboundFrame;
use crate::metrics::FeedMetrics;

/// Why a feed stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedExit {
    /// The token was cancelled: disconnect, eviction or shutdown.
    Cancelled,
    /// The receiving side is gone.
    Disconnected,
    /// A snapshot query failed; an error frame was sent.
    Failed,
}

/// Timing for one feed.
#[derive(Debug, Clone, Copy)]
pub struct FeedSettings {
    /// Time between frames.
    pub interval: Duration,
    /// Upper bound on a single snapshot query.
    pub query_timeout: Duration,
}

/// Push frames from `source` to `tx` until cancelled or failed.
///
/// The first frame is sent immediately. A query slower than
/// `query_timeout` skips that frame; ticks missed meanwhile are dropped
/// rather than bunched up.
pub async fn run_feed(
    conn_id: ConnectionId,
    user_id: UserId,
    source: Arc<dyn SnapshotSource>,
    settings: FeedSettings,
    tx: mpsc::Sender<OutboundFrame>,
    cancel: CancellationToken,
    metrics: Arc<FeedMetrics>,
) -> FeedExit {
    let mut ticker = interval(settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let kind = source.kind();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(conn_id = %conn_id, feed = %kind, "Feed cancelled");
                return FeedExit::Cancelled;
            }
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return FeedExit::Cancelled,
            r = timeout(settings.query_timeout, source.snapshot(user_id)) => r,
        };

        let frame = match result {
            Err(_) => {
                debug!(conn_id = %conn_id, feed = %kind, "Snapshot query timed out, skipping frame");
                metrics.frame_skipped();
                continue;
            }
            Ok(Err(e)) => {
                warn!(conn_id = %conn_id, feed = %kind, error = %e, "Snapshot query failed, closing feed");
                metrics.feed_error();
                let frame = OutboundFrame::Error {
                    code: e.kind.to_string(),
                    message: e.message.clone(),
                };
                // Wait briefly for buffer space so the client learns why the feed closed.
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return FeedExit::Cancelled,
                    sent = tx.send_timeout(frame, settings.query_timeout) => {
                        if sent.is_err() {
                            debug!(conn_id = %conn_id, feed = %kind, "Error frame not delivered");
                        }
                    }
                }
                return FeedExit::Failed;
            }
            Ok(Ok(frame)) => frame,
        };

        match tx.try_send(frame) {
            Ok(()) => metrics.frame_sent(),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(conn_id = %conn_id, feed = %kind, "Outbound buffer full, dropping frame");
                metrics.frame_skipped();
            }
            Err(mpsc::error::TrySendError::Closed(_)) => return FeedExit::Disconnected,
        }
    }
}
