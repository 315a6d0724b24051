//! Rate limiter whose quota follows the backend's feedback.
//!
//! Slack tells callers how long to back off through `Retry-After`. The
//! limiter starts open, gets tightened to one call per retry-after period when
//! the backend complains, and is opened again after the next success.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use error_stack::report;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, ModelResult};

/// Longest back-off the limiter installs. Longer hints are clamped.
pub const MAX_PERIOD: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
struct ActiveLimit {
    period: Duration,
    limiter: Arc<DefaultDirectRateLimiter>,
}

/// Shared limiter gating outbound calls of one configured backend.
///
/// `None` inside the lock means unlimited. The lock is only held to swap or
/// clone the current limiter, never across an await.
#[derive(Debug, Default)]
pub struct AdaptiveRateLimiter {
    current: RwLock<Option<ActiveLimit>>,
}

impl AdaptiveRateLimiter {
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Allows one call per `period`, capped at [`MAX_PERIOD`]. The first cell
    /// of the new quota is consumed immediately, so the next call waits a full
    /// period.
    pub fn set_period(&self, period: Duration) {
        if period > MAX_PERIOD {
            tracing::warn!(?period, max = ?MAX_PERIOD, "Retry-after hint clamped");
        }
        let period = period.min(MAX_PERIOD);
        let Some(quota) = Quota::with_period(period) else {
            self.set_unlimited();
            return;
        };
        let limiter = RateLimiter::direct(quota);
        let _ = limiter.check();
        tracing::debug!(?period, "Rate limiter tightened");
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(ActiveLimit {
            period,
            limiter: Arc::new(limiter),
        });
    }

    pub fn set_unlimited(&self) {
        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            tracing::debug!("Rate limiter reset to unlimited");
        }
    }

    /// Interval between two allowed calls, `None` when unlimited.
    pub fn period(&self) -> Option<Duration> {
        self.active().map(|limit| limit.period)
    }

    /// Waits until a call is allowed or `cancel` fires.
    ///
    /// A token that is already cancelled returns [`Error::Cancelled`] without
    /// consuming a cell.
    pub async fn until_ready(&self, cancel: &CancellationToken) -> ModelResult<()> {
        if cancel.is_cancelled() {
            return Err(report!(Error::Cancelled));
        }
        let Some(limit) = self.active() else {
            return Ok(());
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(report!(Error::Cancelled)
                .attach_printable("Cancelled while waiting for rate limiter")),
            _ = limit.limiter.until_ready() => Ok(()),
        }
    }

    fn active(&self) -> Option<ActiveLimit> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
