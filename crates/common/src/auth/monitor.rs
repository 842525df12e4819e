//! Periodic expiry monitor
//!
//! A spawned task ticks at a fixed interval and runs a check closure until
//! its [`MonitorHandle`] is cancelled. The session manager owns the active
//! handle; there is never more than one monitor per manager.

use std::future::Future;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Handle to a running monitor task
///
/// Cloning shares the same cancellation token. Cancelling any clone stops the
/// task before its next tick.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    token: CancellationToken,
    period: Duration,
}

impl MonitorHandle {
    /// Stop the monitor. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Resolves once the monitor has been cancelled
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

/// Spawn a task that awaits `tick()` every `period` until cancelled
///
/// The first tick fires one full period after spawning. `tick` returns
/// `false` to stop the monitor from the inside (e.g. its owner is gone).
/// Without an ambient Tokio runtime nothing is spawned and the returned
/// handle is already cancelled.
pub fn spawn<F, Fut>(period: Duration, mut tick: F) -> MonitorHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    let handle = MonitorHandle { token: CancellationToken::new(), period };

    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        error!("expiry monitor requires a Tokio runtime; monitoring disabled");
        handle.cancel();
        return handle;
    };

    let token = handle.token.clone();
    runtime.spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(period_secs = period.as_secs_f64(), "expiry monitor started");

        loop {
            tokio::select! {
                () = token.cancelled() => break,
                _ = ticker.tick() => {
                    if !tick().await {
                        token.cancel();
                        break;
                    }
                }
            }
        }

        debug!("expiry monitor stopped");
    });

    handle
}
