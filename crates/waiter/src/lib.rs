//! Verge waiter: polls a remote status on a fixed interval until it reaches
//! a wanted terminal state, a failure state, or a deadline.
//!
//! All eventual-consistency waiting funnels through `wait_until`; nothing
//! else in the workspace re-implements retry loops.

#![forbid(unsafe_code)]

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use verge_core::{default_poll_interval, ErrorClass, ReconcileError, ReconcileResult, ResourceKey, StatusClass};

/// Wait budget for one poll loop. The deadline is wall-clock, measured from
/// the start of the wait, not per call.
#[derive(Debug, Clone, Copy)]
pub struct WaitConfig {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl WaitConfig {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self { timeout, poll_interval }
    }

    /// Budget with the environment-default poll interval.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(timeout, default_poll_interval())
    }
}

/// Poll `fetch` until it reports a status in `want`.
///
/// - A status in `fail` returns `RemoteFailure` immediately, no further polls.
/// - `Absent` (or a fetch error classified `NotFound`) is success when the
///   caller wants `Absent` — a delete wait — and fatal `NotFound` otherwise.
/// - Errors classified `Throttled` are logged and retried under the budget.
/// - Errors classified `Other` are non-retryable and fail fast.
/// - On deadline, returns `Timeout` carrying the last observed status, or
///   `Pending` when no poll ever reported one (e.g. throttled throughout).
/// - Cancellation stops promptly without issuing further remote calls; the
///   interval sleep holds no locks.
pub async fn wait_until<F, Fut, C>(
    cancel: &CancellationToken,
    key: &ResourceKey,
    mut fetch: F,
    want: &[StatusClass],
    fail: &[StatusClass],
    cfg: WaitConfig,
    classify: C,
) -> ReconcileResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<StatusClass>>,
    C: Fn(&anyhow::Error) -> ErrorClass,
{
    let started = Instant::now();
    let deadline = started + cfg.timeout;
    let mut last: Option<StatusClass> = None;
    let mut polls = 0u32;

    loop {
        if cancel.is_cancelled() {
            return Err(ReconcileError::Canceled);
        }
        if Instant::now() >= deadline {
            debug!(key = %key, polls, last = ?last, "wait deadline elapsed");
            // No poll ever reported a status; the wait was pending throughout.
            let last = last.unwrap_or(StatusClass::Pending);
            return Err(ReconcileError::Timeout { key: key.clone(), last });
        }

        polls += 1;
        match fetch().await {
            Ok(status) => {
                last = Some(status);
                if want.contains(&status) {
                    debug!(key = %key, polls, status = %status, took_ms = %started.elapsed().as_millis(), "wait settled");
                    return Ok(());
                }
                if status == StatusClass::Absent {
                    // Gone while we were waiting for it to exist.
                    return Err(ReconcileError::NotFound { key: key.clone() });
                }
                if fail.contains(&status) {
                    return Err(ReconcileError::RemoteFailure { key: key.clone(), status });
                }
                debug!(key = %key, polls, status = %status, "still settling");
            }
            Err(err) => match classify(&err) {
                ErrorClass::NotFound => {
                    if want.contains(&StatusClass::Absent) {
                        debug!(key = %key, polls, "not found while waiting for deletion; treating as gone");
                        return Ok(());
                    }
                    return Err(ReconcileError::NotFound { key: key.clone() });
                }
                ErrorClass::Throttled => {
                    warn!(key = %key, polls, error = %err, "throttled; retrying");
                }
                ErrorClass::Conflict => {
                    return Err(ReconcileError::Conflict {
                        key: key.clone(),
                        message: err.to_string(),
                    });
                }
                ErrorClass::Other => {
                    return Err(ReconcileError::Remote { key: key.clone(), source: err });
                }
            },
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(ReconcileError::Canceled),
            _ = tokio::time::sleep(cfg.poll_interval) => {}
        }
    }
}
