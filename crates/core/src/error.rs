//! Reconciliation error taxonomy.

use crate::{ResourceKey, StatusClass};

/// Typed outcomes the orchestrator surfaces to its caller.
///
/// `Throttled`/transient conditions never appear here: the poller retries
/// them under the overall timeout. `Canceled` propagates cancellation and is
/// not logged as an error.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("invalid segment {segment:?}: {reason}")]
    InvalidSegment { segment: String, reason: &'static str },

    #[error("malformed key {key:?}: expected {expected} segments, found {found}")]
    MalformedKey {
        key: String,
        expected: usize,
        found: usize,
    },

    #[error("not found: {key}")]
    NotFound { key: ResourceKey },

    #[error("conflict on {key}: {message}")]
    Conflict { key: ResourceKey, message: String },

    /// The resource entered a terminal failed provisioning state.
    #[error("remote failure on {key}: entered {status} state")]
    RemoteFailure { key: ResourceKey, status: StatusClass },

    /// The settle budget elapsed; carries the last-observed status so the
    /// caller can decide to re-poll or abandon.
    #[error("timed out waiting on {key}; last observed status {last}")]
    Timeout { key: ResourceKey, last: StatusClass },

    #[error("canceled")]
    Canceled,

    /// Non-retryable transport error, annotated with the resource key.
    #[error("remote error on {key}")]
    Remote {
        key: ResourceKey,
        #[source]
        source: anyhow::Error,
    },
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_reports_last_status() {
        let key = ResourceKey::encode(["c", "a"]).unwrap();
        let err = ReconcileError::Timeout {
            key,
            last: StatusClass::Pending,
        };
        assert_eq!(
            err.to_string(),
            "timed out waiting on c:a; last observed status pending"
        );
    }

    #[test]
    fn remote_error_preserves_source() {
        let key = ResourceKey::encode(["x"]).unwrap();
        let err = ReconcileError::Remote {
            key,
            source: anyhow::anyhow!("wire snapped"),
        };
        let source = std::error::Error::source(&err).expect("source");
        assert_eq!(source.to_string(), "wire snapped");
    }
}
