//! Composite resource identifier codec.
//!
//! A key is one or more path segments joined by `:`; the delimiter is
//! reserved and not permitted inside a segment. The encoded string is the
//! only identity persisted between reconciliation invocations.

use serde::{Deserialize, Serialize};

use crate::error::{ReconcileError, ReconcileResult};

pub const KEY_DELIMITER: char = ':';

/// Opaque, stable identity for a managed remote resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Join segments into a key. Fails with `InvalidSegment` when a segment
    /// is empty or contains the delimiter.
    pub fn encode<I, S>(segments: I) -> ReconcileResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = String::new();
        let mut count = 0usize;
        for seg in segments {
            let seg = seg.as_ref();
            if seg.is_empty() {
                return Err(ReconcileError::InvalidSegment {
                    segment: seg.to_string(),
                    reason: "segment must not be empty",
                });
            }
            if seg.contains(KEY_DELIMITER) {
                return Err(ReconcileError::InvalidSegment {
                    segment: seg.to_string(),
                    reason: "segment must not contain the delimiter",
                });
            }
            if count > 0 {
                out.push(KEY_DELIMITER);
            }
            out.push_str(seg);
            count += 1;
        }
        if count == 0 {
            return Err(ReconcileError::InvalidSegment {
                segment: String::new(),
                reason: "at least one segment required",
            });
        }
        Ok(Self(out))
    }

    /// Wrap a raw persisted identifier without validation; `decode` is the
    /// validation step (the import path).
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Split back into segments. Fails with `MalformedKey` when the segment
    /// count does not match `arity` or a segment is empty (a string no
    /// `encode` call could have produced).
    pub fn decode(&self, arity: usize) -> ReconcileResult<Vec<String>> {
        let segments: Vec<String> = self.0.split(KEY_DELIMITER).map(str::to_string).collect();
        if segments.len() != arity {
            return Err(ReconcileError::MalformedKey {
                key: self.0.clone(),
                expected: arity,
                found: segments.len(),
            });
        }
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ReconcileError::MalformedKey {
                key: self.0.clone(),
                expected: arity,
                found: segments.iter().filter(|s| !s.is_empty()).count(),
            });
        }
        Ok(segments)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
