//! Verge core types: resource identity, status classes, desired/observed
//! state, the error taxonomy, and the remote client adapter trait.
//!
//! Everything here is plain data or a seam trait; no I/O lives in this crate.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod client;
pub mod error;
pub mod key;

pub use client::{ErrorClass, RemoteClient};
pub use error::{ReconcileError, ReconcileResult};
pub use key::{ResourceKey, KEY_DELIMITER};

/// Tag mapping as persisted remotely. Ordered so batched calls are
/// deterministic; insertion order is irrelevant to reconciliation.
pub type TagMap = BTreeMap<String, String>;

/// Mutable configuration fields as a flat field -> value map.
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// Abstract status classes every resource family collapses into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StatusClass {
    /// A mutation is in flight; keep polling.
    Pending,
    /// Stable and usable.
    Active,
    /// Terminal error state; surfaced as a failure.
    Failed,
    /// The resource does not exist (a valid terminal state for delete).
    Absent,
}

impl std::fmt::Display for StatusClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StatusClass::Pending => "pending",
            StatusClass::Active => "active",
            StatusClass::Failed => "failed",
            StatusClass::Absent => "absent",
        };
        f.write_str(s)
    }
}

/// Caller-supplied attributes for one reconciliation attempt.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DesiredState {
    /// Identifying path segments (e.g. cluster name + add-on name).
    pub segments: Vec<String>,
    /// Mutable configuration fields (version, conflict policy, role ref, ...).
    pub config: ConfigMap,
    pub tags: TagMap,
}

/// Last-fetched remote representation. Produced only by reads against the
/// remote client; never constructed by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservedState {
    pub key: ResourceKey,
    /// Class for `raw_status`. Orchestrator reads re-derive this through the
    /// family's `classify_status`, so adapters may fill it in best-effort.
    pub status: StatusClass,
    /// The remote status string as reported, for diagnostics.
    pub raw_status: String,
    pub config: ConfigMap,
    pub tags: TagMap,
}

/// Per-resource-type settle budgets. Defaults mirror the slowest observed
/// families; callers override per type. Policy, not architecture.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
    pub poll_interval: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(20 * 60),
            update: Duration::from_secs(20 * 60),
            delete: Duration::from_secs(40 * 60),
            poll_interval: default_poll_interval(),
        }
    }
}

/// Default fixed poll interval; `VERGE_POLL_INTERVAL_SECS` overrides.
pub fn default_poll_interval() -> Duration {
    let secs = std::env::var("VERGE_POLL_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(10);
    Duration::from_secs(secs)
}

/// Descriptor for one resource family: identity arity, settle budgets and
/// the family-specific mapping from raw remote status strings to classes.
#[derive(Clone, Copy)]
pub struct ResourceTypeDef {
    pub name: &'static str,
    /// Number of key segments (e.g. 2 for `<cluster>:<addon>`).
    pub arity: usize,
    pub timeouts: Timeouts,
    pub classify_status: fn(&str) -> StatusClass,
    /// Describe omits tags for this family; the observed tag map comes from
    /// the dedicated list-tags call instead.
    pub tags_via_list: bool,
}

impl std::fmt::Debug for ResourceTypeDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceTypeDef")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("timeouts", &self.timeouts)
            .field("tags_via_list", &self.tags_via_list)
            .finish()
    }
}
