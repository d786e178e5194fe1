//! Verge tag reconciler: computes the minimal difference between desired and
//! observed tag maps and issues at most one batched upsert call and one
//! batched remove call.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use tracing::debug;

use verge_core::{ReconcileError, ReconcileResult, RemoteClient, ResourceKey, TagMap};

/// Minimal set of remote calls needed to converge tags. The two sets are
/// disjoint by construction, so call order is unconstrained.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagDiff {
    /// Keys to create or overwrite; remote tag APIs treat set as an
    /// idempotent upsert, so adds and value changes fold together.
    pub upsert: TagMap,
    /// Keys present remotely but absent from the desired map.
    pub remove: Vec<String>,
}

impl TagDiff {
    pub fn is_empty(&self) -> bool {
        self.upsert.is_empty() && self.remove.is_empty()
    }
}

/// Pure diff of desired against observed tags.
pub fn diff_tags(desired: &TagMap, observed: &TagMap) -> TagDiff {
    let upsert: TagMap = desired
        .iter()
        .filter(|(k, v)| observed.get(*k) != Some(*v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let remove: Vec<String> = observed
        .keys()
        .filter(|k| !desired.contains_key(*k))
        .cloned()
        .collect();
    TagDiff { upsert, remove }
}

/// Issue the calls a diff requires. Never issues a call for an empty set;
/// a converged map costs zero remote calls.
pub async fn apply_diff(
    client: &dyn RemoteClient,
    key: &ResourceKey,
    diff: &TagDiff,
) -> ReconcileResult<()> {
    if !diff.upsert.is_empty() {
        client
            .tag_resource(key, &diff.upsert)
            .await
            .map_err(|source| ReconcileError::Remote { key: key.clone(), source })?;
    }
    if !diff.remove.is_empty() {
        client
            .untag_resource(key, &diff.remove)
            .await
            .map_err(|source| ReconcileError::Remote { key: key.clone(), source })?;
    }
    Ok(())
}

/// Converge remote tags toward `desired` given the last-observed map.
pub async fn reconcile_tags(
    client: &dyn RemoteClient,
    key: &ResourceKey,
    desired: &TagMap,
    observed: &TagMap,
) -> ReconcileResult<()> {
    let diff = diff_tags(desired, observed);
    if diff.is_empty() {
        debug!(key = %key, "tags converged; no calls");
        return Ok(());
    }
    debug!(key = %key, upserts = diff.upsert.len(), removes = diff.remove.len(), "reconciling tags");
    apply_diff(client, key, &diff).await
}
