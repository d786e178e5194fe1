//! Verge lifecycle orchestrator.
//!
//! Drives one remote resource toward a desired state: create then wait for
//! active, field-diffed update then wait for active, idempotent delete then
//! wait for gone, plus read and import. Externally driven; every operation
//! is a single synchronous reconciliation step on the caller's task, and no
//! state is held across calls beyond the injected client handle.

#![forbid(unsafe_code)]

use std::sync::Arc;

use metrics::{counter, histogram};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use verge_core::{
    ConfigMap, DesiredState, ErrorClass, ObservedState, ReconcileError, ReconcileResult,
    RemoteClient, ResourceKey, ResourceTypeDef, StatusClass,
};
use verge_tags::{diff_tags, reconcile_tags};
use verge_waiter::{wait_until, WaitConfig};

/// Orchestrator for one resource family. Cheap to construct per
/// reconciliation attempt; assumes the caller serializes attempts per key.
pub struct Reconciler {
    def: ResourceTypeDef,
    client: Arc<dyn RemoteClient>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("def", &self.def.name)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(def: ResourceTypeDef, client: Arc<dyn RemoteClient>) -> Self {
        Self { def, client }
    }

    pub fn def(&self) -> &ResourceTypeDef {
        &self.def
    }

    /// Encode the key the desired segments identify.
    pub fn key_for(&self, desired: &DesiredState) -> ReconcileResult<ResourceKey> {
        ResourceKey::encode(&desired.segments)
    }

    /// Issue the remote create and wait for the resource to become active.
    /// An "already exists" signal is a race with an out-of-band creation and
    /// surfaces as a fatal `Conflict`. On `Timeout`/`RemoteFailure` the
    /// remote resource may be left non-terminal; retry or teardown is the
    /// caller's decision.
    pub async fn create(
        &self,
        cancel: &CancellationToken,
        desired: &DesiredState,
    ) -> ReconcileResult<ObservedState> {
        if cancel.is_cancelled() {
            return Err(ReconcileError::Canceled);
        }
        let t0 = Instant::now();
        counter!("reconcile_create_attempts", 1u64);
        let key = self.key_for(desired)?;
        info!(type_name = self.def.name, key = %key, "create start");

        if let Err(err) = self.client.create(desired).await {
            counter!("reconcile_create_err", 1u64);
            return Err(match self.client.classify(&err) {
                ErrorClass::Conflict => {
                    warn!(key = %key, "create conflict: resource already exists");
                    ReconcileError::Conflict { key, message: err.to_string() }
                }
                _ => ReconcileError::Remote { key, source: err },
            });
        }

        self.wait_for(cancel, &key, &[StatusClass::Active], self.def.timeouts.create)
            .await
            .inspect_err(|_| counter!("reconcile_create_err", 1u64))?;
        let observed = self.describe_required(&key).await?;
        histogram!("reconcile_create_ms", t0.elapsed().as_secs_f64() * 1000.0);
        counter!("reconcile_create_ok", 1u64);
        info!(key = %key, took_ms = %t0.elapsed().as_millis(), "create settled");
        Ok(observed)
    }

    /// Single describe. Not-found is the distinguished `Ok(None)` — state
    /// has drifted to absent — never a generic error.
    pub async fn read(&self, key: &ResourceKey) -> ReconcileResult<Option<ObservedState>> {
        match self.client.describe(key).await {
            Ok(observed) => Ok(Some(self.classified(observed))),
            Err(err) => match self.client.classify(&err) {
                ErrorClass::NotFound => {
                    debug!(key = %key, "read: gone out of band");
                    Ok(None)
                }
                _ => Err(ReconcileError::Remote { key: key.clone(), source: err }),
            },
        }
    }

    /// Converge configuration and tags. Issues a remote update only for
    /// fields that differ from the observed state; identical desired state
    /// costs zero mutating calls. Families flagged `tags_via_list` get their
    /// observed tag map from the list call, since describe omits it.
    pub async fn update(
        &self,
        cancel: &CancellationToken,
        key: &ResourceKey,
        desired: &DesiredState,
    ) -> ReconcileResult<ObservedState> {
        if cancel.is_cancelled() {
            return Err(ReconcileError::Canceled);
        }
        let t0 = Instant::now();
        counter!("reconcile_update_attempts", 1u64);
        let observed = self
            .read(key)
            .await?
            .ok_or_else(|| ReconcileError::NotFound { key: key.clone() })?;

        let changed = changed_fields(&desired.config, &observed.config);
        let observed_tags = if self.def.tags_via_list {
            self.client
                .list_tags(key)
                .await
                .map_err(|source| ReconcileError::Remote { key: key.clone(), source })?
        } else {
            observed.tags.clone()
        };
        let tag_diff = diff_tags(&desired.tags, &observed_tags);
        if changed.is_empty() && tag_diff.is_empty() {
            debug!(key = %key, "update: already converged");
            counter!("reconcile_update_noop", 1u64);
            return Ok(observed);
        }

        if !changed.is_empty() {
            info!(key = %key, fields = changed.len(), "update start");
            if let Err(err) = self.client.update(key, &changed).await {
                counter!("reconcile_update_err", 1u64);
                return Err(match self.client.classify(&err) {
                    ErrorClass::NotFound => ReconcileError::NotFound { key: key.clone() },
                    ErrorClass::Conflict => ReconcileError::Conflict {
                        key: key.clone(),
                        message: err.to_string(),
                    },
                    _ => ReconcileError::Remote { key: key.clone(), source: err },
                });
            }
            self.wait_for(cancel, key, &[StatusClass::Active], self.def.timeouts.update)
                .await
                .inspect_err(|_| counter!("reconcile_update_err", 1u64))?;
        }

        if !tag_diff.is_empty() {
            reconcile_tags(self.client.as_ref(), key, &desired.tags, &observed_tags).await?;
        }

        let settled = self.describe_required(key).await?;
        histogram!("reconcile_update_ms", t0.elapsed().as_secs_f64() * 1000.0);
        counter!("reconcile_update_ok", 1u64);
        info!(key = %key, took_ms = %t0.elapsed().as_millis(), "update settled");
        Ok(settled)
    }

    /// Issue the remote delete and wait for the resource to be gone.
    /// Not-found from the delete call itself is success.
    pub async fn delete(&self, cancel: &CancellationToken, key: &ResourceKey) -> ReconcileResult<()> {
        if cancel.is_cancelled() {
            return Err(ReconcileError::Canceled);
        }
        let t0 = Instant::now();
        counter!("reconcile_delete_attempts", 1u64);
        info!(key = %key, "delete start");
        if let Err(err) = self.client.delete(key).await {
            return match self.client.classify(&err) {
                ErrorClass::NotFound => {
                    debug!(key = %key, "delete: already gone");
                    counter!("reconcile_delete_ok", 1u64);
                    Ok(())
                }
                _ => {
                    counter!("reconcile_delete_err", 1u64);
                    Err(ReconcileError::Remote { key: key.clone(), source: err })
                }
            };
        }
        self.wait_for(cancel, key, &[StatusClass::Absent], self.def.timeouts.delete)
            .await
            .inspect_err(|_| counter!("reconcile_delete_err", 1u64))?;
        histogram!("reconcile_delete_ms", t0.elapsed().as_secs_f64() * 1000.0);
        counter!("reconcile_delete_ok", 1u64);
        info!(key = %key, took_ms = %t0.elapsed().as_millis(), "delete settled");
        Ok(())
    }

    /// Recover a key from its raw persisted form and validate it resolves
    /// remotely. Fails with `MalformedKey` on bad arity and `NotFound` when
    /// the decoded key does not resolve.
    pub async fn import(&self, raw: &str) -> ReconcileResult<ObservedState> {
        let key = ResourceKey::from_raw(raw);
        let segments = key.decode(self.def.arity)?;
        debug!(key = %key, segments = segments.len(), "import: key decoded");
        self.read(&key)
            .await?
            .ok_or_else(|| ReconcileError::NotFound { key })
    }

    /// Adapters relay the raw status string; the class the rest of the
    /// orchestrator acts on always comes from the family's classifier.
    fn classified(&self, mut observed: ObservedState) -> ObservedState {
        observed.status = (self.def.classify_status)(&observed.raw_status);
        observed
    }

    async fn describe_required(&self, key: &ResourceKey) -> ReconcileResult<ObservedState> {
        match self.client.describe(key).await {
            Ok(observed) => Ok(self.classified(observed)),
            Err(err) => match self.client.classify(&err) {
                ErrorClass::NotFound => Err(ReconcileError::NotFound { key: key.clone() }),
                _ => Err(ReconcileError::Remote { key: key.clone(), source: err }),
            },
        }
    }

    async fn wait_for(
        &self,
        cancel: &CancellationToken,
        key: &ResourceKey,
        want: &[StatusClass],
        timeout: std::time::Duration,
    ) -> ReconcileResult<()> {
        let client = self.client.as_ref();
        let classify_status = self.def.classify_status;
        wait_until(
            cancel,
            key,
            || async move { client.describe(key).await.map(|o| classify_status(&o.raw_status)) },
            want,
            &[StatusClass::Failed],
            WaitConfig::new(timeout, self.def.timeouts.poll_interval),
            |err| client.classify(err),
        )
        .await
    }
}

/// Fields present in `desired` whose values differ from `observed`
/// (including fields the remote does not report yet). Fields absent from
/// `desired` are left untouched.
pub fn changed_fields(desired: &ConfigMap, observed: &ConfigMap) -> ConfigMap {
    desired
        .iter()
        .filter(|(k, v)| observed.get(*k) != Some(*v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(pairs: &[(&str, serde_json::Value)]) -> ConfigMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn changed_fields_picks_only_differing_keys() {
        let desired = config(&[
            ("addon_version", json!("v1.7.5-eksbuild.1")),
            ("resolve_conflicts", json!("OVERWRITE")),
        ]);
        let observed = config(&[
            ("addon_version", json!("v1.6.3-eksbuild.1")),
            ("resolve_conflicts", json!("OVERWRITE")),
            ("service_account_role_arn", json!("arn:aws:iam::1:role/x")),
        ]);
        let changed = changed_fields(&desired, &observed);
        assert_eq!(changed.len(), 1);
        assert_eq!(changed["addon_version"], json!("v1.7.5-eksbuild.1"));
    }

    #[test]
    fn changed_fields_empty_when_converged() {
        let desired = config(&[("addon_version", json!("v1"))]);
        assert!(changed_fields(&desired, &desired).is_empty());
    }

    #[test]
    fn changed_fields_includes_fields_remote_has_not_reported() {
        let desired = config(&[("service_account_role_arn", json!("arn:aws:iam::1:role/x"))]);
        let changed = changed_fields(&desired, &ConfigMap::new());
        assert_eq!(changed.len(), 1);
    }
}
