//! Remote client adapter seam.
//!
//! One implementation per resource family wraps the actual cloud API. Error
//! shapes vary per transport, so methods return opaque `anyhow` errors and
//! `classify` is the family-supplied predicate that sorts them into the
//! classes reconciliation cares about.

use crate::{ConfigMap, DesiredState, ObservedState, ResourceKey, TagMap};

/// Classification of a transport error, as decided by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    Throttled,
    Conflict,
    /// Unrecognized shape; treated as non-retryable.
    Other,
}

/// Typed operations against the remote API for one resource family.
///
/// Implementations are stateless beyond their handle on the underlying SDK
/// client and are injected explicitly through every call path (no ambient
/// globals).
#[async_trait::async_trait]
pub trait RemoteClient: Send + Sync {
    async fn create(&self, desired: &DesiredState) -> anyhow::Result<ObservedState>;

    async fn describe(&self, key: &ResourceKey) -> anyhow::Result<ObservedState>;

    /// Apply only the supplied fields; untouched fields keep remote values.
    async fn update(&self, key: &ResourceKey, fields: &ConfigMap) -> anyhow::Result<ObservedState>;

    async fn delete(&self, key: &ResourceKey) -> anyhow::Result<()>;

    async fn list_tags(&self, key: &ResourceKey) -> anyhow::Result<TagMap>;

    /// Batched idempotent upsert of the given tags.
    async fn tag_resource(&self, key: &ResourceKey, tags: &TagMap) -> anyhow::Result<()>;

    async fn untag_resource(&self, key: &ResourceKey, keys: &[String]) -> anyhow::Result<()>;

    /// Sort a transport error into a reconciliation class. The default is
    /// conservative: unknown shapes fail fast rather than loop.
    fn classify(&self, err: &anyhow::Error) -> ErrorClass {
        let _ = err;
        ErrorClass::Other
    }
}
