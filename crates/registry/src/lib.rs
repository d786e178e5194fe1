//! Verge resource-type registry.
//!
//! An explicit dispatch table from resource-type names to their descriptors
//! and remote-client factories, built once at startup. No reflection, no
//! ambient globals; callers construct a registry, register the families
//! they serve, and pull fully-wired reconcilers out of it.

#![forbid(unsafe_code)]

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use verge_core::{RemoteClient, ResourceTypeDef};
use verge_lifecycle::Reconciler;

pub mod builtin;

/// Constructs the remote client adapter for one resource family.
pub type ClientFactory = Arc<dyn Fn() -> anyhow::Result<Arc<dyn RemoteClient>> + Send + Sync>;

struct Entry {
    def: ResourceTypeDef,
    factory: ClientFactory,
}

#[derive(Default)]
pub struct Registry {
    entries: FxHashMap<&'static str, Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource family. A duplicate name replaces the previous
    /// registration.
    pub fn register(&mut self, def: ResourceTypeDef, factory: ClientFactory) {
        let name = def.name;
        if self.entries.insert(name, Entry { def, factory }).is_some() {
            warn!(type_name = name, "replacing existing registration");
        } else {
            debug!(type_name = name, "registered resource type");
        }
    }

    pub fn def(&self, name: &str) -> Option<&ResourceTypeDef> {
        self.entries.get(name).map(|e| &e.def)
    }

    /// Build a reconciler for the named family from its stored factory.
    pub fn reconciler(&self, name: &str) -> anyhow::Result<Reconciler> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("unknown resource type: {name}"))?;
        let client = (entry.factory)()?;
        Ok(Reconciler::new(entry.def, client))
    }

    /// Registered type names in stable order.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.entries.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verge_core::{
        ConfigMap, DesiredState, ObservedState, ResourceKey, TagMap,
    };

    struct NullClient;

    #[async_trait::async_trait]
    impl RemoteClient for NullClient {
        async fn create(&self, _d: &DesiredState) -> anyhow::Result<ObservedState> {
            anyhow::bail!("null client")
        }
        async fn describe(&self, _k: &ResourceKey) -> anyhow::Result<ObservedState> {
            anyhow::bail!("null client")
        }
        async fn update(&self, _k: &ResourceKey, _f: &ConfigMap) -> anyhow::Result<ObservedState> {
            anyhow::bail!("null client")
        }
        async fn delete(&self, _k: &ResourceKey) -> anyhow::Result<()> {
            anyhow::bail!("null client")
        }
        async fn list_tags(&self, _k: &ResourceKey) -> anyhow::Result<TagMap> {
            anyhow::bail!("null client")
        }
        async fn tag_resource(&self, _k: &ResourceKey, _t: &TagMap) -> anyhow::Result<()> {
            anyhow::bail!("null client")
        }
        async fn untag_resource(&self, _k: &ResourceKey, _keys: &[String]) -> anyhow::Result<()> {
            anyhow::bail!("null client")
        }
    }

    fn null_factory() -> ClientFactory {
        Arc::new(|| Ok(Arc::new(NullClient) as Arc<dyn RemoteClient>))
    }

    #[test]
    fn registered_types_resolve_to_reconcilers() {
        let mut registry = Registry::new();
        for def in builtin::all() {
            registry.register(def, null_factory());
        }
        assert_eq!(
            registry.names(),
            vec!["eks_addon", "opensearchserverless_vpc_endpoint", "waf_web_acl"]
        );
        let rec = registry.reconciler("eks_addon").expect("wired");
        assert_eq!(rec.def().arity, 2);
        assert!(registry.reconciler("route53_zone").is_err());
    }

    #[test]
    fn duplicate_registration_replaces() {
        let mut registry = Registry::new();
        registry.register(builtin::eks_addon(), null_factory());
        let mut replacement = builtin::eks_addon();
        replacement.arity = 3;
        registry.register(replacement, null_factory());
        assert_eq!(registry.def("eks_addon").unwrap().arity, 3);
        assert_eq!(registry.names().len(), 1);
    }

    #[test]
    fn factory_errors_surface_from_reconciler() {
        let mut registry = Registry::new();
        registry.register(
            builtin::waf_web_acl(),
            Arc::new(|| anyhow::bail!("no credentials")),
        );
        let err = registry.reconciler("waf_web_acl").unwrap_err();
        assert!(err.to_string().contains("no credentials"));
    }
}
