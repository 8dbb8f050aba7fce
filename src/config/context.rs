//! Process-level configuration context
//!
//! Holds the data directory and one shared driver plus defaults table per
//! namespace. Created once at startup and handed to every
//! [`Config::get_conf`](super::Config::get_conf) call; there is no ambient
//! global registry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use log::debug;
use serde_json::Value;

use super::driver::{Driver, FileDriver};
use super::identifier::Namespace;
use super::scope::ScopeKind;

/// Shared state for one namespace: its driver and its registered defaults
pub(crate) struct NamespaceState {
    pub(crate) driver: Arc<dyn Driver>,
    pub(crate) defaults: DashMap<ScopeKind, Value>,
}

#[derive(Clone)]
pub struct ConfigContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    data_dir: PathBuf,
    namespaces: DashMap<Namespace, Arc<NamespaceState>>,
}

impl ConfigContext {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                data_dir: data_dir.into(),
                namespaces: DashMap::new(),
            }),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.inner.data_dir
    }

    /// Driver serving `namespace`, created on first request
    pub fn driver(&self, namespace: &Namespace) -> Arc<dyn Driver> {
        Arc::clone(&self.namespace_state(namespace).driver)
    }

    /// Namespaces that have been requested so far
    pub fn namespaces(&self) -> Vec<Namespace> {
        let mut names: Vec<_> = self
            .inner
            .namespaces
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub(crate) fn namespace_state(&self, namespace: &Namespace) -> Arc<NamespaceState> {
        self.inner
            .namespaces
            .entry(namespace.clone())
            .or_insert_with(|| {
                debug!("Creating settings driver for {namespace}");
                Arc::new(NamespaceState {
                    driver: Arc::new(FileDriver::new(&self.inner.data_dir, namespace.clone())),
                    defaults: DashMap::new(),
                })
            })
            .value()
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_driver_per_namespace() {
        let ctx = ConfigContext::new("unused");
        let core = Namespace::new("Core", "0").unwrap();

        let first = ctx.driver(&core);
        let second = ctx.driver(&core);
        assert!(Arc::ptr_eq(&first, &second));

        let other = ctx.driver(&Namespace::new("Core", "1").unwrap());
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(ctx.namespaces().len(), 2);
    }

    #[test]
    fn test_clones_share_namespaces() {
        let ctx = ConfigContext::new("unused");
        let clone = ctx.clone();
        let core = Namespace::new("Core", "0").unwrap();

        assert!(Arc::ptr_eq(&ctx.driver(&core), &clone.driver(&core)));
    }
}
