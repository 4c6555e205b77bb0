//! Derived analysis store.
//!
//! A key-value cache of analysis payloads addressed by a namespace and an [`AnalysisKind`]:
//! one namespace per record (`RECORD_<id>`) plus the fixed aggregate namespace. At most one
//! payload exists per (namespace, kind); `upsert` overwrites, last writer wins.
//!
//! Two implementations:
//! - [`in_memory::InMemoryStore`]: process-local, used for development and tests
//! - [`sync_map::SyncMapStore`]: a remote sync-map service, one map per namespace

pub mod in_memory;
pub mod sync_map;

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

use crate::types::{AGGREGATE_NAMESPACE, AnalysisKind, RecordId, record_namespace};

pub use in_memory::InMemoryStore;
pub use sync_map::SyncMapStore;

/// Which namespace a payload lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Record(RecordId),
    Aggregate,
}

impl StoreKey {
    pub fn namespace(&self) -> String {
        match self {
            StoreKey::Record(id) => record_namespace(id),
            StoreKey::Aggregate => AGGREGATE_NAMESPACE.to_string(),
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.namespace())
    }
}

#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// The payload stored under `(key, kind)`, or `None` when either the namespace or the item
    /// doesn't exist.
    async fn get(&self, key: &StoreKey, kind: AnalysisKind) -> anyhow::Result<Option<Value>>;

    /// Create the item (and its namespace) if absent, otherwise overwrite it.
    async fn upsert(&self, key: &StoreKey, kind: AnalysisKind, payload: Value) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_key_namespaces() {
        assert_eq!(StoreKey::Record("GT1".to_string()).namespace(), "RECORD_GT1");
        assert_eq!(StoreKey::Aggregate.namespace(), "AGGREGATED_ANALYSIS");
    }
}
