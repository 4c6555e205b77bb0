use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tracing::instrument;

use super::{AnalysisStore, StoreKey};
use crate::types::AnalysisKind;

/// Process-local [`AnalysisStore`]. Each upsert is a single map insert, so it is atomic per key.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    items: DashMap<(StoreKey, AnalysisKind), Value>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnalysisStore for InMemoryStore {
    #[instrument(skip(self), fields(namespace = %key))]
    async fn get(&self, key: &StoreKey, kind: AnalysisKind) -> anyhow::Result<Option<Value>> {
        Ok(self.items.get(&(key.clone(), kind)).map(|entry| entry.value().clone()))
    }

    #[instrument(skip(self, payload), fields(namespace = %key))]
    async fn upsert(&self, key: &StoreKey, kind: AnalysisKind, payload: Value) -> anyhow::Result<()> {
        self.items.insert((key.clone(), kind), payload);
        Ok(())
    }
}
