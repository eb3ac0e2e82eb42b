//! In-memory `RecordStore`: nothing survives the process.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::traits::RecordStore;

/// Map-backed record store.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<(String, String), serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, scope: &str, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(&(scope.to_string(), key.to_string())).cloned())
    }

    async fn set(
        &self,
        scope: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records.insert((scope.to_string(), key.to_string()), value.clone());
        Ok(())
    }

    async fn remove(&self, scope: &str, key: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        Ok(records
            .remove(&(scope.to_string(), key.to_string()))
            .is_some())
    }

    async fn entries(&self, scope: &str) -> Result<Vec<(String, serde_json::Value)>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|((s, _), _)| s == scope)
            .map(|((_, k), v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::traits::scopes;

    #[tokio::test]
    async fn behaves_like_a_record_store() {
        let store = MemoryStore::new();
        assert!(store.get(scopes::LOCAL, "x").await.unwrap().is_none());

        store.set(scopes::LOCAL, "x", &serde_json::json!(1)).await.unwrap();
        store.set(scopes::COOKIE, "x", &serde_json::json!(2)).await.unwrap();

        assert_eq!(store.get(scopes::LOCAL, "x").await.unwrap(), Some(serde_json::json!(1)));
        assert_eq!(store.entries(scopes::COOKIE).await.unwrap().len(), 1);
        assert!(store.remove(scopes::LOCAL, "x").await.unwrap());
        assert!(store.get(scopes::LOCAL, "x").await.unwrap().is_none());
    }
}
