use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Key, KvStore, StoreError};

/// Process-local store, used by tests and `STORE=memory`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<Key, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        return Self::default();
    }

    pub async fn len(&self) -> usize {
        return self.entries.read().await.len();
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &Key) -> Result<Option<String>, StoreError> {
        return Ok(self.entries.read().await.get(key).cloned());
    }

    async fn set(&self, key: &Key, value: String) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.clone(), value);
        return Ok(());
    }

    async fn list(&self, prefix: &Key) -> Result<Vec<(Key, String)>, StoreError> {
        let entries = self.entries.read().await;
        let res = entries
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.parts().starts_with(prefix.parts()))
            .filter(|(key, _)| key.is_under(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        return Ok(res);
    }

    async fn delete(&self, key: &Key) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        return Ok(());
    }
}
