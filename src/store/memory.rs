//! Implements the `KeyValueStore` trait using an in-memory map.
//!
//! Note: this is compiled even in the "production" version of this app so that the ledger can be
//! driven top-to-bottom without touching the disk.

use crate::store::KeyValueStore;
use crate::Result;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create a new `MemoryStore` seeded with `data`.
    pub fn new(data: HashMap<String, String>) -> Self {
        Self {
            data: Mutex::new(data),
        }
    }

    /// Returns a copy of everything stored.
    pub async fn dump(&self) -> HashMap<String, String> {
        self.data.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.data
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.data.lock().await.remove(key);
        Ok(())
    }
}
