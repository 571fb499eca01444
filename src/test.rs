//! Shared test utilities.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::store::{KeyValueStore, MemoryStore};
use crate::{Config, Ledger, Result};
use anyhow::bail;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::{Notify, Semaphore};

/// Test environment with a myfinance home directory, its Config and an empty store.
/// Holds TempDir to keep the directory alive for the duration of the test.
pub struct TestEnv {
    _temp_dir: TempDir,
    config: Config,
}

impl TestEnv {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::create(temp_dir.path().join("myfinance"))
            .await
            .unwrap();
        Self {
            _temp_dir: temp_dir,
            config,
        }
    }

    pub fn config(&self) -> Config {
        self.config.clone()
    }

    /// A ledger over the environment's store, already loaded.
    pub async fn ledger(&self) -> Ledger {
        let ledger = self.config.ledger();
        ledger.load().await;
        ledger
    }
}

/// A store whose every operation fails.
#[derive(Debug)]
pub struct FailingStore;

#[async_trait::async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        bail!("Unable to read '{key}': the disk is gone")
    }

    async fn set(&self, key: &str, _value: &str) -> Result<()> {
        bail!("Unable to write '{key}': the disk is full")
    }

    async fn remove(&self, key: &str) -> Result<()> {
        bail!("Unable to remove '{key}': the disk is gone")
    }
}

/// Which calls a `GatedStore` holds back.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Gated {
    Reads,
    Writes,
}

/// A `MemoryStore` whose gated calls wait until `open` is called. Other calls go straight through.
#[derive(Debug)]
pub struct GatedStore {
    inner: MemoryStore,
    gated: Gated,
    gate: Semaphore,
    waiting: Notify,
}

impl GatedStore {
    pub fn new(gated: Gated, data: HashMap<String, String>) -> Self {
        Self {
            inner: MemoryStore::new(data),
            gated,
            gate: Semaphore::new(0),
            waiting: Notify::new(),
        }
    }

    /// Returns once a gated call is waiting.
    pub async fn waiting(&self) {
        self.waiting.notified().await
    }

    /// Lets every gated call through from now on.
    pub fn open(&self) {
        self.gate.add_permits(1);
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    async fn pass(&self, call: Gated) -> Result<()> {
        if call == self.gated {
            self.waiting.notify_one();
            let _permit = self.gate.acquire().await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl KeyValueStore for GatedStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.pass(Gated::Reads).await?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.pass(Gated::Writes).await?;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.pass(Gated::Writes).await?;
        self.inner.remove(key).await
    }
}

/// Wraps `store` for a ledger under test.
pub fn shared<S: KeyValueStore + 'static>(store: S) -> (Arc<S>, Arc<dyn KeyValueStore>) {
    let store = Arc::new(store);
    let dyn_store: Arc<dyn KeyValueStore> = store.clone();
    (store, dyn_store)
}
