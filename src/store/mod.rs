//! The key-value persistence contract the ledger is written against, and its implementations.
//!
//! Every value is a complete JSON document. Writers always replace a whole value, so a store never
//! has to merge anything.

mod memory;
mod migrations;
mod queue;
mod sqlite;

pub use memory::MemoryStore;
pub(crate) use queue::{Pending, WriteQueue};
pub use queue::Commit;
pub use sqlite::SqliteStore;

use crate::Result;
use std::fmt::Debug;

/// Where the transaction list is stored.
pub const TRANSACTIONS_KEY: &str = "@myfinance:transactions";

/// Where the category list is stored.
pub const CATEGORIES_KEY: &str = "@myfinance:categories";

/// Where the flag that masks monetary values is stored.
pub const VISIBILITY_KEY: &str = "@myfinance:visibility";

/// A very small asynchronous string map.
#[async_trait::async_trait]
pub trait KeyValueStore: Debug + Send + Sync {
    /// Returns the value stored under `key`, or `None` if there is none.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing whatever was there.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Deletes `key`. Deleting a key that does not exist is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}
