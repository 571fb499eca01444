//! Command handlers for the myfinance CLI.
//!
//! Each handler opens the ledger from the configured store, loads it, performs one operation and
//! describes the outcome with an `Out`.

mod backup;
mod category;
mod init;
mod show;
mod transaction;
mod visibility;

use crate::{Config, Ledger, Result};
use anyhow::Context;
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use backup::{backup, reset};
pub use category::{category, suggest};
pub use init::init;
pub use show::{show, Overview};
pub use transaction::{add, delete, edit};
pub use visibility::visibility;

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// Opens the configured ledger and reads what is stored.
async fn open(config: &Config) -> Ledger {
    let ledger = config.ledger();
    ledger.load().await;
    ledger
}

/// Fails if a change did not reach the store. The process is about to exit, and a change that
/// only exists in memory would be lost with it.
fn saved(ledger: &Ledger) -> Result<()> {
    ledger
        .check_saved()
        .context("The change was made but could not be saved")
}

fn plural(count: usize, one: &str, many: &str) -> String {
    format!("{count} {}", if count == 1 { one } else { many })
}
