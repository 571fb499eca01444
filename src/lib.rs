//! myfinance keeps a personal ledger of income and expense transactions, each tagged with a
//! user-defined category, and derives the balance and the income and expense totals from it.
//!
//! The [`Ledger`] is the one place where the data is changed. It is written against the
//! [`store::KeyValueStore`] trait, so the same ledger runs over a SQLite file in the CLI and over
//! a [`store::MemoryStore`] anywhere else.

pub mod args;
mod backup;
pub mod commands;
mod config;
mod error;
pub mod ledger;
pub mod model;
pub mod store;
mod utils;

#[cfg(test)]
mod test;

pub use backup::Backup;
pub use config::Config;
pub use error::{Error, Rejection, Result};
pub use ledger::{Ledger, Load, Snapshot};
