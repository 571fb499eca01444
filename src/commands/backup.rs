//! Backup and reset command handlers.

use crate::backup::{MANUAL, PRE_RESET};
use crate::commands::{open, plural, saved, Out};
use crate::{Config, Result};
use anyhow::{bail, Context};
use std::path::PathBuf;
use tracing::info;

/// Writes a JSON snapshot of the whole ledger to the backups directory.
///
/// # Returns
///
/// The path of the new backup file.
pub async fn backup(config: Config) -> Result<Out<PathBuf>> {
    let ledger = open(&config).await;
    let snapshot = ledger.snapshot().await;
    let path = config
        .backup()
        .save_json(MANUAL, &snapshot)
        .await
        .context("Unable to write the backup")?;
    let message = format!(
        "Saved {} and {} to {}",
        plural(snapshot.transactions.len(), "transaction", "transactions"),
        plural(snapshot.categories.len(), "category", "categories"),
        path.display()
    );
    Ok(Out::new(message, path))
}

/// Deletes every transaction and category. Refuses unless `--yes` was given. A snapshot of what
/// is about to be deleted is written to the backups directory first, and if that fails nothing is
/// deleted.
///
/// # Returns
///
/// The path of the backup taken before the reset.
pub async fn reset(config: Config, yes: bool) -> Result<Out<PathBuf>> {
    if !yes {
        bail!(
            "Resetting deletes every transaction and category and cannot be undone. Run the \
            command again with --yes to reset"
        );
    }
    let ledger = open(&config).await;
    let snapshot = ledger.snapshot().await;
    let path = config
        .backup()
        .save_json(PRE_RESET, &snapshot)
        .await
        .context("Unable to back up the ledger, nothing was deleted")?;
    info!("Saved a copy of the ledger to {}", path.display());

    ledger.reset_all().await;
    saved(&ledger)?;
    Ok(Out::new("Deleted all transactions and categories", path))
}
