use crate::commands::Out;
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory and:
/// - Creates an initial `config.json` file with default settings
/// - Creates an empty SQLite store for the ledger
///
/// # Arguments
/// - `home` - The directory that will be the root of data directory, e.g. `$HOME/myfinance`
///
/// # Errors
/// - Returns an error if any file operations fail, or if the directory was already initialized.
pub async fn init(home: &Path) -> Result<Out<()>> {
    let config = Config::create(home)
        .await
        .context("Unable to create the data directory and configs")?;
    Ok(format!(
        "Successfully created the myfinance directory at {}",
        config.root().display()
    )
    .into())
}
