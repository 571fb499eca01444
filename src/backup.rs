//! JSON snapshots of the ledger kept in `$MYFINANCE_HOME/.backups`.

use crate::ledger::Snapshot;
use crate::{utils, Config, Result};
use anyhow::Context;
use chrono::Local;
use std::path::PathBuf;
use tracing::debug;

/// Prefix for the snapshot taken before everything is deleted.
pub const PRE_RESET: &str = "pre-reset";

/// Prefix for snapshots taken with `myfinance backup`.
pub const MANUAL: &str = "manual";

const JSON: &str = "json";

/// Manages backup file creation and rotation.
///
/// The `Backup` struct is immutable and owns copies of the paths and settings it needs.
/// Create a new instance via `Config::backup()` or `Backup::new()`.
#[derive(Debug, Clone)]
pub struct Backup {
    backups_dir: PathBuf,
    backup_copies: u32,
}

impl Backup {
    pub fn new(config: &Config) -> Self {
        Self {
            backups_dir: config.backups().to_path_buf(),
            backup_copies: config.backup_copies(),
        }
    }

    /// Saves `snapshot` as a pretty-printed JSON backup file.
    ///
    /// The filename format is `{prefix}.YYYY-MM-DD-NNN.json` where NNN is a sequence number.
    /// Automatically rotates old backups, keeping only `backup_copies` files per prefix.
    ///
    /// Returns the path to the created backup file.
    pub async fn save_json(&self, prefix: &str, snapshot: &Snapshot) -> Result<PathBuf> {
        let date = today();
        let seq = self.next_sequence_number(prefix, &date).await?;
        let path = self.backups_dir.join(format!("{prefix}.{date}-{seq:03}.{JSON}"));

        let json = serde_json::to_string_pretty(snapshot)
            .context("Failed to serialize the ledger snapshot to JSON")?;
        utils::write(&path, json).await?;
        debug!("Wrote backup {}", path.display());

        self.rotate(prefix).await?;

        Ok(path)
    }

    /// Scans the backups directory for files with the given prefix and date and returns the next
    /// sequence number.
    async fn next_sequence_number(&self, prefix: &str, date: &str) -> Result<u32> {
        let mut max_seq: u32 = 0;
        for name in self.file_names().await? {
            if let Some(seq) = parse_sequence_number(&name, prefix, date) {
                max_seq = max_seq.max(seq);
            }
        }
        Ok(max_seq + 1)
    }

    /// Deletes the oldest files with `prefix` until only `backup_copies` remain.
    async fn rotate(&self, prefix: &str) -> Result<()> {
        let mut files: Vec<String> = self
            .file_names()
            .await?
            .into_iter()
            .filter(|name| is_backup_file(name, prefix))
            .collect();

        // The name sorts by date and then by sequence number.
        files.sort();

        let to_delete = files.len().saturating_sub(self.backup_copies as usize);
        for name in files.into_iter().take(to_delete) {
            debug!("Rotating out backup {name}");
            utils::remove(self.backups_dir.join(name)).await?;
        }
        Ok(())
    }

    async fn file_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut dir = utils::read_dir(&self.backups_dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        Ok(names)
    }
}

/// Returns today's date in YYYY-MM-DD format.
fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Parses the sequence number from a backup filename like `{prefix}.{date}-{NNN}.json`.
/// Returns None if the filename doesn't match.
fn parse_sequence_number(filename: &str, prefix: &str, date: &str) -> Option<u32> {
    filename
        .strip_prefix(&format!("{prefix}.{date}-"))?
        .strip_suffix(&format!(".{JSON}"))?
        .parse()
        .ok()
}

fn is_backup_file(filename: &str, prefix: &str) -> bool {
    filename.starts_with(&format!("{prefix}.")) && filename.ends_with(&format!(".{JSON}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Draft, Kind};
    use crate::test::TestEnv;

    #[test]
    fn test_parse_sequence_number() {
        assert_eq!(
            parse_sequence_number("pre-reset.2025-12-14-001.json", "pre-reset", "2025-12-14"),
            Some(1)
        );
        assert_eq!(
            parse_sequence_number("manual.2025-12-14-042.json", "manual", "2025-12-14"),
            Some(42)
        );
        // Wrong prefix
        assert_eq!(
            parse_sequence_number("manual.2025-12-14-001.json", "pre-reset", "2025-12-14"),
            None
        );
        // Wrong date
        assert_eq!(
            parse_sequence_number("manual.2025-12-13-001.json", "manual", "2025-12-14"),
            None
        );
        assert_eq!(
            parse_sequence_number("manual.2025-12-14-xyz.json", "manual", "2025-12-14"),
            None
        );
    }

    #[test]
    fn test_is_backup_file() {
        assert!(is_backup_file("manual.2025-12-14-001.json", "manual"));
        assert!(is_backup_file("pre-reset.2025-12-14-001.json", "pre-reset"));
        assert!(!is_backup_file("manual.2025-12-14-001.json", "pre-reset"));
        assert!(!is_backup_file("manual.2025-12-14-001.txt", "manual"));
    }

    #[tokio::test]
    async fn test_save_json() {
        let env = TestEnv::new().await;
        let ledger = env.ledger().await;
        ledger
            .add_transaction(&Draft::new("12,50", "Mercado", "", Kind::Expense))
            .await
            .unwrap();
        let snapshot = ledger.snapshot().await;

        let path = env.config().backup().save_json(MANUAL, &snapshot).await.unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(&format!("manual.{}-001", today())));

        let read: Snapshot = utils::deserialize(&path).await.unwrap();
        assert_eq!(read, snapshot);
    }

    #[tokio::test]
    async fn test_rotation() {
        let env = TestEnv::new().await;
        let config = env.config();
        let backup = config.backup();
        let snapshot = Snapshot::default();
        for _ in 0..(config.backup_copies() + 2) {
            backup.save_json(PRE_RESET, &snapshot).await.unwrap();
        }
        backup.save_json(MANUAL, &snapshot).await.unwrap();

        let names = backup.file_names().await.unwrap();
        let pre_reset = names.iter().filter(|n| is_backup_file(n, PRE_RESET)).count();
        assert_eq!(pre_reset, config.backup_copies() as usize);
        assert_eq!(names.iter().filter(|n| is_backup_file(n, MANUAL)).count(), 1);
        let oldest_kept = format!("{PRE_RESET}.{}-003.json", today());
        assert!(names.contains(&oldest_kept));
    }
}
