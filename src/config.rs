//! Configuration file handling for myfinance.
//!
//! The configuration file is stored at `$MYFINANCE_HOME/config.json` and says where the ledger is
//! stored and how many backup copies to keep.

use crate::backup::Backup;
use crate::store::{KeyValueStore, SqliteStore};
use crate::{utils, Ledger, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const APP_NAME: &str = "myfinance";
const CONFIG_VERSION: u8 = 1;
const BACKUP_COPIES: u32 = 5;
const BACKUPS: &str = ".backups";
const CONFIG_JSON: &str = "config.json";
const MYFINANCE_SQLITE: &str = "myfinance.sqlite";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$MYFINANCE_HOME` and from there it loads `$MYFINANCE_HOME/config.json`. It opens
/// the store the ledger lives in.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    backups: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    store_path: PathBuf,
    store: Arc<dyn KeyValueStore>,
}

impl Config {
    /// Creates the data directory, its `.backups` subdirectory, an initial `config.json` with
    /// default settings, and an empty store.
    ///
    /// # Errors
    /// - Returns an error if any file operations fail, or if a store already exists.
    pub async fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the myfinance home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let backups = root.join(BACKUPS);
        utils::make_dir(&backups).await?;

        let config_path = root.join(CONFIG_JSON);
        if config_path.exists() {
            bail!(
                "A config file already exists at '{}'",
                config_path.display()
            );
        }
        let config_file = ConfigFile::default();
        config_file.save(&config_path).await?;

        let store_path = resolve(&root, &config_file.store_path());
        let store = SqliteStore::init(&store_path)
            .await
            .context("Unable to create the ledger store")?;

        Ok(Self {
            root,
            backups,
            config_path,
            config_file,
            store_path,
            store: Arc::new(store),
        })
    }

    /// This will
    /// - validate that `home` exists and that the config file exists
    /// - load the config file
    /// - validate that the backups directory exists
    /// - open the store, migrating it if it is out of date
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The myfinance home directory is missing, run 'myfinance init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let backups = root.join(BACKUPS);
        if !backups.is_dir() {
            bail!("The backups directory is missing '{}'", backups.display())
        }

        let store_path = resolve(&root, &config_file.store_path());
        let store = SqliteStore::load(&store_path)
            .await
            .context("Unable to open the ledger store")?;

        Ok(Self {
            root,
            backups,
            config_path,
            config_file,
            store_path,
            store: Arc::new(store),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn backups(&self) -> &Path {
        &self.backups
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    pub fn backup_copies(&self) -> u32 {
        self.config_file.backup_copies
    }

    /// A new, not yet loaded, ledger over the configured store.
    pub fn ledger(&self) -> Ledger {
        Ledger::new(Arc::clone(&self.store))
    }

    /// The same configuration over a different store.
    #[cfg(test)]
    pub(crate) fn with_store(self, store: Arc<dyn KeyValueStore>) -> Self {
        Self { store, ..self }
    }

    /// Creates a new `Backup` instance for managing backup files.
    pub fn backup(&self) -> Backup {
        Backup::new(self)
    }
}

fn resolve(root: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        return p.to_path_buf();
    }
    root.join(p)
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "myfinance",
///   "config_version": 1,
///   "backup_copies": 5,
///   "store_path": "myfinance.sqlite"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "myfinance"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Number of backup copies to keep for each kind of backup
    backup_copies: u32,

    /// Path to the SQLite store (optional, relative to config.json or absolute)
    /// Defaults to $MYFINANCE_HOME/myfinance.sqlite if not specified
    #[serde(skip_serializing_if = "Option::is_none")]
    store_path: Option<PathBuf>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            backup_copies: BACKUP_COPIES,
            store_path: None,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from the specified path and checks that it belongs to this app.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = utils::read(path)
            .await
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;

        let config: ConfigFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        anyhow::ensure!(
            config.config_version <= CONFIG_VERSION,
            "Unsupported config_version {} in config file, expected {} or lower",
            config.config_version,
            CONFIG_VERSION
        );

        Ok(config)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }

    /// If the path is relative, it should be interpreted as relative to the config.json file.
    pub fn store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(MYFINANCE_SQLITE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Draft, Kind};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_create() {
        let dir = TempDir::new().unwrap();
        let home_dir = dir.path().join("myfinance_home");

        let config = Config::create(&home_dir).await.unwrap();

        assert!(config.backups().is_dir());
        assert!(config.config_path().is_file());
        assert!(config.store_path().is_file());
        assert_eq!(config.store_path(), config.root().join(MYFINANCE_SQLITE));
        assert_eq!(config.backup_copies(), BACKUP_COPIES);
    }

    #[tokio::test]
    async fn test_config_create_twice() {
        let dir = TempDir::new().unwrap();
        Config::create(dir.path()).await.unwrap();
        let err = Config::create(dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_config_load_keeps_ledger() {
        let dir = TempDir::new().unwrap();
        let config = Config::create(dir.path()).await.unwrap();
        let ledger = config.ledger();
        ledger
            .add_transaction(&Draft::new("50", "Salário", "", Kind::Income))
            .await
            .unwrap();
        drop(ledger);
        drop(config);

        let config = Config::load(dir.path()).await.unwrap();
        let ledger = config.ledger();
        ledger.load().await;
        assert_eq!(ledger.transactions().await.len(), 1);
        assert_eq!(ledger.totals().await.balance.to_string(), "R$ 50,00");
    }

    #[tokio::test]
    async fn test_config_load_missing_home() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(dir.path().join("nope")).await.unwrap_err();
        assert!(err.to_string().contains("myfinance init"));
    }

    #[tokio::test]
    async fn test_config_load_missing_backups() {
        let dir = TempDir::new().unwrap();
        let config = Config::create(dir.path()).await.unwrap();
        std::fs::remove_dir(config.backups()).unwrap();
        let err = Config::load(dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("backups directory is missing"));
    }

    #[tokio::test]
    async fn test_config_store_path_is_configurable() {
        let dir = TempDir::new().unwrap();
        let config = Config::create(dir.path()).await.unwrap();
        let elsewhere = TempDir::new().unwrap();
        let store_path = elsewhere.path().join("other.sqlite");
        SqliteStore::init(&store_path).await.unwrap();

        let config_file = ConfigFile {
            store_path: Some(store_path.clone()),
            ..ConfigFile::default()
        };
        config_file.save(config.config_path()).await.unwrap();

        let config = Config::load(dir.path()).await.unwrap();
        assert_eq!(config.store_path(), store_path.as_path());
    }

    #[test]
    fn test_config_file_default() {
        let config = ConfigFile::default();
        assert_eq!(config.app_name, "myfinance");
        assert_eq!(config.backup_copies, 5);
        assert_eq!(config.store_path(), PathBuf::from(MYFINANCE_SQLITE));
    }

    #[test]
    fn test_config_file_serialization_omits_none_fields() {
        let json = serde_json::to_string(&ConfigFile::default()).unwrap();
        assert!(!json.contains("store_path"));
    }

    #[tokio::test]
    async fn test_config_file_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let original = ConfigFile {
            backup_copies: 9,
            store_path: Some(PathBuf::from("data/ledger.sqlite")),
            ..ConfigFile::default()
        };
        original.save(&config_path).await.unwrap();
        assert_eq!(ConfigFile::load(&config_path).await.unwrap(), original);
    }

    #[tokio::test]
    async fn test_config_file_load_invalid_app_name() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{
            "app_name": "wrong_app",
            "config_version": 1,
            "backup_copies": 5
        }"#;
        utils::write(&config_path, json).await.unwrap();

        let result = ConfigFile::load(&config_path).await;
        assert!(result.unwrap_err().to_string().contains("Invalid app_name"));
    }

    #[tokio::test]
    async fn test_config_file_load_newer_version() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{"app_name":"myfinance","config_version":2,"backup_copies":5}"#;
        utils::write(&config_path, json).await.unwrap();
        assert!(ConfigFile::load(&config_path).await.is_err());
    }
}
