//! Schema migrations for the SQLite store.
//!
//! `migration_NN.sql` takes the schema from version `NN-1` to version `NN`. The version the file is
//! at is the single row of the `schema_version` table. There is no way back down: a file at a
//! version newer than this program knows about is refused.

use anyhow::{ensure, Context};
use sqlx::{Executor, SqlitePool};
use tracing::debug;

use crate::Result;

const MIGRATIONS: &[&str] = &[include_str!("migration_01.sql")];

/// The schema version this build of the program expects.
pub(crate) const CURRENT_VERSION: i32 = MIGRATIONS.len() as i32;

/// Runs every migration the database has not seen yet, each in its own transaction together with
/// the version bump. Returns the version the database was at before.
pub(crate) async fn upgrade(pool: &SqlitePool) -> Result<i32> {
    let found = version(pool).await?;
    ensure!(
        found <= CURRENT_VERSION,
        "The schema version is {found}, which is newer than this program understands \
        ({CURRENT_VERSION})"
    );
    let done = usize::try_from(found).context("The schema version is negative")?;

    for (ix, sql) in MIGRATIONS.iter().enumerate().skip(done) {
        let to = ix as i32 + 1;
        let mut tx = pool
            .begin()
            .await
            .context("Failed to begin migration transaction")?;
        tx.execute(*sql)
            .await
            .with_context(|| format!("Migration {to:02} failed"))?;
        sqlx::query("UPDATE schema_version SET version = ?")
            .bind(to)
            .execute(&mut *tx)
            .await
            .context("Failed to update schema_version")?;
        tx.commit()
            .await
            .context("Failed to commit migration transaction")?;
        debug!("Migrated the store to schema version {to}");
    }
    Ok(found)
}

/// Reads the schema version, creating the table at version 0 if this is a new database.
async fn version(pool: &SqlitePool) -> Result<i32> {
    sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
        .execute(pool)
        .await
        .context("Failed to create schema_version table")?;

    let row: Option<(i32,)> = sqlx::query_as("SELECT version FROM schema_version")
        .fetch_optional(pool)
        .await
        .context("Failed to query schema version")?;
    if let Some((version,)) = row {
        return Ok(version);
    }
    sqlx::query("INSERT INTO schema_version (version) VALUES (0)")
        .execute(pool)
        .await
        .context("Failed to insert initial schema version")?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;
    use tempfile::TempDir;

    async fn create_test_db() -> Result<(TempDir, SqlitePool)> {
        let temp_dir = TempDir::new().context("Failed to create temp dir")?;
        let db_path = temp_dir.path().join("test.sqlite");

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))
            .context("Failed to parse SQLite connection string")?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to create SQLite database")?;
        Ok((temp_dir, pool))
    }

    async fn table_exists(pool: &SqlitePool, table_name: &str) -> bool {
        let row: (i32,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?")
                .bind(table_name)
                .fetch_one(pool)
                .await
                .unwrap();
        row.0 > 0
    }

    #[tokio::test]
    async fn test_upgrade_new_database() {
        let (_temp_dir, pool) = create_test_db().await.unwrap();
        assert_eq!(upgrade(&pool).await.unwrap(), 0);
        assert_eq!(version(&pool).await.unwrap(), CURRENT_VERSION);
        assert!(table_exists(&pool, "kv").await);
    }

    #[tokio::test]
    async fn test_upgrade_is_idempotent() {
        let (_temp_dir, pool) = create_test_db().await.unwrap();
        upgrade(&pool).await.unwrap();
        sqlx::query("INSERT INTO kv (key, value) VALUES ('a', '1')")
            .execute(&pool)
            .await
            .unwrap();
        assert_eq!(upgrade(&pool).await.unwrap(), CURRENT_VERSION);
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM schema_version")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row.0, 1);
        let row: (String,) = sqlx::query_as("SELECT value FROM kv WHERE key = 'a'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row.0, "1");
    }

    #[tokio::test]
    async fn test_newer_version_is_refused() {
        let (_temp_dir, pool) = create_test_db().await.unwrap();
        upgrade(&pool).await.unwrap();
        sqlx::query("UPDATE schema_version SET version = ?")
            .bind(CURRENT_VERSION + 1)
            .execute(&pool)
            .await
            .unwrap();
        let err = upgrade(&pool).await.unwrap_err();
        assert!(err.to_string().contains("newer than this program"), "{err}");
    }
}
