//! Schema migrations for the SQLite store.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Apply any pending migrations. Idempotent.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    for version in (current + 1)..=CURRENT_VERSION {
        tracing::debug!("applying schema migration v{}", version);
        let tx = conn.transaction()?;
        apply_migration(&tx, version)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            rusqlite::params![version, now_millis()],
        )?;
        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown schema version {}",
            version
        ))),
    }
}

fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE records (
            owner BLOB NOT NULL,            -- 32-byte principal key
            idx INTEGER NOT NULL,           -- dense per-owner index, 0-based
            item TEXT NOT NULL,             -- plaintext label, 1 to 64 bytes
            user_id_handle BLOB NOT NULL,   -- 32-byte ciphertext handle
            quantity_handle BLOB NOT NULL,  -- 32-byte ciphertext handle
            amount_handle BLOB NOT NULL,    -- 32-byte ciphertext handle
            timestamp INTEGER NOT NULL,     -- store-assigned, unix millis
            PRIMARY KEY (owner, idx)
        );
        "#,
    )?;
    Ok(())
}

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
