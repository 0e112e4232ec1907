//! Schema migrations for the streak database.
//!
//! Migrations are an ordered list applied once when the store is opened. The
//! `schema_version` table records the last version applied. Each migration
//! runs in its own transaction and is written so that re-running it against
//! a database that already has its changes is harmless.

use eyre::{Context, Result, eyre};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

/// A single schema step
struct Migration {
    version: u32,
    description: &'static str,
    apply: fn(&Connection) -> rusqlite::Result<()>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create streaks table",
        apply: migrate_v1,
    },
    Migration {
        version: 2,
        description: "add manual sort order",
        apply: migrate_v2,
    },
    Migration {
        version: 3,
        description: "add starred flag",
        apply: migrate_v3,
    },
];

/// Schema version this build writes
pub const CURRENT_VERSION: u32 = 3;

/// Apply all pending migrations.
///
/// Returns how many migrations ran. Fails if the database was written by a
/// newer schema than this build knows, or if any migration fails.
pub fn migrate(conn: &mut Connection) -> Result<usize> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
    .context("Failed to create schema_version table")?;

    let current = schema_version(conn)?;
    if current > CURRENT_VERSION {
        return Err(eyre!(
            "Database schema version {} is newer than supported version {}",
            current,
            CURRENT_VERSION
        ));
    }

    let mut applied = 0;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        debug!(version = migration.version, description = migration.description, "Applying migration");

        let tx = conn.transaction()?;
        (migration.apply)(&tx)
            .with_context(|| format!("Migration v{} ({}) failed", migration.version, migration.description))?;
        set_schema_version(&tx, migration.version)?;
        tx.commit()
            .with_context(|| format!("Failed to commit migration v{}", migration.version))?;

        applied += 1;
    }

    if applied > 0 {
        info!(from = current, to = CURRENT_VERSION, applied, "Migrated database schema");
    }

    Ok(applied)
}

/// Current schema version; 0 for a fresh database
pub fn schema_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get::<_, Option<u32>>(0))
        .optional()
        .context("Failed to read schema version")?
        .flatten();

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: u32) -> Result<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
        [table, column],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Add a column unless it already exists. Returns true if it was added.
fn add_column(conn: &Connection, table: &str, column: &str, decl: &str) -> rusqlite::Result<bool> {
    if has_column(conn, table, column)? {
        return Ok(false);
    }
    conn.execute_batch(&format!("ALTER TABLE {} ADD COLUMN {} {};", table, column, decl))?;
    Ok(true)
}

/// v1: the streaks table
fn migrate_v1(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS streaks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            count INTEGER NOT NULL DEFAULT 0,
            last_updated TEXT NOT NULL DEFAULT '',
            alive INTEGER NOT NULL DEFAULT 1
        );",
    )
}

/// v2: manual ordering. Existing rows keep their creation order.
fn migrate_v2(conn: &Connection) -> rusqlite::Result<()> {
    if add_column(conn, "streaks", "sort_order", "INTEGER NOT NULL DEFAULT 0")? {
        conn.execute("UPDATE streaks SET sort_order = id", [])?;
    }
    Ok(())
}

/// v3: starring, plus an index matching the display order
fn migrate_v3(conn: &Connection) -> rusqlite::Result<()> {
    add_column(conn, "streaks", "starred", "INTEGER NOT NULL DEFAULT 0")?;
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_streaks_display ON streaks(starred DESC, sort_order ASC, id DESC);",
    )
}
