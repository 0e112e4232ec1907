// Streak store backed by a single SQLite table

use crate::error::validate_name;
use crate::migrations;
use crate::models::{CancelOutcome, ContinueOutcome, STREAK_COLUMNS, Streak, format_day};
use chrono::NaiveDate;
use eyre::{Context, Result};
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension, params};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Database file inside the store directory
pub const DB_FILE: &str = "streaks.db";

/// Advisory lock file held while writing
pub const LOCK_FILE: &str = "streaks.lock";

/// Persistent store of streaks.
///
/// Mutating operations take `&mut self`, so a single store handle applies
/// them one at a time. Separate processes sharing a directory are serialized
/// by an exclusive lock on `streaks.lock`. Reads see the last committed state.
pub struct StreakStore {
    base_path: Option<PathBuf>,
    db: Connection,
}

impl StreakStore {
    /// Open or create a store in the given directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();

        // Create directory if it doesn't exist
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;

        let db_path = base_path.join(DB_FILE);
        let db = Connection::open(&db_path).context("Failed to open SQLite database")?;

        // WAL lets readers proceed against the last commit while a write is in flight
        let journal_mode: String = db
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .context("Failed to enable WAL journaling")?;
        debug!(journal_mode = %journal_mode, "Configured journal mode");

        let mut store = Self {
            base_path: Some(base_path),
            db,
        };

        {
            let _lock = store.write_lock()?;
            migrations::migrate(&mut store.db)?;
        }

        info!(path = ?db_path, "Opened streak store");
        Ok(store)
    }

    /// Open a store that lives only in memory
    pub fn open_in_memory() -> Result<Self> {
        let mut db = Connection::open_in_memory().context("Failed to open in-memory database")?;
        migrations::migrate(&mut db)?;

        Ok(Self { base_path: None, db })
    }

    /// Open the store and run the expiry sweep once for `today`.
    ///
    /// Returns the store and how many streaks the sweep killed.
    pub fn init<P: AsRef<Path>>(path: P, today: NaiveDate) -> Result<(Self, usize)> {
        let mut store = Self::open(path)?;
        let expired = store.expire_sweep(today)?;
        if expired > 0 {
            info!(expired, today = %today, "Expired lapsed streaks");
        }
        Ok((store, expired))
    }

    /// Directory holding the database, if on disk
    pub fn base_path(&self) -> Option<&Path> {
        self.base_path.as_deref()
    }

    /// Get a reference to the SQLite database connection
    pub fn db(&self) -> &Connection {
        &self.db
    }

    // ========================================================================
    // Lifecycle operations
    // ========================================================================

    /// Create a streak at the end of the manual order and return its id
    pub fn create(&mut self, name: &str) -> Result<i64> {
        let name = validate_name(name)?;
        let _lock = self.write_lock()?;

        let tx = self.db.transaction()?;

        // Read and insert in one transaction so the next order is not raced
        let next_order: i64 = tx.query_row(
            "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM streaks",
            [],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO streaks (name, count, last_updated, alive, sort_order, starred)
             VALUES (?1, 0, '', 1, ?2, 0)",
            params![name, next_order],
        )
        .context("Failed to insert streak")?;
        let id = tx.last_insert_rowid();

        tx.commit()?;

        debug!(id, name = %name, order = next_order, "create: inserted streak");
        Ok(id)
    }

    /// Get a streak by id
    pub fn get(&self, id: i64) -> Result<Option<Streak>> {
        let streak = self
            .db
            .query_row(
                &format!("SELECT {} FROM streaks WHERE id = ?1", STREAK_COLUMNS),
                [id],
                Streak::from_row,
            )
            .optional()
            .context("Failed to read streak")?;

        Ok(streak)
    }

    /// Advance a streak by one day
    pub fn continue_streak(&mut self, id: i64, today: NaiveDate) -> Result<ContinueOutcome> {
        let _lock = self.write_lock()?;

        let Some(streak) = self.get(id)? else {
            debug!(id, "continue: no such streak");
            return Ok(ContinueOutcome::NotFound);
        };

        if streak.is_done_on(today) {
            debug!(id, today = %today, "continue: already continued today");
            return Ok(ContinueOutcome::AlreadyDoneToday);
        }

        if !streak.alive {
            warn!(id, "continue: streak is dead");
            return Ok(ContinueOutcome::Dead);
        }

        let count = streak.count.saturating_add(1);
        self.db
            .execute(
                "UPDATE streaks SET count = ?1, last_updated = ?2 WHERE id = ?3",
                params![count, format_day(today), id],
            )
            .context("Failed to continue streak")?;

        debug!(id, count, today = %today, "continue: advanced");
        Ok(ContinueOutcome::Continued { count })
    }

    /// Undo a continue made today
    pub fn cancel_today(&mut self, id: i64, today: NaiveDate) -> Result<CancelOutcome> {
        let _lock = self.write_lock()?;

        let Some(streak) = self.get(id)? else {
            debug!(id, "cancel: no such streak");
            return Ok(CancelOutcome::Unchanged);
        };

        if !streak.alive || !streak.is_done_on(today) {
            debug!(id, alive = streak.alive, "cancel: not continued today");
            return Ok(CancelOutcome::Unchanged);
        }

        // Clamp: a hand-edited row may already be at zero
        let count = streak.count.saturating_sub(1);
        self.db
            .execute(
                "UPDATE streaks SET count = ?1, last_updated = '' WHERE id = ?2",
                params![count, id],
            )
            .context("Failed to cancel streak")?;

        debug!(id, count, "cancel: undone");
        Ok(CancelOutcome::Cancelled { count })
    }

    /// Rename a streak. Returns false if it does not exist.
    pub fn rename(&mut self, id: i64, new_name: &str) -> Result<bool> {
        let name = validate_name(new_name)?;
        let _lock = self.write_lock()?;

        let changed = self
            .db
            .execute("UPDATE streaks SET name = ?1 WHERE id = ?2", params![name, id])
            .context("Failed to rename streak")?;

        debug!(id, name = %name, changed, "rename");
        Ok(changed > 0)
    }

    /// Delete a streak. Returns false if it did not exist.
    pub fn delete(&mut self, id: i64) -> Result<bool> {
        let _lock = self.write_lock()?;

        let changed = self
            .db
            .execute("DELETE FROM streaks WHERE id = ?1", [id])
            .context("Failed to delete streak")?;

        debug!(id, changed, "delete");
        Ok(changed > 0)
    }

    /// Assign `order = index` to each id, in one transaction.
    ///
    /// Unknown ids are skipped; streaks not listed keep their order.
    /// Returns how many streaks were renumbered.
    pub fn reorder(&mut self, ordered_ids: &[i64]) -> Result<usize> {
        let _lock = self.write_lock()?;

        let tx = self.db.transaction()?;
        let mut changed = 0;
        {
            let mut stmt = tx.prepare("UPDATE streaks SET sort_order = ?1 WHERE id = ?2")?;
            for (index, id) in ordered_ids.iter().enumerate() {
                changed += stmt.execute(params![index as i64, id])?;
            }
        }
        tx.commit().context("Failed to commit reorder")?;

        debug!(requested = ordered_ids.len(), changed, "reorder");
        Ok(changed)
    }

    /// Flip the starred flag. Returns the new value, or None if missing.
    pub fn toggle_star(&mut self, id: i64) -> Result<Option<bool>> {
        let _lock = self.write_lock()?;

        let tx = self.db.transaction()?;
        let changed = tx
            .execute("UPDATE streaks SET starred = NOT starred WHERE id = ?1", [id])
            .context("Failed to toggle star")?;
        let starred: Option<bool> = if changed > 0 {
            Some(tx.query_row("SELECT starred FROM streaks WHERE id = ?1", [id], |row| row.get(0))?)
        } else {
            None
        };
        tx.commit()?;

        debug!(id, ?starred, "toggle_star");
        Ok(starred)
    }

    /// All streaks in display order: starred first, then manual order, then newest first
    pub fn list_all(&self) -> Result<Vec<Streak>> {
        let mut stmt = self.db.prepare(&format!(
            "SELECT {} FROM streaks ORDER BY starred DESC, sort_order ASC, id DESC",
            STREAK_COLUMNS
        ))?;

        let rows = stmt.query_map([], Streak::from_row)?;

        let mut results = Vec::new();
        for row_result in rows {
            results.push(row_result.context("Failed to read streak row")?);
        }
        Ok(results)
    }

    /// Mark every streak last continued before `today` as dead.
    ///
    /// Never-continued streaks are left alone. Safe to run repeatedly.
    /// Returns how many streaks died.
    pub fn expire_sweep(&mut self, today: NaiveDate) -> Result<usize> {
        let _lock = self.write_lock()?;

        let expired = self
            .db
            .execute(
                "UPDATE streaks SET alive = 0
                 WHERE last_updated != '' AND last_updated < ?1 AND alive = 1",
                [format_day(today)],
            )
            .context("Failed to run expiry sweep")?;

        debug!(today = %today, expired, "expire_sweep");
        Ok(expired)
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    /// Hold an exclusive lock on the store directory until the guard drops.
    /// In-memory stores have nothing to share and skip the lock.
    fn write_lock(&self) -> Result<Option<File>> {
        let Some(base_path) = &self.base_path else {
            return Ok(None);
        };

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(base_path.join(LOCK_FILE))
            .context("Failed to open lock file")?;

        file.lock_exclusive().context("Failed to acquire store lock")?;

        // Lock is released when the file is dropped
        Ok(Some(file))
    }
}
