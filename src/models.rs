// Data models for StreakStore

use chrono::NaiveDate;
use rusqlite::Row;
use rusqlite::types::Type;
use serde::{Deserialize, Serialize};

/// Date format used for `last_updated` on disk. ISO dates compare correctly as text.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Columns selected by every streak query, in `Streak::from_row` order
pub(crate) const STREAK_COLUMNS: &str = "id, name, count, last_updated, alive, sort_order, starred";

/// A tracked habit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub id: i64,
    pub name: String,
    /// Consecutive days continued
    pub count: u32,
    /// Day of the last continue; `None` if never continued or cancelled
    pub last_updated: Option<NaiveDate>,
    pub alive: bool,
    /// Manual display order
    pub order: i64,
    pub starred: bool,
}

impl Streak {
    /// Build a streak from a row selected with `STREAK_COLUMNS`.
    ///
    /// `last_updated` must be empty or an ISO date; anything else is a
    /// conversion error rather than a silently empty date.
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let raw_day: String = row.get(3)?;
        let last_updated =
            parse_day(&raw_day).map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

        // Rows edited by hand can hold a negative count; the type says otherwise
        let count: i64 = row.get(2)?;

        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            count: u32::try_from(count.max(0)).unwrap_or(u32::MAX),
            last_updated,
            alive: row.get(4)?,
            order: row.get(5)?,
            starred: row.get(6)?,
        })
    }

    /// Whether this streak was continued on `today`
    pub fn is_done_on(&self, today: NaiveDate) -> bool {
        self.last_updated == Some(today)
    }

    /// Per-day view used to decide between continue and cancel affordances
    pub fn state(&self, today: NaiveDate) -> StreakState {
        if !self.alive {
            StreakState::Dead
        } else if self.is_done_on(today) {
            StreakState::DoneToday
        } else if self.last_updated.is_none() {
            StreakState::NeverStarted
        } else {
            StreakState::Pending
        }
    }
}

/// Display state of a streak relative to a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakState {
    /// Created but never continued (or its only continue was cancelled)
    NeverStarted,
    /// Continued on an earlier day, still alive
    Pending,
    /// Already continued today
    DoneToday,
    /// Lapsed; terminal
    Dead,
}

impl StreakState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreakState::NeverStarted => "never_started",
            StreakState::Pending => "pending",
            StreakState::DoneToday => "done_today",
            StreakState::Dead => "dead",
        }
    }
}

/// Result of `StreakStore::continue_streak`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinueOutcome {
    /// Advanced by one day; carries the new count
    Continued { count: u32 },
    /// Already continued today; nothing changed
    AlreadyDoneToday,
    /// The streak has lapsed and can no longer be continued
    Dead,
    NotFound,
}

/// Result of `StreakStore::cancel_today`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Today's continue was undone; carries the new count
    Cancelled { count: u32 },
    /// Not continued today, dead, or missing
    Unchanged,
}

/// Format a day the way it is stored
pub fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

/// Parse a stored day; the empty string means "no day"
pub fn parse_day(raw: &str) -> Result<Option<NaiveDate>, chrono::ParseError> {
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, DAY_FORMAT).map(Some)
}
