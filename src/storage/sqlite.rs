//! `SQLite` storage implementation.
//!
//! `SqliteStorage` owns the connection. The statement helpers are free
//! functions over `&Connection` so the save protocol can run them either
//! directly or inside a transaction.

use crate::error::{Result, TrackerError};
use crate::model::{ActivityEvent, ActivityKind, CustomFieldValue, IssueRecord};
use crate::storage::schema::apply_schema;
use crate::storage::table::{load_row, max_key};
use crate::util::time::{format_datetime, parse_datetime};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open a new connection to the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema application fails.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Raw connection, for statement helpers and tests.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside an immediate transaction.
    ///
    /// # Errors
    ///
    /// Returns the error from `f` (after rolling back) or from commit.
    pub fn with_transaction<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    /// Load an issue by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_issue(&self, id: i64) -> Result<Option<IssueRecord>> {
        load_row(&self.conn, id)
    }

    /// Load an issue by id, failing when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` or a database error.
    pub fn require_issue(&self, id: i64) -> Result<IssueRecord> {
        self.get_issue(id)?.ok_or(TrackerError::IssueNotFound { id })
    }

    /// Count total issues in the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn count_issues(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT count(*) FROM issues", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Highest issue id, or 0 for an empty table.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn max_issue_id(&self) -> Result<i64> {
        max_key::<IssueRecord>(&self.conn)
    }

    /// Activity rows for an issue, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_activities(&self, issue_id: i64) -> Result<Vec<ActivityEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT activities_id, issue_id, user, event, text, created_date, project_id
             FROM activities
             WHERE issue_id = ?
             ORDER BY activities_id ASC",
        )?;

        let events = stmt
            .query_map([issue_id], |row| {
                let event: String = row.get(3)?;
                let created: String = row.get(5)?;
                Ok(ActivityEvent {
                    activities_id: row.get(0)?,
                    issue_id: row.get(1)?,
                    user: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    event: event.parse().unwrap_or(ActivityKind::Change),
                    text: row.get(4)?,
                    created_date: parse_datetime(&created).unwrap_or_default(),
                    project_id: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(events)
    }

    /// Custom field rows for an issue, ordered by field id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_field_values(&self, issue_id: i64) -> Result<Vec<CustomFieldValue>> {
        let mut stmt = self.conn.prepare(
            "SELECT issue_id, field_id, value FROM tracker_fields_values
             WHERE issue_id = ?
             ORDER BY field_id ASC, rowid ASC",
        )?;
        let values = stmt
            .query_map([issue_id], |row| {
                Ok(CustomFieldValue {
                    issue_id: row.get(0)?,
                    field_id: row.get(1)?,
                    value: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(values)
    }
}

/// Append one activity row and return its id.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_activity(conn: &Connection, event: &ActivityEvent) -> Result<i64> {
    conn.execute(
        "INSERT INTO activities (issue_id, user, event, text, created_date, project_id)
         VALUES (?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            event.issue_id,
            event.user,
            event.event.as_str(),
            event.text,
            format_datetime(&event.created_date),
            event.project_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Field ids that already have a value row for `issue_id`.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn field_ids_for_issue(conn: &Connection, issue_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT field_id FROM tracker_fields_values WHERE issue_id = ?")?;
    let ids = stmt
        .query_map([issue_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<i64>, _>>()?;
    Ok(ids)
}

/// Insert a custom field value row.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_field_value(conn: &Connection, issue_id: i64, field_id: i64, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO tracker_fields_values (issue_id, field_id, value) VALUES (?, ?, ?)",
        rusqlite::params![issue_id, field_id, value],
    )?;
    Ok(())
}

/// Overwrite the value of an existing custom field row.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn update_field_value(
    conn: &Connection,
    issue_id: i64,
    field_id: i64,
    value: &str,
) -> Result<usize> {
    let rows = conn.execute(
        "UPDATE tracker_fields_values SET value = ? WHERE issue_id = ? AND field_id = ?",
        rusqlite::params![value, issue_id, field_id],
    )?;
    Ok(rows)
}
