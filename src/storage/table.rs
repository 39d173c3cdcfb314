//! Generic row persistence keyed by a named integer primary key.
//!
//! This is the base layer the save protocol delegates to: it knows nothing
//! about audit events or custom fields, only how to load, insert and update
//! one row of one table.

use crate::error::Result;
use crate::model::{AttributeValue, ISSUE_ATTRIBUTES, IssueRecord};
use crate::storage::schema::{ISSUES_KEY, ISSUES_TABLE};
use crate::util::time::parse_datetime;
use rusqlite::{Connection, OptionalExtension, Row};
use std::fmt::Write as _;

/// A record that maps onto one row of a table.
pub trait TableRow: Sized {
    const TABLE: &'static str;
    const KEY: &'static str;
    /// Column names in the order `columns()` and `from_row` use.
    const COLUMNS: &'static [&'static str];

    fn key(&self) -> i64;
    fn set_key(&mut self, key: i64);
    fn columns(&self) -> Vec<(&'static str, AttributeValue)>;

    /// Build a record from a row selected with `COLUMNS`.
    ///
    /// # Errors
    ///
    /// Returns an error if a column cannot be read.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// Load a row by primary key.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn load_row<T: TableRow>(conn: &Connection, key: i64) -> Result<Option<T>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ?",
        T::COLUMNS.join(", "),
        T::TABLE,
        T::KEY
    );
    let row = conn.query_row(&sql, [key], |row| T::from_row(row)).optional()?;
    Ok(row)
}

/// Insert a row and assign its primary key.
///
/// Null columns are left out so the table defaults apply. A key below 1
/// is left to the database; a positive key is inserted as given.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_row<T: TableRow>(conn: &Connection, row: &mut T) -> Result<()> {
    let assign_key = row.key() < 1;
    let values: Vec<(&'static str, AttributeValue)> = row
        .columns()
        .into_iter()
        .filter(|(name, value)| {
            !(matches!(value, AttributeValue::Null) || (assign_key && *name == T::KEY))
        })
        .collect();

    let names: Vec<&str> = values.iter().map(|(name, _)| *name).collect();
    let placeholders = vec!["?"; values.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({placeholders})",
        T::TABLE,
        names.join(", ")
    );

    let params: Vec<&dyn rusqlite::ToSql> = values
        .iter()
        .map(|(_, value)| value as &dyn rusqlite::ToSql)
        .collect();
    conn.execute(&sql, params.as_slice())?;

    if assign_key {
        row.set_key(conn.last_insert_rowid());
    }
    Ok(())
}

/// Update a row by primary key.
///
/// With `update_nulls == false`, null columns are not written and keep
/// their stored value. Returns the number of rows affected.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn update_row<T: TableRow>(conn: &Connection, row: &T, update_nulls: bool) -> Result<usize> {
    let values: Vec<(&'static str, AttributeValue)> = row
        .columns()
        .into_iter()
        .filter(|(name, value)| {
            *name != T::KEY && (update_nulls || !matches!(value, AttributeValue::Null))
        })
        .collect();

    if values.is_empty() {
        return Ok(0);
    }

    let mut sql = format!("UPDATE {} SET ", T::TABLE);
    for (i, (name, _)) in values.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        let _ = write!(sql, "{name} = ?");
    }
    let _ = write!(sql, " WHERE {} = ?", T::KEY);

    let key = row.key();
    let mut params: Vec<&dyn rusqlite::ToSql> = values
        .iter()
        .map(|(_, value)| value as &dyn rusqlite::ToSql)
        .collect();
    params.push(&key);

    let affected = conn.execute(&sql, params.as_slice())?;
    Ok(affected)
}

/// Highest primary key currently in the table, or 0 when empty.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn max_key<T: TableRow>(conn: &Connection) -> Result<i64> {
    let sql = format!("SELECT MAX({}) FROM {}", T::KEY, T::TABLE);
    let max: Option<i64> = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(max.unwrap_or(0))
}

impl TableRow for IssueRecord {
    const TABLE: &'static str = ISSUES_TABLE;
    const KEY: &'static str = ISSUES_KEY;
    const COLUMNS: &'static [&'static str] = ISSUE_ATTRIBUTES;

    fn key(&self) -> i64 {
        self.id
    }

    fn set_key(&mut self, key: i64) {
        self.id = key;
    }

    fn columns(&self) -> Vec<(&'static str, AttributeValue)> {
        self.attributes()
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let text = |idx: usize| -> rusqlite::Result<String> {
            Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
        };
        let int = |idx: usize| -> rusqlite::Result<i64> {
            Ok(row.get::<_, Option<i64>>(idx)?.unwrap_or(0))
        };
        let date = |idx: usize| -> rusqlite::Result<_> {
            Ok(row
                .get::<_, Option<String>>(idx)?
                .as_deref()
                .and_then(parse_datetime))
        };

        Ok(Self {
            id: int(0)?,
            issue_number: int(1)?,
            foreign_number: int(2)?,
            project_id: int(3)?,
            title: text(4)?,
            description: text(5)?,
            description_raw: text(6)?,
            priority: int(7)?,
            status: int(8)?,
            opened_date: date(9)?,
            opened_by: text(10)?,
            closed_date: date(11)?,
            closed_by: text(12)?,
            closed_sha: text(13)?,
            modified_date: date(14)?,
            modified_by: text(15)?,
            rel_id: int(16)?,
            rel_type: text(17)?,
        })
    }
}
