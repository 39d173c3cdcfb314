//! Database schema definitions and migration logic.

use rusqlite::{Connection, Result};

pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Issue table name.
pub const ISSUES_TABLE: &str = "issues";
/// Issue table primary key.
pub const ISSUES_KEY: &str = "id";
/// Append-only audit table.
pub const ACTIVITIES_TABLE: &str = "activities";
/// Custom field value side table.
pub const FIELD_VALUES_TABLE: &str = "tracker_fields_values";

/// The complete SQL schema for the tracker database.
pub const SCHEMA_SQL: &str = r"
    -- Issues table
    CREATE TABLE IF NOT EXISTS issues (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        issue_number INTEGER NOT NULL DEFAULT 0,
        foreign_number INTEGER NOT NULL DEFAULT 0,
        project_id INTEGER NOT NULL DEFAULT 0,
        title TEXT NOT NULL DEFAULT '',
        description TEXT NOT NULL DEFAULT '',
        description_raw TEXT NOT NULL DEFAULT '',
        priority INTEGER NOT NULL DEFAULT 3,
        status INTEGER NOT NULL DEFAULT 1,
        opened_date DATETIME,
        opened_by TEXT NOT NULL DEFAULT '',
        closed_date DATETIME,
        closed_by TEXT NOT NULL DEFAULT '',
        closed_sha TEXT NOT NULL DEFAULT '',
        modified_date DATETIME,
        modified_by TEXT NOT NULL DEFAULT '',
        rel_id INTEGER NOT NULL DEFAULT 0,
        rel_type TEXT NOT NULL DEFAULT ''
    );
    CREATE INDEX IF NOT EXISTS idx_issues_project ON issues(project_id);
    CREATE INDEX IF NOT EXISTS idx_issues_number ON issues(project_id, issue_number);
    CREATE INDEX IF NOT EXISTS idx_issues_status ON issues(status);

    -- Activities (Audit)
    -- Append-only. project_id is only set on open events.
    CREATE TABLE IF NOT EXISTS activities (
        activities_id INTEGER PRIMARY KEY AUTOINCREMENT,
        issue_id INTEGER NOT NULL,
        user TEXT NOT NULL DEFAULT '',
        event TEXT NOT NULL,
        text TEXT,
        created_date DATETIME NOT NULL,
        project_id INTEGER
    );
    CREATE INDEX IF NOT EXISTS idx_activities_issue ON activities(issue_id);
    CREATE INDEX IF NOT EXISTS idx_activities_event ON activities(event);

    -- Custom field values
    -- (issue_id, field_id) is unique by convention only: the save protocol
    -- checks for an existing row before inserting.
    CREATE TABLE IF NOT EXISTS tracker_fields_values (
        issue_id INTEGER NOT NULL,
        field_id INTEGER NOT NULL,
        value TEXT NOT NULL DEFAULT ''
    );
    CREATE INDEX IF NOT EXISTS idx_fields_values_issue ON tracker_fields_values(issue_id, field_id);
";

/// Apply the schema to the database.
///
/// This uses `execute_batch` to run the entire DDL script.
/// It is idempotent because all statements use `IF NOT EXISTS`.
///
/// # Errors
///
/// Returns an error if the SQL execution fails or pragmas cannot be set.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    // Legacy tables must gain their missing columns before the batch runs,
    // since the batch creates indexes over them.
    ensure_columns(conn, ISSUES_TABLE, ISSUE_COLUMNS)?;
    ensure_columns(conn, ACTIVITIES_TABLE, ACTIVITY_COLUMNS)?;

    conn.execute_batch(SCHEMA_SQL)?;

    // Set journal mode to WAL for concurrency
    conn.pragma_update(None, "journal_mode", "WAL")?;
    // NORMAL synchronous is safe with WAL: committed data survives OS crash
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    conn.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)?;

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> bool {
    conn.prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name=?")
        .and_then(|mut stmt| stmt.exists([table]))
        .unwrap_or(false)
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
    // pragma_table_info() needs the table name inline; callers only pass
    // the table constants above.
    let sql = format!("SELECT 1 FROM pragma_table_info('{table}') WHERE name = ?");
    conn.prepare(&sql)
        .and_then(|mut stmt| stmt.exists([column]))
        .unwrap_or(false)
}

const ISSUE_COLUMNS: &[(&str, &str)] = &[
    ("issue_number", "INTEGER NOT NULL DEFAULT 0"),
    ("foreign_number", "INTEGER NOT NULL DEFAULT 0"),
    ("project_id", "INTEGER NOT NULL DEFAULT 0"),
    ("description_raw", "TEXT NOT NULL DEFAULT ''"),
    ("priority", "INTEGER NOT NULL DEFAULT 3"),
    ("status", "INTEGER NOT NULL DEFAULT 1"),
    ("opened_date", "DATETIME"),
    ("opened_by", "TEXT NOT NULL DEFAULT ''"),
    ("closed_date", "DATETIME"),
    ("closed_by", "TEXT NOT NULL DEFAULT ''"),
    ("closed_sha", "TEXT NOT NULL DEFAULT ''"),
    ("modified_date", "DATETIME"),
    ("modified_by", "TEXT NOT NULL DEFAULT ''"),
    ("rel_id", "INTEGER NOT NULL DEFAULT 0"),
    ("rel_type", "TEXT NOT NULL DEFAULT ''"),
];

const ACTIVITY_COLUMNS: &[(&str, &str)] = &[
    ("user", "TEXT NOT NULL DEFAULT ''"),
    ("text", "TEXT"),
    ("project_id", "INTEGER"),
];

fn ensure_columns(conn: &Connection, table: &str, columns: &[(&str, &str)]) -> Result<()> {
    if !table_exists(conn, table) {
        return Ok(());
    }

    for (name, definition) in columns {
        if !column_exists(conn, table, name) {
            let sql = format!("ALTER TABLE {table} ADD COLUMN {name} {definition}");
            conn.execute(&sql, [])?;
        }
    }

    Ok(())
}
