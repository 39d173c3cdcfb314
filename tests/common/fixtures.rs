use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde_json::{Value, json};
use tracker_store::model::{ActingContext, IssueRecord};
use tracker_store::storage::{IssueRecordStore, SqliteStorage};
use tracker_store::util::time::{FixedClock, parse_datetime};

pub fn opened_at() -> NaiveDateTime {
    parse_datetime("2013-03-03 03:03:03").unwrap()
}

pub fn saved_at() -> NaiveDateTime {
    parse_datetime("2013-04-04 04:04:04").unwrap()
}

pub fn clock() -> FixedClock {
    FixedClock(opened_at())
}

pub fn later_clock() -> FixedClock {
    FixedClock(saved_at())
}

pub fn alice() -> ActingContext {
    ActingContext::interactive(7, "alice")
}

/// Field payload with only selects set.
pub fn selects(entries: &[(i64, i64)]) -> Value {
    let selects: serde_json::Map<String, Value> = entries
        .iter()
        .map(|(field, value)| (field.to_string(), json!(value)))
        .collect();
    json!({"selects": selects, "textfields": {}, "checkboxes": {}})
}

/// Store a new issue in batch mode (no open event) and return it.
pub fn seed_issue(storage: &SqliteStorage, title: &str, description: &str) -> IssueRecord {
    let clock = clock();
    let mut store = IssueRecordStore::new(storage).clock(&clock);
    store
        .bind(
            &json!({"project_id": 2, "title": title, "description": description, "priority": 3}),
            &[],
        )
        .unwrap();
    store.store(false, &ActingContext::batch("seed")).unwrap();
    store.into_record()
}

pub fn field_rows(conn: &Connection, issue_id: i64, field_id: i64) -> Vec<(i64, String)> {
    let mut stmt = conn
        .prepare(
            "SELECT rowid, value FROM tracker_fields_values
             WHERE issue_id = ? AND field_id = ? ORDER BY rowid",
        )
        .unwrap();
    stmt.query_map([issue_id, field_id], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

/// Make inserts of `field_id` into the field value table fail.
pub fn reject_field_inserts(conn: &Connection, field_id: i64) {
    conn.execute_batch(&format!(
        "CREATE TRIGGER reject_field_{field_id} BEFORE INSERT ON tracker_fields_values
         WHEN NEW.field_id = {field_id}
         BEGIN SELECT RAISE(ABORT, 'field {field_id} rejected'); END;"
    ))
    .unwrap();
}
