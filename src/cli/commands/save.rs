//! Save command implementation.

use crate::cli::{Runtime, SaveArgs};
use crate::config::SaveSettings;
use crate::error::{Result, TrackerError};
use crate::model::issue::coerce_int;
use crate::model::{ActingContext, IssueRecord, json_type_name};
use crate::storage::{IssueRecordStore, SqliteStorage};
use serde_json::Value;

/// Execute the save command.
///
/// # Errors
///
/// Returns an error if the object cannot be parsed, bound, validated or stored.
pub fn execute(args: &SaveArgs, runtime: &Runtime) -> Result<()> {
    let value: Value = serde_json::from_str(&args.object)?;
    let (record, _) = save_object(&runtime.storage, &value, &runtime.context, runtime.settings)?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

/// Run one full save for an attribute object. An object carrying the id of
/// a stored issue updates it; otherwise a new issue is created.
///
/// Returns the saved record and whether it was created.
///
/// # Errors
///
/// Returns `IssueNotFound` for an unknown id, or any bind, check or store error.
pub fn save_object(
    storage: &SqliteStorage,
    value: &Value,
    ctx: &ActingContext,
    settings: SaveSettings,
) -> Result<(IssueRecord, bool)> {
    let Value::Object(map) = value else {
        return Err(TrackerError::InvalidArgument(format!(
            "expected an issue object, got {}",
            json_type_name(value)
        )));
    };

    let id = match map.get("id") {
        Some(raw) => coerce_int("id", raw)?,
        None => 0,
    };

    let mut store = IssueRecordStore::new(storage);
    if id > 0 {
        store.load(id)?;
    }

    store.bind(value, &[])?;
    store.check()?;
    if settings.transactional {
        store.store_atomic(settings.update_nulls, ctx)?;
    } else {
        store.store(settings.update_nulls, ctx)?;
    }

    Ok((store.into_record(), id <= 0))
}
