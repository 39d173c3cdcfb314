//! Import command implementation.
//!
//! Each non-blank line of the input is one attribute object, saved in batch
//! mode. Lines that fail to parse, bind, validate or resolve are skipped;
//! storage errors abort the import.

use crate::cli::commands::save::save_object;
use crate::cli::{ImportArgs, Runtime};
use crate::config::SaveSettings;
use crate::error::{ErrorCode, Result};
use crate::model::{ActingContext, ExecutionMode};
use crate::storage::SqliteStorage;
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use tracing::{info, warn};

/// Counts reported at the end of an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Execute the import command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a storage error occurs.
pub fn execute(args: &ImportArgs, runtime: &Runtime) -> Result<()> {
    let file = File::open(&args.file)?;
    let summary = import_lines(
        &runtime.storage,
        BufReader::new(file),
        &runtime.context,
        runtime.settings,
    )?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Imported {} issues ({} created, {} updated, {} skipped)",
            summary.created + summary.updated,
            summary.created,
            summary.updated,
            summary.skipped
        );
    }
    Ok(())
}

/// Save every line of `reader` under a batch version of `ctx`.
///
/// # Errors
///
/// Returns an error on read failure or any storage error.
pub fn import_lines<R: BufRead>(
    storage: &SqliteStorage,
    reader: R,
    ctx: &ActingContext,
    settings: SaveSettings,
) -> Result<ImportSummary> {
    let ctx = ActingContext {
        mode: ExecutionMode::Batch,
        ..ctx.clone()
    };
    let mut summary = ImportSummary::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        let value: Value = match serde_json::from_str(&line) {
            Ok(value) => value,
            Err(err) => {
                warn!(line = line_no, error = %err, "Skipping unparsable line");
                summary.skipped += 1;
                continue;
            }
        };

        match save_object(storage, &value, &ctx, settings) {
            Ok((_, true)) => summary.created += 1,
            Ok((_, false)) => summary.updated += 1,
            Err(err) if is_skippable(err.code()) => {
                warn!(line = line_no, error = %err, "Skipping line");
                summary.skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }

    info!(
        created = summary.created,
        updated = summary.updated,
        skipped = summary.skipped,
        "Import finished"
    );
    Ok(summary)
}

const fn is_skippable(code: ErrorCode) -> bool {
    matches!(
        code,
        ErrorCode::Validation | ErrorCode::InvalidArgument | ErrorCode::NotFound
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ActivityKind;
    use std::io::Cursor;

    #[test]
    fn import_counts_and_skips() {
        let storage = SqliteStorage::open_memory().unwrap();
        let input = r#"{"title": "One", "description": "first"}
not json

{"title": "", "description": "missing title"}
{"id": 1, "priority": 2}
{"id": 99, "priority": 2}
"#;

        let summary = import_lines(
            &storage,
            Cursor::new(input),
            &ActingContext::interactive(3, "importer"),
            SaveSettings::default(),
        )
        .unwrap();

        assert_eq!(
            summary,
            ImportSummary {
                created: 1,
                updated: 1,
                skipped: 3,
            }
        );

        // Batch mode: no open event, only the change from the update.
        let events = storage.get_activities(1).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, ActivityKind::Change);
        assert_eq!(events[0].user, "importer");
    }
}
