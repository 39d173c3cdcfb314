//! Activity command implementation.

use crate::cli::Runtime;
use crate::error::Result;

/// Print the activity rows of one issue, oldest first.
///
/// # Errors
///
/// Returns `IssueNotFound` if the issue does not exist, or a database error.
pub fn execute(id: i64, runtime: &Runtime) -> Result<()> {
    runtime.storage.require_issue(id)?;
    let events = runtime.storage.get_activities(id)?;
    println!("{}", serde_json::to_string_pretty(&events)?);
    Ok(())
}
