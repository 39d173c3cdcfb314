//! Fields command implementation.

use crate::cli::Runtime;
use crate::error::Result;

/// Print the custom field rows of one issue.
///
/// # Errors
///
/// Returns `IssueNotFound` if the issue does not exist, or a database error.
pub fn execute(id: i64, runtime: &Runtime) -> Result<()> {
    runtime.storage.require_issue(id)?;
    let values = runtime.storage.get_field_values(id)?;
    println!("{}", serde_json::to_string_pretty(&values)?);
    Ok(())
}
