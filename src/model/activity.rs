use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of audit row written by a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    /// A new issue was created interactively.
    Open,
    /// One or more tracked attributes changed.
    Change,
}

impl ActivityKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Change => "change",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "change" => Ok(Self::Change),
            other => Err(format!("unknown activity event: {other}")),
        }
    }
}

/// One row of the append-only `activities` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub activities_id: i64,
    pub issue_id: i64,
    pub user: String,
    pub event: ActivityKind,
    /// JSON array of `FieldChange` for change events.
    pub text: Option<String>,
    pub created_date: NaiveDateTime,
    /// Set for open events only.
    pub project_id: Option<i64>,
}

impl ActivityEvent {
    #[must_use]
    pub fn open(issue_id: i64, user: &str, created_date: NaiveDateTime, project_id: i64) -> Self {
        Self {
            activities_id: 0,
            issue_id,
            user: user.to_string(),
            event: ActivityKind::Open,
            text: None,
            created_date,
            project_id: Some(project_id),
        }
    }

    #[must_use]
    pub fn change(issue_id: i64, user: &str, payload: String, created_date: NaiveDateTime) -> Self {
        Self {
            activities_id: 0,
            issue_id,
            user: user.to_string(),
            event: ActivityKind::Change,
            text: Some(payload),
            created_date,
            project_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [ActivityKind::Open, ActivityKind::Change] {
            assert_eq!(kind.as_str().parse::<ActivityKind>().unwrap(), kind);
        }
        assert!("close".parse::<ActivityKind>().is_err());
    }
}
