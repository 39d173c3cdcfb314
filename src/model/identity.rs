use serde::{Deserialize, Serialize};

/// Whether a save runs on behalf of a person or as part of a batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Interactive,
    /// Imports and other administrative runs. Open events are not recorded.
    #[default]
    Batch,
}

/// Who is saving, passed explicitly into `store`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActingContext {
    pub user_id: i64,
    pub username: String,
    pub mode: ExecutionMode,
}

impl ActingContext {
    #[must_use]
    pub fn interactive(user_id: i64, username: &str) -> Self {
        Self {
            user_id,
            username: username.to_string(),
            mode: ExecutionMode::Interactive,
        }
    }

    /// No user: id 0, empty name, batch mode.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn batch(username: &str) -> Self {
        Self {
            user_id: 0,
            username: username.to_string(),
            mode: ExecutionMode::Batch,
        }
    }

    #[must_use]
    pub fn is_batch(&self) -> bool {
        self.mode == ExecutionMode::Batch
    }

    /// Value stamped into `modified_by`: the username, or the numeric id when
    /// no username is known.
    #[must_use]
    pub fn identity(&self) -> String {
        if self.username.is_empty() {
            self.user_id.to_string()
        } else {
            self.username.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_identity_is_zero() {
        let ctx = ActingContext::anonymous();
        assert!(ctx.is_batch());
        assert_eq!(ctx.identity(), "0");
    }

    #[test]
    fn interactive_identity_is_username() {
        let ctx = ActingContext::interactive(12, "alice");
        assert!(!ctx.is_batch());
        assert_eq!(ctx.identity(), "alice");
    }
}
