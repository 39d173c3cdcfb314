//! Data types: issue records, audit events, custom fields, acting context.

pub mod activity;
pub mod change;
pub mod custom_field;
pub mod identity;
pub mod issue;

pub use activity::{ActivityEvent, ActivityKind};
pub use change::{FieldChange, UNTRACKED_ATTRIBUTES, diff_attributes, diff_records};
pub use custom_field::{CustomFieldValue, CustomFields, CustomValue, FIELD_GROUPS, clean_fields};
pub use identity::{ActingContext, ExecutionMode};
pub use issue::{AttributeValue, ISSUE_ATTRIBUTES, IssueRecord, json_type_name};
