use crate::error::{Result, TrackerError};
use crate::util::time::{format_datetime, parse_datetime};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared attributes of an issue, in column order.
pub const ISSUE_ATTRIBUTES: &[&str] = &[
    "id",
    "issue_number",
    "foreign_number",
    "project_id",
    "title",
    "description",
    "description_raw",
    "priority",
    "status",
    "opened_date",
    "opened_by",
    "closed_date",
    "closed_by",
    "closed_sha",
    "modified_date",
    "modified_by",
    "rel_id",
    "rel_type",
];

/// One issue row. `id == 0` means the record has not been persisted yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueRecord {
    pub id: i64,
    /// The issue number shown to users.
    pub issue_number: i64,
    /// Number in the foreign (upstream) tracker.
    pub foreign_number: i64,
    pub project_id: i64,
    pub title: String,
    pub description: String,
    /// Unrendered markdown source of `description`.
    pub description_raw: String,
    pub priority: i64,
    pub status: i64,
    #[serde(with = "opt_datetime")]
    pub opened_date: Option<NaiveDateTime>,
    pub opened_by: String,
    #[serde(with = "opt_datetime")]
    pub closed_date: Option<NaiveDateTime>,
    pub closed_by: String,
    /// Commit SHA that closed the issue.
    pub closed_sha: String,
    #[serde(with = "opt_datetime")]
    pub modified_date: Option<NaiveDateTime>,
    pub modified_by: String,
    pub rel_id: i64,
    pub rel_type: String,
}

/// A scalar attribute value as seen by persistence and diffing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Int(i64),
    Text(String),
}

impl AttributeValue {
    /// Falsy values: null, zero, the empty string and `"0"`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Int(v) => *v == 0,
            Self::Text(s) => s.is_empty() || s == "0",
        }
    }

    fn from_date(value: Option<&NaiveDateTime>) -> Self {
        value.map_or(Self::Null, |dt| Self::Text(format_datetime(dt)))
    }
}

impl rusqlite::ToSql for AttributeValue {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        use rusqlite::types::{ToSqlOutput, ValueRef};
        Ok(match self {
            Self::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Self::Int(v) => ToSqlOutput::Borrowed(ValueRef::Integer(*v)),
            Self::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

impl IssueRecord {
    /// Convenience constructor for a new (unsaved) issue.
    #[must_use]
    pub fn new(project_id: i64, title: &str, description: &str) -> Self {
        Self {
            project_id,
            title: title.to_string(),
            description: description.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn is_new(&self) -> bool {
        self.id < 1
    }

    /// All declared attributes with their current values, in column order.
    #[must_use]
    pub fn attributes(&self) -> Vec<(&'static str, AttributeValue)> {
        use AttributeValue::{Int, Text};
        vec![
            ("id", Int(self.id)),
            ("issue_number", Int(self.issue_number)),
            ("foreign_number", Int(self.foreign_number)),
            ("project_id", Int(self.project_id)),
            ("title", Text(self.title.clone())),
            ("description", Text(self.description.clone())),
            ("description_raw", Text(self.description_raw.clone())),
            ("priority", Int(self.priority)),
            ("status", Int(self.status)),
            (
                "opened_date",
                AttributeValue::from_date(self.opened_date.as_ref()),
            ),
            ("opened_by", Text(self.opened_by.clone())),
            (
                "closed_date",
                AttributeValue::from_date(self.closed_date.as_ref()),
            ),
            ("closed_by", Text(self.closed_by.clone())),
            ("closed_sha", Text(self.closed_sha.clone())),
            (
                "modified_date",
                AttributeValue::from_date(self.modified_date.as_ref()),
            ),
            ("modified_by", Text(self.modified_by.clone())),
            ("rel_id", Int(self.rel_id)),
            ("rel_type", Text(self.rel_type.clone())),
        ]
    }

    /// Assign one attribute from a loosely typed input value.
    ///
    /// Returns `Ok(false)` when `name` is not a declared attribute.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when the value cannot be coerced to the
    /// attribute's type.
    pub fn set_attribute(&mut self, name: &str, value: &Value) -> Result<bool> {
        match name {
            "id" => self.id = coerce_int(name, value)?,
            "issue_number" => self.issue_number = coerce_int(name, value)?,
            "foreign_number" => self.foreign_number = coerce_int(name, value)?,
            "project_id" => self.project_id = coerce_int(name, value)?,
            "title" => self.title = coerce_text(name, value)?,
            "description" => self.description = coerce_text(name, value)?,
            "description_raw" => self.description_raw = coerce_text(name, value)?,
            "priority" => self.priority = coerce_int(name, value)?,
            "status" => self.status = coerce_int(name, value)?,
            "opened_date" => self.opened_date = coerce_date(name, value)?,
            "opened_by" => self.opened_by = coerce_text(name, value)?,
            "closed_date" => self.closed_date = coerce_date(name, value)?,
            "closed_by" => self.closed_by = coerce_text(name, value)?,
            "closed_sha" => self.closed_sha = coerce_text(name, value)?,
            "modified_date" => self.modified_date = coerce_date(name, value)?,
            "modified_by" => self.modified_by = coerce_text(name, value)?,
            "rel_id" => self.rel_id = coerce_int(name, value)?,
            "rel_type" => self.rel_type = coerce_text(name, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// Coerce to an integer. Null and blank strings read as zero.
pub(crate) fn coerce_int(name: &str, value: &Value) -> Result<i64> {
    let parsed = match value {
        Value::Null => Some(0),
        Value::Bool(b) => Some(i64::from(*b)),
        #[allow(clippy::cast_possible_truncation)]
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) if s.trim().is_empty() => Some(0),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Array(_) | Value::Object(_) => None,
    };
    parsed.ok_or_else(|| {
        TrackerError::InvalidArgument(format!(
            "attribute `{name}` expects an integer, got {}",
            json_type_name(value)
        ))
    })
}

fn coerce_text(name: &str, value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(true) => Ok("1".to_string()),
        Value::Bool(false) => Ok(String::new()),
        Value::Array(_) | Value::Object(_) => Err(TrackerError::InvalidArgument(format!(
            "attribute `{name}` expects a string, got {}",
            json_type_name(value)
        ))),
    }
}

fn coerce_date(name: &str, value: &Value) -> Result<Option<NaiveDateTime>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() || s.trim().starts_with("0000-00-00") => Ok(None),
        Value::String(s) => parse_datetime(s).map(Some).ok_or_else(|| {
            TrackerError::InvalidArgument(format!(
                "attribute `{name}` expects a date-time (YYYY-MM-DD HH:MM:SS), got {s:?}"
            ))
        }),
        _ => Err(TrackerError::InvalidArgument(format!(
            "attribute `{name}` expects a date-time string, got {}",
            json_type_name(value)
        ))),
    }
}

/// Human-readable JSON type, used in bind error messages.
#[must_use]
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "double",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

mod opt_datetime {
    use crate::util::time::{format_datetime, parse_datetime};
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&format_datetime(dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse_datetime))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn attributes_follow_declared_order() {
        let record = IssueRecord::new(3, "Title", "Body");
        let names: Vec<&str> = record.attributes().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, ISSUE_ATTRIBUTES);
    }

    #[test]
    fn set_attribute_coerces_loose_input() {
        let mut record = IssueRecord::default();
        assert!(record.set_attribute("priority", &json!("4")).unwrap());
        assert!(record.set_attribute("status", &json!(2.0)).unwrap());
        assert!(record.set_attribute("title", &json!(42)).unwrap());
        assert!(
            record
                .set_attribute("opened_date", &json!("2013-01-02 03:04:05"))
                .unwrap()
        );
        assert_eq!(record.priority, 4);
        assert_eq!(record.status, 2);
        assert_eq!(record.title, "42");
        assert_eq!(
            record.opened_date.map(|d| format_datetime(&d)).as_deref(),
            Some("2013-01-02 03:04:05")
        );
    }

    #[test]
    fn set_attribute_ignores_unknown_names() {
        let mut record = IssueRecord::default();
        assert!(!record.set_attribute("labels", &json!(["bug"])).unwrap());
        assert_eq!(record, IssueRecord::default());
    }

    #[test]
    fn set_attribute_rejects_uncoercible_values() {
        let mut record = IssueRecord::default();
        let err = record.set_attribute("priority", &json!("high")).unwrap_err();
        assert!(err.to_string().contains("`priority`"));
        assert!(record.set_attribute("title", &json!({"a": 1})).is_err());
        assert!(record.set_attribute("closed_date", &json!("yesterday")).is_err());
    }

    #[test]
    fn zero_dates_bind_as_absent() {
        let mut record = IssueRecord::default();
        record
            .set_attribute("opened_date", &json!("0000-00-00 00:00:00"))
            .unwrap();
        assert_eq!(record.opened_date, None);
    }

    #[test]
    fn empty_values_match_falsy_semantics() {
        assert!(AttributeValue::Null.is_empty());
        assert!(AttributeValue::Int(0).is_empty());
        assert!(AttributeValue::Text(String::new()).is_empty());
        assert!(AttributeValue::Text("0".to_string()).is_empty());
        assert!(!AttributeValue::Text(" ".to_string()).is_empty());
        assert!(!AttributeValue::Int(-1).is_empty());
    }

    #[test]
    fn json_type_names() {
        assert_eq!(json_type_name(&json!(5)), "integer");
        assert_eq!(json_type_name(&json!("x")), "string");
        assert_eq!(json_type_name(&json!([1])), "array");
        assert_eq!(json_type_name(&json!(1.5)), "double");
    }
}
