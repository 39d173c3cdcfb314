//! User-defined custom field values attached to an issue.

use crate::error::{Result, TrackerError};
use crate::model::issue::json_type_name;
use crate::util::sanitize::Sanitizer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// The three groups a raw field payload must carry.
pub const FIELD_GROUPS: [&str; 3] = ["selects", "textfields", "checkboxes"];

/// A cleaned custom field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomValue {
    /// Dropdown choice (option id).
    Select(i64),
    /// Sanitized free text.
    Text(String),
    /// Checked checkbox. Unchecked boxes are never stored.
    Checkbox,
}

impl CustomValue {
    /// Text stored in the `value` column.
    #[must_use]
    pub fn to_stored(&self) -> String {
        match self {
            Self::Select(v) => v.to_string(),
            Self::Text(s) => s.clone(),
            Self::Checkbox => "1".to_string(),
        }
    }
}

/// Active custom field entries, grouped by widget type and keyed by field id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CustomFields {
    pub selects: BTreeMap<i64, i64>,
    pub textfields: BTreeMap<i64, String>,
    pub checkboxes: BTreeSet<i64>,
}

impl CustomFields {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selects.is_empty() && self.textfields.is_empty() && self.checkboxes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.selects.len() + self.textfields.len() + self.checkboxes.len()
    }

    /// All entries: selects first, then text fields, then checkboxes.
    pub fn entries(&self) -> impl Iterator<Item = (i64, CustomValue)> + '_ {
        let selects = self
            .selects
            .iter()
            .map(|(id, v)| (*id, CustomValue::Select(*v)));
        let texts = self
            .textfields
            .iter()
            .map(|(id, v)| (*id, CustomValue::Text(v.clone())));
        let checks = self.checkboxes.iter().map(|id| (*id, CustomValue::Checkbox));
        selects.chain(texts).chain(checks)
    }
}

/// One row of `tracker_fields_values`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldValue {
    pub issue_id: i64,
    pub field_id: i64,
    pub value: String,
}

/// Clean a raw field payload.
///
/// Drops entries whose value is falsy, coerces selects to integers, runs
/// text through `sanitizer` and normalizes checkboxes to "checked".
///
/// # Errors
///
/// Returns `InvalidArgument` if a group is missing or not an object, if a
/// key is not an integer field id, or if a value has the wrong shape.
pub fn clean_fields(raw: &Value, sanitizer: &dyn Sanitizer) -> Result<CustomFields> {
    let Value::Object(groups) = raw else {
        return Err(TrackerError::InvalidArgument(format!(
            "custom field payload must be an object, got {}",
            json_type_name(raw)
        )));
    };

    let mut cleaned = CustomFields::default();

    for (key, value) in active_entries(groups, "selects")? {
        cleaned.selects.insert(key, coerce_select(key, value)?);
    }

    for (key, value) in active_entries(groups, "textfields")? {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(_) => "1".to_string(),
            other => {
                return Err(TrackerError::InvalidArgument(format!(
                    "text field {key} expects a string, got {}",
                    json_type_name(other)
                )));
            }
        };
        cleaned.textfields.insert(key, sanitizer.clean(&text));
    }

    for (key, _) in active_entries(groups, "checkboxes")? {
        cleaned.checkboxes.insert(key);
    }

    Ok(cleaned)
}

fn active_entries<'a>(groups: &'a Map<String, Value>, group: &str) -> Result<Vec<(i64, &'a Value)>> {
    let entries = match groups.get(group) {
        Some(Value::Object(entries)) => entries,
        Some(other) => {
            return Err(TrackerError::InvalidArgument(format!(
                "custom field group `{group}` must be an object, got {}",
                json_type_name(other)
            )));
        }
        None => {
            return Err(TrackerError::InvalidArgument(format!(
                "custom field payload is missing the `{group}` group"
            )));
        }
    };

    let mut active = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        if is_falsy(value) {
            continue;
        }
        let field_id = key.trim().parse::<i64>().map_err(|_| {
            TrackerError::InvalidArgument(format!(
                "custom field id `{key}` in `{group}` is not an integer"
            ))
        })?;
        active.push((field_id, value));
    }
    Ok(active)
}

fn coerce_select(field_id: i64, value: &Value) -> Result<i64> {
    let parsed = match value {
        Value::Bool(b) => Some(i64::from(*b)),
        #[allow(clippy::cast_possible_truncation)]
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        TrackerError::InvalidArgument(format!(
            "select field {field_id} expects an integer option, got {value}"
        ))
    })
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::sanitize::{InputFilter, NoopSanitizer};
    use serde_json::json;

    #[test]
    fn cleans_all_three_groups() {
        let raw = json!({
            "selects": {"1": "2", "3": ""},
            "textfields": {"5": "  hi  "},
            "checkboxes": {"9": "on", "10": ""}
        });

        let cleaned = clean_fields(&raw, &InputFilter).unwrap();
        assert_eq!(cleaned.selects, BTreeMap::from([(1, 2)]));
        assert_eq!(
            cleaned.textfields,
            BTreeMap::from([(5, InputFilter.clean("  hi  "))])
        );
        assert_eq!(cleaned.checkboxes, BTreeSet::from([9]));
    }

    #[test]
    fn text_runs_through_sanitizer() {
        let raw = json!({
            "selects": {},
            "textfields": {"4": "<b>bold</b>"},
            "checkboxes": {}
        });
        let cleaned = clean_fields(&raw, &InputFilter).unwrap();
        assert_eq!(cleaned.textfields[&4], "bold");

        let trusted = clean_fields(&raw, &NoopSanitizer).unwrap();
        assert_eq!(trusted.textfields[&4], "<b>bold</b>");
    }

    #[test]
    fn falsy_values_are_dropped() {
        let raw = json!({
            "selects": {"1": 0, "2": "0", "3": null},
            "textfields": {"4": "", "5": false},
            "checkboxes": {"6": false, "7": 0, "8": true}
        });
        let cleaned = clean_fields(&raw, &InputFilter).unwrap();
        assert!(cleaned.selects.is_empty());
        assert!(cleaned.textfields.is_empty());
        assert_eq!(cleaned.checkboxes, BTreeSet::from([8]));
        assert_eq!(cleaned.len(), 1);
    }

    #[test]
    fn missing_group_is_rejected() {
        let raw = json!({"selects": {}, "textfields": {}});
        let err = clean_fields(&raw, &InputFilter).unwrap_err();
        assert!(err.to_string().contains("`checkboxes`"));
    }

    #[test]
    fn bad_keys_and_values_are_rejected() {
        let bad_key = json!({"selects": {"x": 1}, "textfields": {}, "checkboxes": {}});
        assert!(clean_fields(&bad_key, &InputFilter).is_err());

        let bad_select = json!({"selects": {"1": "two"}, "textfields": {}, "checkboxes": {}});
        assert!(clean_fields(&bad_select, &InputFilter).is_err());

        assert!(clean_fields(&json!([1, 2]), &InputFilter).is_err());
    }

    #[test]
    fn entries_are_grouped_in_order() {
        let fields = CustomFields {
            selects: BTreeMap::from([(7, 1)]),
            textfields: BTreeMap::from([(2, "t".to_string())]),
            checkboxes: BTreeSet::from([1]),
        };
        let entries: Vec<_> = fields.entries().collect();
        assert_eq!(
            entries,
            vec![
                (7, CustomValue::Select(1)),
                (2, CustomValue::Text("t".to_string())),
                (1, CustomValue::Checkbox),
            ]
        );
        assert_eq!(entries[2].1.to_stored(), "1");
    }
}
