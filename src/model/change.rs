//! Field-level change tracking between two states of an issue.

use super::issue::{AttributeValue, IssueRecord};
use serde::{Deserialize, Serialize};

/// Attribute names that are never reported as changes.
///
/// `modified` is the historical name of the modification stamp; the stamp
/// columns written by `store` itself are excluded alongside it so that a
/// save does not audit its own bookkeeping.
pub const UNTRACKED_ATTRIBUTES: &[&str] = &["modified", "modified_date", "modified_by"];

/// One changed attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub name: String,
    pub old: AttributeValue,
    pub new: AttributeValue,
}

/// Diff two attribute lists by name.
///
/// A name present in `after` but missing from `before` is compared against
/// `Null`. Pairs where both sides are empty are skipped even when they
/// differ in representation (`0` vs `""`).
#[must_use]
pub fn diff_attributes(
    before: &[(&str, AttributeValue)],
    after: &[(&str, AttributeValue)],
) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    for (name, new) in after {
        let old = before
            .iter()
            .find(|(n, _)| n == name)
            .map_or(AttributeValue::Null, |(_, v)| v.clone());

        if old.is_empty() && new.is_empty() {
            continue;
        }

        if old != *new && !UNTRACKED_ATTRIBUTES.contains(name) {
            changes.push(FieldChange {
                name: (*name).to_string(),
                old,
                new: new.clone(),
            });
        }
    }

    changes
}

/// Diff a prior snapshot against the current record.
#[must_use]
pub fn diff_records(before: &IssueRecord, after: &IssueRecord) -> Vec<FieldChange> {
    diff_attributes(&before.attributes(), &after.attributes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn text(s: &str) -> AttributeValue {
        AttributeValue::Text(s.to_string())
    }

    #[test]
    fn title_change_is_reported() {
        let mut before = IssueRecord::new(1, "A", "body");
        before.id = 5;
        let mut after = before.clone();
        after.title = "B".to_string();

        let changes = diff_records(&before, &after);
        assert_eq!(
            changes,
            vec![FieldChange {
                name: "title".to_string(),
                old: text("A"),
                new: text("B"),
            }]
        );
    }

    #[test]
    fn modified_is_never_reported() {
        let before = [("modified", text("2013-01-01 00:00:00")), ("title", text("A"))];
        let after = [("modified", text("2014-01-01 00:00:00")), ("title", text("A"))];
        assert!(diff_attributes(&before, &after).is_empty());
    }

    #[test]
    fn modification_stamps_are_not_reported() {
        let before = IssueRecord::new(1, "A", "body");
        let mut after = before.clone();
        after.modified_date = crate::util::time::parse_datetime("2020-02-02 02:02:02");
        after.modified_by = "alice".to_string();
        assert!(diff_records(&before, &after).is_empty());
    }

    #[test]
    fn both_empty_values_are_skipped() {
        let before = [("closed_by", AttributeValue::Null), ("status", text("0"))];
        let after = [("closed_by", text("")), ("status", AttributeValue::Int(0))];
        assert!(diff_attributes(&before, &after).is_empty());
    }

    #[test]
    fn empty_to_value_is_reported() {
        let before = [("closed_sha", text(""))];
        let after = [("closed_sha", text("abc123"))];
        let changes = diff_attributes(&before, &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].old, text(""));
    }

    #[test]
    fn payload_serializes_as_plain_json() {
        let change = FieldChange {
            name: "priority".to_string(),
            old: AttributeValue::Int(3),
            new: AttributeValue::Int(1),
        };
        let json = serde_json::to_string(&vec![change]).unwrap();
        assert_eq!(json, r#"[{"name":"priority","old":3,"new":1}]"#);
    }

    proptest! {
        #[test]
        fn identical_records_never_differ(
            title in ".*",
            description in ".*",
            priority in any::<i64>(),
            status in any::<i64>(),
        ) {
            let mut record = IssueRecord::new(1, &title, &description);
            record.priority = priority;
            record.status = status;
            prop_assert!(diff_records(&record, &record.clone()).is_empty());
        }

        #[test]
        fn single_title_change_yields_single_entry(a in "[a-z]{1,8}", b in "[A-Z]{1,8}") {
            let before = IssueRecord::new(1, &a, "body");
            let mut after = before.clone();
            after.title.clone_from(&b);
            let changes = diff_records(&before, &after);
            prop_assert_eq!(changes.len(), 1);
            prop_assert_eq!(&changes[0].name, "title");
        }
    }
}
