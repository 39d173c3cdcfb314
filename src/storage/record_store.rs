//! Save protocol for a single issue record.
//!
//! A save is `bind` (merge input, snapshot the persisted state, split out
//! custom fields), optionally `check`, then `store`:
//!
//! 1. classify new vs existing
//! 2. stamp opened/modified dates
//! 3. insert or update the base row
//! 4. append an `open` activity for interactive creations
//! 5. append a `change` activity when the snapshot diff is non-empty
//! 6. reconcile custom field rows (update existing ids, insert new ones)
//!
//! Steps run as separate statements. A failure part-way leaves the earlier
//! writes in place; `store_atomic` runs the same steps in one transaction.

use crate::error::{Result, TrackerError};
use crate::model::{
    ActingContext, ActivityEvent, CustomFields, IssueRecord, clean_fields, diff_records,
    json_type_name,
};
use crate::storage::bind::{BindSource, FilterHint, InputSource};
use crate::storage::sqlite::{
    SqliteStorage, field_ids_for_issue, insert_activity, insert_field_value, update_field_value,
};
use crate::storage::table::{insert_row, load_row, max_key, update_row};
use crate::util::sanitize::{InputFilter, Sanitizer};
use crate::util::time::{Clock, SystemClock};
use rusqlite::Connection;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, info, warn};

static DEFAULT_FILTER: InputFilter = InputFilter;
static DEFAULT_CLOCK: SystemClock = SystemClock;

/// Reserved attribute carrying the raw custom field payload.
const FIELDS_KEY: &str = "fields";

/// Owns one issue record through a save.
pub struct IssueRecordStore<'s> {
    storage: &'s SqliteStorage,
    sanitizer: &'s dyn Sanitizer,
    clock: &'s dyn Clock,
    record: IssueRecord,
    prior: Option<IssueRecord>,
    field_values: Option<CustomFields>,
}

impl<'s> IssueRecordStore<'s> {
    /// Start with an empty (new) record.
    #[must_use]
    pub fn new(storage: &'s SqliteStorage) -> Self {
        Self::with_record(storage, IssueRecord::default())
    }

    #[must_use]
    pub fn with_record(storage: &'s SqliteStorage, record: IssueRecord) -> Self {
        Self {
            storage,
            sanitizer: &DEFAULT_FILTER,
            clock: &DEFAULT_CLOCK,
            record,
            prior: None,
            field_values: None,
        }
    }

    #[must_use]
    pub fn sanitizer(mut self, sanitizer: &'s dyn Sanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: &'s dyn Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub const fn record(&self) -> &IssueRecord {
        &self.record
    }

    pub const fn record_mut(&mut self) -> &mut IssueRecord {
        &mut self.record
    }

    #[must_use]
    pub fn into_record(self) -> IssueRecord {
        self.record
    }

    /// Snapshot captured by the last `bind`, if it has not been consumed.
    #[must_use]
    pub const fn prior(&self) -> Option<&IssueRecord> {
        self.prior.as_ref()
    }

    /// Cleaned custom fields from the last `bind` that carried a payload.
    #[must_use]
    pub const fn custom_fields(&self) -> Option<&CustomFields> {
        self.field_values.as_ref()
    }

    /// Replace the record with the stored row `id`. Drops any snapshot and
    /// bound custom fields.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` if there is no such row, or a database error.
    pub fn load(&mut self, id: i64) -> Result<&IssueRecord> {
        let record: IssueRecord =
            load_row(self.storage.connection(), id)?.ok_or(TrackerError::IssueNotFound { id })?;
        self.record = record;
        self.prior = None;
        self.field_values = None;
        Ok(&self.record)
    }

    /// Merge external input into the record.
    ///
    /// When the record is already persisted, a snapshot of its current
    /// state is taken first; `store` diffs against it. A `fields` payload is
    /// cleaned and held apart from the scalar attributes. Names listed in
    /// `ignore` are not merged.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a non-object attribute source, a bad
    /// custom field payload, or an uncoercible attribute value. The record
    /// is left unchanged on error.
    pub fn bind<'a>(&mut self, source: impl Into<BindSource<'a>>, ignore: &[&str]) -> Result<bool> {
        if self.record.id != 0 {
            self.prior = Some(self.record.clone());
        }

        match source.into() {
            BindSource::Attributes(value) => {
                let Value::Object(map) = value else {
                    return Err(TrackerError::InvalidArgument(format!(
                        "IssueRecordStore::bind can not bind to {}",
                        json_type_name(value)
                    )));
                };
                self.bind_attributes(map, ignore)
            }
            BindSource::Request(input) => self.bind_request(input, ignore),
        }
    }

    fn bind_attributes(&mut self, map: &Map<String, Value>, ignore: &[&str]) -> Result<bool> {
        let fields = match map.get(FIELDS_KEY) {
            Some(raw) if !raw.is_null() => Some(self.clean_fields(raw)?),
            _ => None,
        };

        let mut next = self.record.clone();
        for (name, value) in map {
            if name == FIELDS_KEY || ignore.contains(&name.as_str()) {
                continue;
            }
            if !next.set_attribute(name, value)? {
                debug!(attribute = %name, "Ignoring unknown issue attribute");
            }
        }

        self.record = next;
        if fields.is_some() {
            self.field_values = fields;
        }
        Ok(true)
    }

    fn bind_request(&mut self, input: &dyn InputSource, ignore: &[&str]) -> Result<bool> {
        let raw = input.get(FIELDS_KEY, Value::Object(Map::new()), FilterHint::Array);
        let fields = match &raw {
            Value::Object(groups) if groups.is_empty() => None,
            Value::Array(items) if items.is_empty() => None,
            _ => Some(self.clean_fields(&raw)?),
        };

        let mut next = self.record.clone();
        if !ignore.contains(&"id") {
            let id = input.get("id", Value::Null, FilterHint::Cmd);
            next.set_attribute("id", &id)?;
        }

        self.record = next;
        self.field_values = fields;
        Ok(true)
    }

    /// Clean a raw custom field payload with this store's sanitizer.
    ///
    /// # Errors
    ///
    /// See [`clean_fields`].
    pub fn clean_fields(&self, raw: &Value) -> Result<CustomFields> {
        clean_fields(raw, self.sanitizer)
    }

    /// Validate the record. All violations are reported together.
    ///
    /// # Errors
    ///
    /// Returns `Validation` listing every violated invariant, one per line.
    pub fn check(&self) -> Result<&Self> {
        let mut errors = Vec::new();

        if self.record.title.trim().is_empty() {
            errors.push("A title is required.");
        }
        if self.record.description.trim().is_empty() {
            errors.push("A description is required.");
        }

        if errors.is_empty() {
            Ok(self)
        } else {
            Err(TrackerError::validation(&errors))
        }
    }

    /// Persist the record and run the post-save audit and custom field steps.
    ///
    /// The snapshot taken by `bind` is consumed whether or not the save
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Propagates any storage error unchanged. Writes completed before the
    /// failing statement stay committed.
    pub fn store(&mut self, update_nulls: bool, ctx: &ActingContext) -> Result<&IssueRecord> {
        let storage = self.storage;
        let result = self.run_save(storage.connection(), update_nulls, ctx);
        self.prior = None;
        result?;
        Ok(&self.record)
    }

    /// Like [`store`](Self::store), but inside a single transaction. On
    /// failure nothing is written and the in-memory record and snapshot are
    /// restored, so the save can be retried.
    ///
    /// # Errors
    ///
    /// Propagates any storage error unchanged.
    pub fn store_atomic(&mut self, update_nulls: bool, ctx: &ActingContext) -> Result<&IssueRecord> {
        let storage = self.storage;
        let record_before = self.record.clone();
        let prior_before = self.prior.clone();

        let result = storage.with_transaction(|conn| self.run_save(conn, update_nulls, ctx));
        if let Err(err) = result {
            warn!(id = record_before.id, error = %err, "Atomic save rolled back");
            self.record = record_before;
            self.prior = prior_before;
            return Err(err);
        }

        Ok(&self.record)
    }

    fn run_save(&mut self, conn: &Connection, update_nulls: bool, ctx: &ActingContext) -> Result<()> {
        let is_new = self.record.is_new();
        let now = self.clock.now();

        if is_new {
            if self.record.opened_date.is_none() {
                self.record.opened_date = Some(now);
            }
        } else {
            self.record.modified_date = Some(now);
            self.record.modified_by = ctx.identity();
        }

        if is_new {
            insert_row(conn, &mut self.record)?;
            debug!(id = self.record.id, "Inserted issue");
        } else {
            let rows = update_row(conn, &self.record, update_nulls)?;
            debug!(id = self.record.id, rows, update_nulls, "Updated issue");
        }

        if is_new && !ctx.is_batch() {
            let opened = self.record.opened_date.unwrap_or(now);
            insert_activity(
                conn,
                &ActivityEvent::open(
                    self.record.id,
                    &ctx.username,
                    opened,
                    self.record.project_id,
                ),
            )?;
        }

        if let Some(prior) = self.prior.take() {
            let changes = diff_records(&prior, &self.record);
            if !changes.is_empty() {
                debug!(id = self.record.id, count = changes.len(), "Recording attribute changes");
                let payload = serde_json::to_string(&changes)?;
                insert_activity(
                    conn,
                    &ActivityEvent::change(self.record.id, &ctx.username, payload, now),
                )?;
            }
        }

        self.store_custom_fields(conn)?;

        info!(id = self.record.id, is_new, "Saved issue");
        Ok(())
    }

    fn store_custom_fields(&self, conn: &Connection) -> Result<()> {
        let Some(fields) = self.field_values.as_ref() else {
            return Ok(());
        };

        let issue_id = self.resolve_issue_id(conn)?;

        // Read-then-write: a concurrent writer between these two steps can
        // produce duplicate (issue_id, field_id) rows.
        let existing: HashSet<i64> = field_ids_for_issue(conn, issue_id)?.into_iter().collect();

        for (field_id, value) in fields.entries() {
            let stored = value.to_stored();
            if existing.contains(&field_id) {
                update_field_value(conn, issue_id, field_id, &stored)?;
            } else {
                insert_field_value(conn, issue_id, field_id, &stored)?;
            }
        }

        debug!(issue_id, count = fields.len(), "Stored custom fields");
        Ok(())
    }

    /// Issue id for custom field rows: the record id, or the highest id in
    /// the issues table when the base layer left the record id at 0.
    fn resolve_issue_id(&self, conn: &Connection) -> Result<i64> {
        if self.record.id != 0 {
            return Ok(self.record.id);
        }
        let max_id = max_key::<IssueRecord>(conn)?;
        warn!(max_id, "Record id not set after save; using highest issue id");
        Ok(max_id)
    }
}
