//! `SQLite` storage layer for the tracker.
//!
//! This module provides the persistence layer using `SQLite` with:
//! - WAL mode for concurrent reads
//! - A generic keyed-row base layer
//! - The issue save protocol (audit events and custom fields)
//!
//! # Submodules
//!
//! - [`bind`] - Input sources accepted by the save protocol
//! - [`record_store`] - Issue save protocol
//! - [`schema`] - Database schema definitions
//! - [`sqlite`] - Connection owner and statement helpers
//! - [`table`] - Keyed row load/insert/update

pub mod bind;
pub mod record_store;
pub mod schema;
pub mod sqlite;
pub mod table;

pub use bind::{BindSource, FilterHint, InputSource, RequestInput};
pub use record_store::IssueRecordStore;
pub use sqlite::SqliteStorage;
pub use table::TableRow;
