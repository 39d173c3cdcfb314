//! `tracker_store` - issue persistence with audit trail and custom fields
//!
//! This crate provides the save protocol behind the `trk` CLI tool: an
//! issue record is bound from loose input, validated, stored, and every
//! save leaves `open`/`change` activity rows and custom field values behind.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Data types (issue record, activity, custom fields, acting context)
//! - [`storage`] - `SQLite` database layer and the record store
//! - [`config`] - Configuration management
//! - [`error`] - Error types and handling
//! - [`logging`] - Tracing subscriber setup
//! - [`util`] - Utility functions (time, input sanitizing)

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod storage;
pub mod util;

pub use error::{ErrorCode, Result, TrackerError};
