//! Utility functions (time, sanitization).

pub mod sanitize;
pub mod time;

pub use sanitize::{InputFilter, NoopSanitizer, Sanitizer};
pub use time::{Clock, DATETIME_FORMAT, FixedClock, SystemClock, format_datetime, parse_datetime};
