//! Display formatting shared by front-ends.

pub mod format;

pub use format::{format_compact, format_count, format_date, format_signed_percent, truncate_string};
