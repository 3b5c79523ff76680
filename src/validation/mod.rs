//! Validation of inbound protocol lines.

mod line;

pub use line::{parse_update, value_format_ok, ControlUpdate};
