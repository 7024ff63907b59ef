//! Rendering of estimates and run summaries.

pub mod json;
pub mod terminal;

pub use json::{to_json, to_json_pretty};
pub use terminal::{format_summary, format_vt};
