//! Output rendering.

pub mod generator;

pub use generator::{generate_apps_markdown, generate_json_report, generate_markdown_report, write_report};
