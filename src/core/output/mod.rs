//! Output for CLI commands.
//!
//! [`OutputWriter`] renders command results as human-readable text or as a
//! single JSON document, depending on `--format`.

mod format;
pub mod view;

pub use format::OutputWriter;
