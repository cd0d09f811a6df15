//! # Formatter
//!
//! Renders [`crate::error::Diagnostic`]s as annotated source excerpts for
//! the CLI and for hosts that show errors to authors.

pub mod report;

pub use report::ErrorReport;
