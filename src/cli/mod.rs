//! Command-line interface for asap-pdf.

mod commands;
pub mod icons;

pub use commands::{is_verbose, run};
