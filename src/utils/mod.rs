//! Shared utility functions.
//!
//! Display helpers used when rendering documents as JSON.

mod format;

pub use format::{document_source, format_metadata, safe_url, short_number, DocumentSource};
