//! asap_pdf - triage tracker for PDF documents published on government websites.
//!
//! Core library: domain models, the document workflow, persistence, the
//! external collaborators (object storage, summary inference) and the web server.

// Model types use `from_str` methods that return Option<Self>,
// not Result<Self, Error> as std::str::FromStr requires.
#![allow(clippy::should_implement_trait)]

pub mod auth;
pub mod config;
pub mod error;
pub mod inference;
pub mod migrations;
pub mod models;
pub mod repository;
pub mod schema;
pub mod server;
pub mod storage;
pub mod utils;
pub mod workflow;
