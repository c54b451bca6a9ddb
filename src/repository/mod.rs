//! Persistence for users, sessions, sites, documents and workflow history.
//!
//! All access goes through Diesel with diesel-async, over SQLite by default
//! or PostgreSQL with the `postgres` feature.

pub mod context;
pub mod documents;
pub mod history;
pub mod migrations;
pub mod models;
#[cfg(feature = "postgres")]
pub mod pg_tls;
pub mod pool;
pub mod sessions;
pub mod sites;
pub mod users;
pub mod util;

pub use context::DbContext;
pub use documents::{DocumentPage, DocumentQuery, DocumentRepository, DocumentSort, DOCUMENTS_PER_PAGE};
pub use history::WorkflowHistoryRepository;
pub use migrations::run_migrations;
pub use pool::{DbError, DbPool, DieselError};
pub use sessions::SessionRepository;
pub use sites::{DiscoveredItem, SiteRepository};
pub use users::UserRepository;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::ValidationErrors;

/// Failure of a write that validates before touching the database.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("validation failed: {0}")]
    Invalid(ValidationErrors),
    #[error("database error: {0}")]
    Database(#[from] DieselError),
}

impl From<ValidationErrors> for SaveError {
    fn from(errors: ValidationErrors) -> Self {
        SaveError::Invalid(errors)
    }
}

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parse an optional datetime string; unparseable values become `None`.
pub fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

/// Fixed-width UTC form so stored timestamps compare correctly as text.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_datetime_text_roundtrip_sorts() {
        let early = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 11, 2, 3, 4, 5).unwrap();
        assert_eq!(format_datetime(&early), "2024-01-02T03:04:05.000000Z");
        assert!(format_datetime(&early) < format_datetime(&late));
        assert_eq!(parse_datetime(&format_datetime(&late)), late);
        assert_eq!(parse_datetime("garbage"), DateTime::UNIX_EPOCH);
        assert_eq!(parse_datetime_opt(Some("garbage".into())), None);
    }
}
