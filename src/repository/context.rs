//! Entry point to the data layer: one pool, one accessor per repository.

use std::path::Path;

use super::documents::DocumentRepository;
use super::history::WorkflowHistoryRepository;
use super::pool::{DbError, DbPool};
use super::sessions::SessionRepository;
use super::sites::SiteRepository;
use super::users::UserRepository;

/// Holds the connection pool and hands out repositories sharing it.
///
/// ```ignore
/// let ctx = DbContext::from_url("postgres://localhost/asap_pdf", false)?;
/// let sites = ctx.sites().list_for_user(user.id).await?;
/// ```
#[derive(Clone)]
pub struct DbContext {
    pool: DbPool,
    database_url: String,
    no_tls: bool,
}

impl DbContext {
    /// SQLite database at `path`.
    pub fn sqlite(path: &Path) -> Self {
        Self {
            pool: DbPool::sqlite_from_path(path),
            database_url: format!("sqlite:{}", path.display()),
            no_tls: false,
        }
    }

    /// SQLite path, `sqlite:` URL or `postgres://` URL.
    pub fn from_url(url: &str, no_tls: bool) -> Result<Self, DbError> {
        Ok(Self {
            pool: DbPool::from_url(url, no_tls)?,
            database_url: url.to_string(),
            no_tls,
        })
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    pub fn sessions(&self) -> SessionRepository {
        SessionRepository::new(self.pool.clone())
    }

    pub fn sites(&self) -> SiteRepository {
        SiteRepository::new(self.pool.clone())
    }

    pub fn documents(&self) -> DocumentRepository {
        DocumentRepository::new(self.pool.clone())
    }

    pub fn histories(&self) -> WorkflowHistoryRepository {
        WorkflowHistoryRepository::new(self.pool.clone())
    }

    /// Bring the schema up to date.
    pub async fn init_schema(&self) -> Result<Vec<String>, DbError> {
        super::migrations::run_migrations(&self.database_url, self.no_tls).await
    }
}
