//! Applies the cetane migrations in `crate::migrations`.
//!
//! The migrator is synchronous, so SQLite runs on a blocking task and
//! PostgreSQL statements are driven through the current runtime handle.

use cetane::migrator::MigrationStateStore;
use tracing::info;

use super::pool::DieselError;

/// Run pending migrations against `database_url`.
pub async fn run_migrations(database_url: &str, no_tls: bool) -> Result<Vec<String>, DieselError> {
    if super::util::is_postgres_url(database_url) {
        #[cfg(feature = "postgres")]
        {
            run_postgres_migrations(database_url, no_tls).await
        }
        #[cfg(not(feature = "postgres"))]
        {
            let _ = no_tls;
            Err(migration_error(
                "PostgreSQL support not compiled. Use --features postgres",
            ))
        }
    } else {
        let _ = no_tls;
        run_sqlite_migrations(database_url).await
    }
}

/// Names of migrations already recorded as applied.
pub async fn applied_migrations(database_url: &str, no_tls: bool) -> Result<Vec<String>, DieselError> {
    if super::util::is_postgres_url(database_url) {
        #[cfg(feature = "postgres")]
        {
            let client = super::pg_tls::connect_raw(database_url, no_tls)
                .await
                .map_err(migration_error)?;
            let mut state = PostgresState::new(&client).await?;
            return state.applied_migrations().map_err(migration_error);
        }
        #[cfg(not(feature = "postgres"))]
        {
            let _ = no_tls;
            return Err(migration_error(
                "PostgreSQL support not compiled. Use --features postgres",
            ));
        }
    }
    let _ = no_tls;

    let path = sqlite_path(database_url);
    tokio::task::spawn_blocking(move || {
        let conn = rusqlite::Connection::open(&path).map_err(migration_error)?;
        let mut state = SqliteState::new(&conn)?;
        state.applied_migrations().map_err(migration_error)
    })
    .await
    .map_err(migration_error)?
}

fn migration_error(msg: impl std::fmt::Display) -> DieselError {
    DieselError::QueryBuilderError(msg.to_string().into())
}

fn sqlite_path(database_url: &str) -> String {
    database_url
        .strip_prefix("sqlite:")
        .unwrap_or(database_url)
        .to_string()
}

fn log_applied(applied: &[String]) {
    for name in applied {
        info!("Applied migration: {}", name);
    }
    if applied.is_empty() {
        info!("No pending migrations");
    }
}

async fn run_sqlite_migrations(database_url: &str) -> Result<Vec<String>, DieselError> {
    use cetane::backend::Sqlite;
    use cetane::migrator::Migrator;

    let path = sqlite_path(database_url);

    tokio::task::spawn_blocking(move || {
        let conn = rusqlite::Connection::open(&path).map_err(migration_error)?;
        let registry = crate::migrations::registry();
        let state = SqliteState::new(&conn)?;

        let mut migrator = Migrator::new(&registry, &Sqlite, state);
        let applied = migrator
            .migrate_forward(|sql| conn.execute_batch(sql).map_err(|e| e.to_string()))
            .map_err(migration_error)?;
        let applied: Vec<String> = applied.into_iter().map(|n| n.to_string()).collect();

        log_applied(&applied);
        Ok(applied)
    })
    .await
    .map_err(migration_error)?
}

#[cfg(feature = "postgres")]
async fn run_postgres_migrations(
    database_url: &str,
    no_tls: bool,
) -> Result<Vec<String>, DieselError> {
    use cetane::backend::Postgres;
    use cetane::migrator::Migrator;

    let client = super::pg_tls::connect_raw(database_url, no_tls)
        .await
        .map_err(migration_error)?;

    let registry = crate::migrations::registry();
    let state = PostgresState::new(&client).await?;

    let mut migrator = Migrator::new(&registry, &Postgres, state);
    let applied = migrator
        .migrate_forward(|sql| block_on_pg(|| async { client.batch_execute(sql).await }))
        .map_err(migration_error)?;
    let applied: Vec<String> = applied.into_iter().map(|n| n.to_string()).collect();

    log_applied(&applied);
    Ok(applied)
}

/// Drive a PostgreSQL future to completion from the synchronous migrator.
#[cfg(feature = "postgres")]
fn block_on_pg<F, Fut>(f: F) -> Result<(), String>
where
    F: FnOnce() -> Fut + Send,
    Fut: std::future::Future<Output = Result<(), tokio_postgres::Error>>,
{
    let rt = tokio::runtime::Handle::current();
    std::thread::scope(|s| {
        s.spawn(|| rt.block_on(f()).map_err(|e| e.to_string()))
            .join()
            .map_err(|_| "thread panicked".to_string())?
    })
}

// -- SQLite state store --

struct SqliteState<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> SqliteState<'a> {
    fn new(conn: &'a rusqlite::Connection) -> Result<Self, DieselError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS __cetane_migrations (
                name TEXT PRIMARY KEY NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .map_err(migration_error)?;
        Ok(Self { conn })
    }
}

impl MigrationStateStore for SqliteState<'_> {
    fn applied_migrations(&mut self) -> Result<Vec<String>, String> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM __cetane_migrations ORDER BY name")
            .map_err(|e| e.to_string())?;
        let names = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| e.to_string())?
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| e.to_string())?;
        Ok(names)
    }

    fn mark_applied(&mut self, name: &str) -> Result<(), String> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO __cetane_migrations (name) VALUES (?1)",
                [name],
            )
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    fn mark_unapplied(&mut self, name: &str) -> Result<(), String> {
        self.conn
            .execute("DELETE FROM __cetane_migrations WHERE name = ?1", [name])
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

// -- PostgreSQL state store --

#[cfg(feature = "postgres")]
struct PostgresState<'a> {
    client: &'a tokio_postgres::Client,
    applied: Vec<String>,
}

#[cfg(feature = "postgres")]
impl<'a> PostgresState<'a> {
    async fn new(client: &'a tokio_postgres::Client) -> Result<Self, DieselError> {
        client
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS __cetane_migrations (
                    name TEXT PRIMARY KEY NOT NULL,
                    applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )",
            )
            .await
            .map_err(super::util::pg_to_diesel_error)?;

        let rows = client
            .query("SELECT name FROM __cetane_migrations ORDER BY name", &[])
            .await
            .map_err(super::util::pg_to_diesel_error)?;
        let applied = rows.iter().map(|r| r.get::<_, String>(0)).collect();

        Ok(Self { client, applied })
    }
}

#[cfg(feature = "postgres")]
impl MigrationStateStore for PostgresState<'_> {
    fn applied_migrations(&mut self) -> Result<Vec<String>, String> {
        Ok(self.applied.clone())
    }

    fn mark_applied(&mut self, name: &str) -> Result<(), String> {
        let client = self.client;
        block_on_pg(|| async move {
            client
                .execute(
                    "INSERT INTO __cetane_migrations (name) VALUES ($1) ON CONFLICT DO NOTHING",
                    &[&name],
                )
                .await
                .map(|_| ())
        })?;
        if !self.applied.iter().any(|n| n == name) {
            self.applied.push(name.to_string());
        }
        Ok(())
    }

    fn mark_unapplied(&mut self, name: &str) -> Result<(), String> {
        let client = self.client;
        block_on_pg(|| async move {
            client
                .execute("DELETE FROM __cetane_migrations WHERE name = $1", &[&name])
                .await
                .map(|_| ())
        })?;
        self.applied.retain(|n| n != name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_migrations_apply_once() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("asap.db").display());

        let first = run_migrations(&url, false).await.unwrap();
        assert!(first.contains(&"0001_initial_schema".to_string()));

        let second = run_migrations(&url, false).await.unwrap();
        assert!(second.is_empty());

        let recorded = applied_migrations(&url, false).await.unwrap();
        assert_eq!(recorded.len(), first.len());
    }
}
