//! User accounts.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::info;

use super::models::{NewUser, UserRecord};
use super::pool::{DbError, DbPool};
use super::util::{is_unique_violation, to_diesel_error};
use super::{format_datetime, SaveError};
use crate::auth::{hash_password, verify_password};
use crate::models::{User, ValidationErrors, BLANK, TAKEN};
use crate::schema::{document_workflow_histories, documents, sessions, sites, users};
use crate::with_conn;

#[derive(Clone)]
pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create an account; the email is normalized and must be unused.
    pub async fn create(&self, email: &str, password: &str) -> Result<User, SaveError> {
        let email = User::normalize_email(email);

        let mut errors = match User::validate_email(&email) {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };
        if password.is_empty() {
            errors.add("password", BLANK);
        }
        if errors.is_empty() && self.find_by_email(&email).await?.is_some() {
            errors.add("email_address", TAKEN);
        }
        errors.into_result()?;

        let digest = hash_password(password).map_err(to_diesel_error)?;
        let now = format_datetime(&Utc::now());

        let inserted = with_conn!(self.pool, conn => {
            diesel::insert_into(users::table)
                .values(&NewUser {
                    email_address: &email,
                    password_digest: &digest,
                    created_at: &now,
                    updated_at: &now,
                })
                .returning(users::id)
                .get_result::<i64>(&mut conn)
                .await
        });

        let id = match inserted {
            Ok(id) => id,
            Err(e) if is_unique_violation(&e) => {
                return Err(ValidationErrors::single("email_address", TAKEN).into())
            }
            Err(e) => return Err(e.into()),
        };

        info!("Created user {}", email);
        self.get(id)
            .await?
            .ok_or(SaveError::Database(DbError::NotFound))
    }

    pub async fn get(&self, id: i64) -> Result<Option<User>, DbError> {
        with_conn!(self.pool, conn => {
            users::table
                .find(id)
                .first::<UserRecord>(&mut conn)
                .await
                .optional()
                .map(|opt| opt.map(User::from))
        })
    }

    /// Look up by email, case-insensitively.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let email = User::normalize_email(email);
        with_conn!(self.pool, conn => {
            users::table
                .filter(users::email_address.eq(&email))
                .first::<UserRecord>(&mut conn)
                .await
                .optional()
                .map(|opt| opt.map(User::from))
        })
    }

    /// The user matching both email and password, if any.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, DbError> {
        Ok(self
            .find_by_email(email)
            .await?
            .filter(|user| verify_password(password, &user.password_digest)))
    }

    pub async fn list(&self) -> Result<Vec<User>, DbError> {
        with_conn!(self.pool, conn => {
            users::table
                .order(users::email_address.asc())
                .load::<UserRecord>(&mut conn)
                .await
                .map(|records| records.into_iter().map(User::from).collect())
        })
    }

    /// Delete a user with their sessions, sites and the sites' documents.
    pub async fn delete(&self, id: i64) -> Result<bool, DbError> {
        with_conn!(self.pool, conn => {
            conn.transaction(|conn| {
                Box::pin(async move {
                    let owned_sites = || sites::table.filter(sites::user_id.eq(id)).select(sites::id);
                    let owned_documents = documents::table
                        .filter(documents::site_id.eq_any(owned_sites()))
                        .select(documents::id);

                    diesel::delete(
                        document_workflow_histories::table
                            .filter(document_workflow_histories::document_id.eq_any(owned_documents)),
                    )
                    .execute(conn)
                    .await?;

                    // Keep other users' audit rows, minus the actor
                    diesel::update(
                        document_workflow_histories::table
                            .filter(document_workflow_histories::user_id.eq(id)),
                    )
                    .set(document_workflow_histories::user_id.eq(None::<i64>))
                    .execute(conn)
                    .await?;

                    diesel::delete(documents::table.filter(documents::site_id.eq_any(owned_sites())))
                        .execute(conn)
                        .await?;
                    diesel::delete(sites::table.filter(sites::user_id.eq(id)))
                        .execute(conn)
                        .await?;
                    diesel::delete(sessions::table.filter(sessions::user_id.eq(id)))
                        .execute(conn)
                        .await?;

                    let rows = diesel::delete(users::table.find(id)).execute(conn).await?;
                    Ok::<_, DbError>(rows > 0)
                })
            })
            .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::DbContext;

    async fn context() -> (tempfile::TempDir, DbContext) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = DbContext::sqlite(&dir.path().join("asap.db"));
        ctx.init_schema().await.unwrap();
        (dir, ctx)
    }

    #[tokio::test]
    async fn test_create_normalizes_and_rejects_duplicates() {
        let (_dir, ctx) = context().await;
        let users = ctx.users();

        let user = users.create("  Admin@Example.ORG ", "password").await.unwrap();
        assert_eq!(user.email_address, "admin@example.org");
        assert_ne!(user.password_digest, "password");

        match users.create("ADMIN@example.org", "other").await {
            Err(SaveError::Invalid(errors)) => {
                assert_eq!(errors.get("email_address"), &[TAKEN.to_string()])
            }
            other => panic!("expected duplicate email error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_validates_format() {
        let (_dir, ctx) = context().await;
        match ctx.users().create("not-an-email", "").await {
            Err(SaveError::Invalid(errors)) => {
                assert!(errors.contains("email_address"));
                assert!(errors.contains("password"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_authenticate() {
        let (_dir, ctx) = context().await;
        let users = ctx.users();
        users.create("staff@example.gov", "s3cret").await.unwrap();

        assert!(users.authenticate("STAFF@example.gov", "s3cret").await.unwrap().is_some());
        assert!(users.authenticate("staff@example.gov", "wrong").await.unwrap().is_none());
        assert!(users.authenticate("nobody@example.gov", "s3cret").await.unwrap().is_none());
    }
}
