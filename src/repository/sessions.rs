//! Login sessions keyed by an opaque cookie token.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::format_datetime;
use super::models::{NewSession, SessionRecord, UserRecord};
use super::pool::{DbError, DbPool};
use crate::models::{Session, User};
use crate::schema::{sessions, users};
use crate::with_conn;

#[derive(Clone)]
pub struct SessionRepository {
    pool: DbPool,
}

impl SessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Start a session for `user_id` with a fresh random token.
    pub async fn create(
        &self,
        user_id: i64,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<Session, DbError> {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let now = format_datetime(&Utc::now());

        let id = with_conn!(self.pool, conn => {
            diesel::insert_into(sessions::table)
                .values(&NewSession {
                    user_id,
                    token: &token,
                    ip_address,
                    user_agent,
                    created_at: &now,
                    updated_at: &now,
                })
                .returning(sessions::id)
                .get_result::<i64>(&mut conn)
                .await
        })?;

        let now = Utc::now();
        Ok(Session {
            id,
            user_id,
            token,
            ip_address: ip_address.map(str::to_string),
            user_agent: user_agent.map(str::to_string),
            created_at: now,
            updated_at: now,
        })
    }

    /// Resolve a cookie token to its session and user.
    pub async fn find_by_token(&self, token: &str) -> Result<Option<(Session, User)>, DbError> {
        with_conn!(self.pool, conn => {
            sessions::table
                .inner_join(users::table)
                .filter(sessions::token.eq(token))
                .select((SessionRecord::as_select(), UserRecord::as_select()))
                .first::<(SessionRecord, UserRecord)>(&mut conn)
                .await
                .optional()
                .map(|opt| opt.map(|(s, u)| (Session::from(s), User::from(u))))
        })
    }

    pub async fn delete(&self, token: &str) -> Result<bool, DbError> {
        with_conn!(self.pool, conn => {
            let rows = diesel::delete(sessions::table.filter(sessions::token.eq(token)))
                .execute(&mut conn)
                .await?;
            Ok(rows > 0)
        })
    }

    pub async fn count_for_user(&self, user_id: i64) -> Result<i64, DbError> {
        use diesel::dsl::count_star;
        with_conn!(self.pool, conn => {
            sessions::table
                .filter(sessions::user_id.eq(user_id))
                .select(count_star())
                .get_result::<i64>(&mut conn)
                .await
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::repository::DbContext;

    #[tokio::test]
    async fn test_session_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = DbContext::sqlite(&dir.path().join("asap.db"));
        ctx.init_schema().await.unwrap();

        let user = ctx.users().create("a@example.gov", "pw").await.unwrap();
        let session = ctx
            .sessions()
            .create(user.id, Some("127.0.0.1"), Some("test-agent"))
            .await
            .unwrap();
        assert_eq!(session.token.len(), 32);

        let (found, owner) = ctx.sessions().find_by_token(&session.token).await.unwrap().unwrap();
        assert_eq!(found.id, session.id);
        assert_eq!(owner.email_address, "a@example.gov");
        assert_eq!(found.ip_address.as_deref(), Some("127.0.0.1"));

        assert!(ctx.sessions().delete(&session.token).await.unwrap());
        assert!(ctx.sessions().find_by_token(&session.token).await.unwrap().is_none());
        assert_eq!(ctx.sessions().count_for_user(user.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_user_delete_removes_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = DbContext::sqlite(&dir.path().join("asap.db"));
        ctx.init_schema().await.unwrap();

        let user = ctx.users().create("b@example.gov", "pw").await.unwrap();
        let session = ctx.sessions().create(user.id, None, None).await.unwrap();
        assert!(ctx.users().delete(user.id).await.unwrap());
        assert!(ctx.sessions().find_by_token(&session.token).await.unwrap().is_none());
    }
}
