//! Workflow history rows.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::format_datetime;
use super::models::{NewWorkflowHistoryRow, WorkflowHistoryRecord};
use super::pool::{DbError, DbPool};
use super::SaveError;
use crate::models::{NewWorkflowHistory, WorkflowHistory};
use crate::schema::document_workflow_histories;
use crate::with_conn;

#[derive(Clone)]
pub struct WorkflowHistoryRepository {
    pool: DbPool,
}

impl WorkflowHistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// A document's history, newest first.
    pub async fn list_for_document(&self, document_id: i64) -> Result<Vec<WorkflowHistory>, DbError> {
        with_conn!(self.pool, conn => {
            document_workflow_histories::table
                .filter(document_workflow_histories::document_id.eq(document_id))
                .order((
                    document_workflow_histories::created_at.desc(),
                    document_workflow_histories::id.desc(),
                ))
                .load::<WorkflowHistoryRecord>(&mut conn)
                .await
                .map(|records| records.into_iter().map(WorkflowHistory::from).collect())
        })
    }

    /// Record an entry outside of a workflow action, e.g. an imported audit row.
    pub async fn create(&self, entry: &NewWorkflowHistory) -> Result<WorkflowHistory, SaveError> {
        entry.validate()?;
        let metadata = entry.metadata_json();
        let now = Utc::now();
        let stamp = format_datetime(&now);

        let id = with_conn!(self.pool, conn => {
            diesel::insert_into(document_workflow_histories::table)
                .values(&NewWorkflowHistoryRow {
                    document_id: entry.document_id,
                    user_id: entry.user_id,
                    status_type: &entry.status_type,
                    from_status: &entry.from_status,
                    to_status: &entry.to_status,
                    action_type: &entry.action_type,
                    metadata: &metadata,
                    notes: entry.notes.as_deref(),
                    created_at: &stamp,
                    updated_at: &stamp,
                })
                .returning(document_workflow_histories::id)
                .get_result::<i64>(&mut conn)
                .await
        })?;

        Ok(WorkflowHistory {
            id,
            document_id: entry.document_id,
            user_id: entry.user_id,
            status_type: entry.status_type.clone(),
            from_status: entry.from_status.clone(),
            to_status: entry.to_status.clone(),
            action_type: entry.action_type.clone(),
            metadata: serde_json::from_str(&metadata).unwrap_or_else(|_| serde_json::json!({})),
            notes: entry.notes.clone(),
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, SiteForm};
    use crate::repository::DbContext;

    #[tokio::test]
    async fn test_create_and_list_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = DbContext::sqlite(&dir.path().join("asap.db"));
        ctx.init_schema().await.unwrap();
        let user = ctx.users().create("a@example.gov", "pw").await.unwrap();
        let site = ctx
            .sites()
            .create(
                user.id,
                &SiteForm {
                    name: Some("S".into()),
                    location: Some("L".into()),
                    primary_url: Some("https://s.gov".into()),
                },
            )
            .await
            .unwrap();
        let doc = ctx
            .documents()
            .create(&Document::new(site.id, "https://s.gov/a.pdf".into(), "a.pdf".into()))
            .await
            .unwrap();

        let entry = |from: &str, to: &str| NewWorkflowHistory {
            document_id: doc.id,
            user_id: Some(user.id),
            status_type: "document_status".into(),
            from_status: from.into(),
            to_status: to.into(),
            action_type: "import".into(),
            metadata: serde_json::Value::Null,
            notes: None,
        };
        let repo = ctx.histories();
        repo.create(&entry("discovered", "downloaded")).await.unwrap();
        let second = repo.create(&entry("downloaded", "discovered")).await.unwrap();
        assert_eq!(second.metadata, serde_json::json!({}));

        let listed = repo.list_for_document(doc.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);

        assert!(matches!(repo.create(&entry("", "x")).await, Err(SaveError::Invalid(_))));
    }
}
