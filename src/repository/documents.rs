//! Documents: filtered listings, triage edits and workflow transitions.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::{debug, info};

use super::format_datetime;
use super::models::{DocumentRecord, DocumentValues, NewWorkflowHistoryRow};
use super::pool::{DbError, DbPool};
use super::SaveError;
use crate::models::{
    Document, TriageStatus, ValidationErrors, WorkflowHistory, CONTENT_TYPES, DECISION_TYPES,
    NOT_INCLUDED,
};
use crate::schema::{document_workflow_histories, documents, sites};
use crate::with_conn;
use crate::workflow::{self, Action, TransitionError};

/// Page size of the per-site document listing.
pub const DOCUMENTS_PER_PAGE: i64 = 20;

// SQL lower(), available on both backends
diesel::define_sql_function! {
    fn lower(x: diesel::sql_types::Text) -> diesel::sql_types::Text;
}

/// Sortable listing columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DocumentSort {
    FileName,
    Source,
    #[default]
    ModificationDate,
}

impl DocumentSort {
    /// Unknown or missing names fall back to modification date.
    pub fn from_param(s: Option<&str>) -> Self {
        match s {
            Some("file_name") => Self::FileName,
            Some("source") => Self::Source,
            _ => Self::ModificationDate,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileName => "file_name",
            Self::Source => "source",
            Self::ModificationDate => "modification_date",
        }
    }
}

/// Filters, sort and page for a site's document listing.
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    /// `in_review`, `done`, blank for untriaged; anything else is ignored.
    pub status: Option<String>,
    /// Case-insensitive substring of the file name.
    pub filename: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub sort: DocumentSort,
    pub descending: bool,
    /// 1-based.
    pub page: i64,
}

/// One page of a listing.
#[derive(Debug, Clone)]
pub struct DocumentPage {
    pub documents: Vec<Document>,
    pub page: i64,
    pub per_page: i64,
    /// Rows matching the filters across all pages.
    pub total: i64,
}

impl DocumentPage {
    pub fn total_pages(&self) -> i64 {
        if self.total == 0 {
            0
        } else {
            (self.total + self.per_page - 1) / self.per_page
        }
    }
}

/// Why a workflow action could not be recorded.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("document not found")]
    NotFound,
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("database error: {0}")]
    Database(#[from] DbError),
}

/// Boxed `documents` query for one site with the listing filters applied.
macro_rules! filtered_documents {
    ($site_id:expr, $query:expr) => {{
        let q: &DocumentQuery = $query;
        let mut boxed = documents::table
            .filter(documents::site_id.eq($site_id))
            .into_boxed();

        match q.status.as_deref().map(str::trim) {
            Some(s) if TriageStatus::from_str(s).is_some() => {
                boxed = boxed.filter(documents::status.eq(s.to_string()));
            }
            Some("") => {
                boxed = boxed.filter(
                    documents::status
                        .is_null()
                        .or(documents::status.assume_not_null().eq("")),
                );
            }
            _ => {}
        }
        if let Some(name) = q.filename.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            boxed = boxed.filter(lower(documents::file_name).like(format!("%{}%", name.to_lowercase())));
        }
        if let Some(category) = q.category.as_deref().filter(|s| !s.trim().is_empty()) {
            boxed = boxed.filter(documents::document_category.eq(category.to_string()));
        }
        if let Some(start) = q.start_date {
            boxed = boxed.filter(documents::modification_date.ge(format_datetime(&start)));
        }
        if let Some(end) = q.end_date {
            boxed = boxed.filter(documents::modification_date.le(format_datetime(&end)));
        }
        boxed
    }};
}

#[derive(Clone)]
pub struct DocumentRepository {
    pool: DbPool,
}

impl DocumentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: i64) -> Result<Option<Document>, DbError> {
        with_conn!(self.pool, conn => {
            documents::table
                .find(id)
                .first::<DocumentRecord>(&mut conn)
                .await
                .optional()
                .and_then(|opt| opt.map(Document::try_from).transpose())
        })
    }

    /// A document only if it belongs to `site_id`.
    pub async fn get_for_site(&self, site_id: i64, id: i64) -> Result<Option<Document>, DbError> {
        Ok(self.get(id).await?.filter(|d| d.site_id == site_id))
    }

    pub async fn list_for_site(
        &self,
        site_id: i64,
        query: &DocumentQuery,
    ) -> Result<DocumentPage, DbError> {
        let page = query.page.max(1);

        let total = with_conn!(self.pool, conn => {
            filtered_documents!(site_id, query)
                .count()
                .get_result::<i64>(&mut conn)
                .await
        })?;

        let records = with_conn!(self.pool, conn => {
            let mut boxed = filtered_documents!(site_id, query);
            boxed = match (query.sort, query.descending) {
                (DocumentSort::FileName, false) => boxed.order(documents::file_name.asc()),
                (DocumentSort::FileName, true) => boxed.order(documents::file_name.desc()),
                (DocumentSort::Source, false) => boxed.order(documents::source.asc()),
                (DocumentSort::Source, true) => boxed.order(documents::source.desc()),
                (DocumentSort::ModificationDate, false) => {
                    boxed.order(documents::modification_date.asc())
                }
                (DocumentSort::ModificationDate, true) => {
                    boxed.order(documents::modification_date.desc())
                }
            };
            boxed
                .then_order_by(documents::id.asc())
                .limit(DOCUMENTS_PER_PAGE)
                .offset((page - 1) * DOCUMENTS_PER_PAGE)
                .load::<DocumentRecord>(&mut conn)
                .await
        })?;

        let documents = records
            .into_iter()
            .map(Document::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DocumentPage {
            documents,
            page,
            per_page: DOCUMENTS_PER_PAGE,
            total,
        })
    }

    pub async fn count_for_site(&self, site_id: i64) -> Result<i64, DbError> {
        with_conn!(self.pool, conn => {
            documents::table
                .filter(documents::site_id.eq(site_id))
                .count()
                .get_result::<i64>(&mut conn)
                .await
        })
    }

    /// Documents across every site the user owns.
    pub async fn count_for_user(&self, user_id: i64) -> Result<i64, DbError> {
        with_conn!(self.pool, conn => {
            documents::table
                .inner_join(sites::table)
                .filter(sites::user_id.eq(user_id))
                .count()
                .get_result::<i64>(&mut conn)
                .await
        })
    }

    /// Distinct categories in use on a site, sorted.
    pub async fn categories_for_site(&self, site_id: i64) -> Result<Vec<String>, DbError> {
        with_conn!(self.pool, conn => {
            documents::table
                .filter(documents::site_id.eq(site_id))
                .filter(documents::document_category.is_not_null())
                .select(documents::document_category)
                .distinct()
                .order(documents::document_category.asc())
                .load::<Option<String>>(&mut conn)
                .await
                .map(|rows| rows.into_iter().flatten().collect())
        })
    }

    /// Insert a validated document and return it as stored.
    pub async fn create(&self, document: &Document) -> Result<Document, SaveError> {
        document.validate()?;
        let values = DocumentValues::from(document);

        let id = with_conn!(self.pool, conn => {
            diesel::insert_into(documents::table)
                .values(&values)
                .returning(documents::id)
                .get_result::<i64>(&mut conn)
                .await
        })?;

        info!("Created document {} ({})", id, document.url);
        self.get(id)
            .await?
            .ok_or(SaveError::Database(DbError::NotFound))
    }

    /// Set the free-form triage status; blank clears it.
    pub async fn update_status(&self, id: i64, status: Option<&str>) -> Result<bool, DbError> {
        let status = status.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        let now = format_datetime(&Utc::now());
        with_conn!(self.pool, conn => {
            let rows = diesel::update(documents::table.find(id))
                .set((documents::status.eq(status), documents::updated_at.eq(&now)))
                .execute(&mut conn)
                .await?;
            Ok(rows > 0)
        })
    }

    /// Set `document_category` to one of [`CONTENT_TYPES`].
    pub async fn update_category(&self, id: i64, value: &str) -> Result<Option<Document>, SaveError> {
        if !CONTENT_TYPES.contains(&value) {
            return Err(ValidationErrors::single("document_category", NOT_INCLUDED).into());
        }
        let now = format_datetime(&Utc::now());
        with_conn!(self.pool, conn => {
            diesel::update(documents::table.find(id))
                .set((
                    documents::document_category.eq(value),
                    documents::updated_at.eq(&now),
                ))
                .execute(&mut conn)
                .await
        })?;
        Ok(self.get(id).await?)
    }

    /// Set `accessibility_recommendation` to one of [`DECISION_TYPES`].
    pub async fn update_accessibility_recommendation(
        &self,
        id: i64,
        value: &str,
    ) -> Result<Option<Document>, SaveError> {
        if !DECISION_TYPES.contains(&value) {
            return Err(ValidationErrors::single("accessibility_recommendation", NOT_INCLUDED).into());
        }
        let now = format_datetime(&Utc::now());
        with_conn!(self.pool, conn => {
            diesel::update(documents::table.find(id))
                .set((
                    documents::accessibility_recommendation.eq(value),
                    documents::updated_at.eq(&now),
                ))
                .execute(&mut conn)
                .await
        })?;
        Ok(self.get(id).await?)
    }

    pub async fn update_notes(&self, id: i64, notes: Option<&str>) -> Result<bool, DbError> {
        let now = format_datetime(&Utc::now());
        with_conn!(self.pool, conn => {
            let rows = diesel::update(documents::table.find(id))
                .set((documents::notes.eq(notes), documents::updated_at.eq(&now)))
                .execute(&mut conn)
                .await?;
            Ok(rows > 0)
        })
    }

    pub async fn update_summary(&self, id: i64, summary: &str) -> Result<bool, DbError> {
        let now = format_datetime(&Utc::now());
        with_conn!(self.pool, conn => {
            let rows = diesel::update(documents::table.find(id))
                .set((documents::summary.eq(summary), documents::updated_at.eq(&now)))
                .execute(&mut conn)
                .await?;
            Ok(rows > 0)
        })
    }

    /// Apply a workflow action and record its history row atomically.
    pub async fn apply_action(
        &self,
        id: i64,
        action: &Action,
        user_id: Option<i64>,
        notes: Option<String>,
    ) -> Result<(Document, WorkflowHistory), ActionError> {
        with_conn!(self.pool, conn => {
            conn.transaction(|conn| {
                let action = action.clone();
                Box::pin(async move {
                    let mut document = documents::table
                        .find(id)
                        .first::<DocumentRecord>(conn)
                        .await
                        .optional()?
                        .map(Document::try_from)
                        .transpose()?
                        .ok_or(ActionError::NotFound)?;

                    let transition = workflow::apply(&mut document, &action)?;
                    let now = Utc::now();
                    document.updated_at = now;

                    diesel::update(documents::table.find(id))
                        .set(&DocumentValues::from(&document))
                        .execute(conn)
                        .await?;

                    let entry = transition.into_history(id, user_id, notes);
                    let metadata = entry.metadata_json();
                    let stamp = format_datetime(&now);
                    let history_id = diesel::insert_into(document_workflow_histories::table)
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
                        .get_result::<i64>(conn)
                        .await?;

                    debug!(
                        "Document {}: {} {} -> {}",
                        id, entry.status_type, entry.from_status, entry.to_status
                    );

                    let history = WorkflowHistory {
                        id: history_id,
                        document_id: entry.document_id,
                        user_id: entry.user_id,
                        status_type: entry.status_type,
                        from_status: entry.from_status,
                        to_status: entry.to_status,
                        action_type: entry.action_type,
                        metadata: entry.metadata,
                        notes: entry.notes,
                        created_at: now,
                        updated_at: now,
                    };
                    Ok::<_, ActionError>((document, history))
                })
            })
            .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassificationStatus, SiteForm};
    use crate::repository::DbContext;
    use chrono::TimeZone;

    async fn setup() -> (tempfile::TempDir, DbContext, i64) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = DbContext::sqlite(&dir.path().join("asap.db"));
        ctx.init_schema().await.unwrap();
        let user = ctx.users().create("owner@example.gov", "pw").await.unwrap();
        let site = ctx
            .sites()
            .create(
                user.id,
                &SiteForm {
                    name: Some("City".into()),
                    location: Some("Town".into()),
                    primary_url: Some("https://www.city.gov".into()),
                },
            )
            .await
            .unwrap();
        (dir, ctx, site.id)
    }

    async fn add(ctx: &DbContext, site_id: i64, name: &str, day: u32, status: Option<&str>, category: &str) -> Document {
        let mut doc = Document::new(site_id, format!("https://www.city.gov/{}", name), name.to_string());
        doc.modification_date = Some(Utc.with_ymd_and_hms(2024, 5, day, 0, 0, 0).unwrap());
        doc.status = status.map(str::to_string);
        doc.document_category = Some(category.to_string());
        doc.source = Some(format!("https://www.city.gov/page-{}", day));
        ctx.documents().create(&doc).await.unwrap()
    }

    #[tokio::test]
    async fn test_filters_and_sort() {
        let (_dir, ctx, site_id) = setup().await;
        add(&ctx, site_id, "Budget.pdf", 3, Some("in_review"), "Report").await;
        add(&ctx, site_id, "agenda.pdf", 1, None, "Agenda").await;
        add(&ctx, site_id, "minutes.pdf", 2, Some(""), "Agenda").await;
        add(&ctx, site_id, "budget-notes.pdf", 4, Some("done"), "Memo").await;

        let repo = ctx.documents();
        let names = |page: DocumentPage| page.documents.into_iter().map(|d| d.file_name).collect::<Vec<_>>();

        let all = repo.list_for_site(site_id, &DocumentQuery::default()).await.unwrap();
        assert_eq!(all.total, 4);
        assert_eq!(names(all), vec!["agenda.pdf", "minutes.pdf", "Budget.pdf", "budget-notes.pdf"]);

        let q = DocumentQuery { filename: Some("BUDGET".into()), ..Default::default() };
        assert_eq!(repo.list_for_site(site_id, &q).await.unwrap().total, 2);

        let q = DocumentQuery { status: Some(String::new()), ..Default::default() };
        assert_eq!(names(repo.list_for_site(site_id, &q).await.unwrap()), vec!["agenda.pdf", "minutes.pdf"]);

        let q = DocumentQuery { status: Some("done".into()), ..Default::default() };
        assert_eq!(names(repo.list_for_site(site_id, &q).await.unwrap()), vec!["budget-notes.pdf"]);

        let q = DocumentQuery { status: Some("bogus".into()), ..Default::default() };
        assert_eq!(repo.list_for_site(site_id, &q).await.unwrap().total, 4);

        let q = DocumentQuery { category: Some("Agenda".into()), ..Default::default() };
        assert_eq!(repo.list_for_site(site_id, &q).await.unwrap().total, 2);

        let q = DocumentQuery {
            start_date: Some(Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap()),
            end_date: Some(Utc.with_ymd_and_hms(2024, 5, 3, 0, 0, 0).unwrap()),
            ..Default::default()
        };
        assert_eq!(names(repo.list_for_site(site_id, &q).await.unwrap()), vec!["minutes.pdf", "Budget.pdf"]);

        let q = DocumentQuery { sort: DocumentSort::FileName, descending: true, ..Default::default() };
        assert_eq!(names(repo.list_for_site(site_id, &q).await.unwrap())[0], "minutes.pdf");

        let categories = repo.categories_for_site(site_id).await.unwrap();
        assert_eq!(categories, vec!["Agenda", "Memo", "Report"]);
    }

    #[tokio::test]
    async fn test_pagination() {
        let (_dir, ctx, site_id) = setup().await;
        for day in 1..=25 {
            add(&ctx, site_id, &format!("doc-{:02}.pdf", day), day, None, "Unknown").await;
        }
        let repo = ctx.documents();
        let first = repo.list_for_site(site_id, &DocumentQuery { page: 1, ..Default::default() }).await.unwrap();
        assert_eq!(first.documents.len(), 20);
        assert_eq!(first.total_pages(), 2);
        let second = repo.list_for_site(site_id, &DocumentQuery { page: 2, ..Default::default() }).await.unwrap();
        assert_eq!(second.documents.len(), 5);
        assert_eq!(second.documents[0].file_name, "doc-21.pdf");
        assert_eq!(repo.count_for_site(site_id).await.unwrap(), 25);
    }

    #[tokio::test]
    async fn test_field_updates() {
        let (_dir, ctx, site_id) = setup().await;
        let doc = add(&ctx, site_id, "a.pdf", 1, None, "Unknown").await;
        let repo = ctx.documents();

        let updated = repo.update_category(doc.id, "Form").await.unwrap().unwrap();
        assert_eq!(updated.document_category.as_deref(), Some("Form"));
        assert!(matches!(repo.update_category(doc.id, "Permit").await, Err(SaveError::Invalid(_))));

        let updated = repo.update_accessibility_recommendation(doc.id, "Remediate").await.unwrap().unwrap();
        assert_eq!(updated.accessibility_recommendation.as_deref(), Some("Remediate"));

        assert!(repo.update_status(doc.id, Some("in_review")).await.unwrap());
        assert!(repo.update_notes(doc.id, Some("check links")).await.unwrap());
        assert!(repo.update_summary(doc.id, "A budget.").await.unwrap());
        let stored = repo.get(doc.id).await.unwrap().unwrap();
        assert_eq!(stored.status.as_deref(), Some("in_review"));
        assert_eq!(stored.notes.as_deref(), Some("check links"));
        assert_eq!(stored.summary.as_deref(), Some("A budget."));
        assert!(!repo.update_status(9999, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_apply_action_records_history() {
        let (_dir, ctx, site_id) = setup().await;
        let doc = add(&ctx, site_id, "a.pdf", 1, None, "Unknown").await;
        let repo = ctx.documents();

        let action = Action::CompleteClassification { category: "Form".into(), confidence: 0.9 };
        let (updated, history) = repo.apply_action(doc.id, &action, None, Some("auto".into())).await.unwrap();
        assert_eq!(updated.classification_status, ClassificationStatus::AutoClassified);
        assert_eq!(history.action_type, "complete_classification");
        assert_eq!(history.metadata["category"], "Form");

        let stored = repo.get(doc.id).await.unwrap().unwrap();
        assert_eq!(stored.recommended_category.as_deref(), Some("Form"));
        assert_eq!(stored.category_confidence, Some(0.9));

        // Illegal transition: nothing written
        let err = repo.apply_action(doc.id, &action, None, None).await.unwrap_err();
        assert!(matches!(err, ActionError::Transition(_)));
        assert_eq!(ctx.histories().list_for_document(doc.id).await.unwrap().len(), 1);

        assert!(matches!(
            repo.apply_action(9999, &Action::Download, None, None).await,
            Err(ActionError::NotFound)
        ));
    }
}
