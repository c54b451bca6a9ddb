//! Sites and bulk document discovery.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::Deserialize;
use tracing::{debug, info};

use super::format_datetime;
use super::models::{DocumentRecord, DocumentValues, NewSite, SiteRecord};
use super::pool::{DbError, DbPool};
use super::util::is_unique_violation;
use super::SaveError;
use crate::models::{
    file_name_from_url, Document, DocumentStatus, Site, SiteConflicts, SiteForm,
};
use crate::schema::{document_workflow_histories, documents, sites};
use crate::with_conn;

/// One entry of a discovery batch.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveredItem {
    pub url: String,
    pub modification_date: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SiteRepository {
    pool: DbPool,
}

impl SiteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: i64) -> Result<Option<Site>, DbError> {
        with_conn!(self.pool, conn => {
            sites::table
                .find(id)
                .first::<SiteRecord>(&mut conn)
                .await
                .optional()
                .map(|opt| opt.map(Site::from))
        })
    }

    /// A user's sites, newest first.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Site>, DbError> {
        with_conn!(self.pool, conn => {
            sites::table
                .filter(sites::user_id.eq(user_id))
                .order((sites::created_at.desc(), sites::id.desc()))
                .load::<SiteRecord>(&mut conn)
                .await
                .map(|records| records.into_iter().map(Site::from).collect())
        })
    }

    pub async fn list_all(&self) -> Result<Vec<Site>, DbError> {
        with_conn!(self.pool, conn => {
            sites::table
                .order(sites::id.asc())
                .load::<SiteRecord>(&mut conn)
                .await
                .map(|records| records.into_iter().map(Site::from).collect())
        })
    }

    /// Which per-user uniqueness rules `form` would break.
    async fn conflicts(
        &self,
        user_id: i64,
        form: &SiteForm,
        exclude_id: Option<i64>,
    ) -> Result<SiteConflicts, DbError> {
        let (name, location, primary_url) = form.values();
        let exclude_id = exclude_id.unwrap_or(0);

        with_conn!(self.pool, conn => {
            let url_matches: i64 = sites::table
                .filter(sites::user_id.eq(user_id))
                .filter(sites::primary_url.eq(&primary_url))
                .filter(sites::id.ne(exclude_id))
                .count()
                .get_result(&mut conn)
                .await?;
            let name_matches: i64 = sites::table
                .filter(sites::user_id.eq(user_id))
                .filter(sites::location.eq(&location))
                .filter(sites::name.eq(&name))
                .filter(sites::id.ne(exclude_id))
                .count()
                .get_result(&mut conn)
                .await?;
            Ok(SiteConflicts {
                primary_url_taken: url_matches > 0,
                name_taken: name_matches > 0,
            })
        })
    }

    pub async fn create(&self, user_id: i64, form: &SiteForm) -> Result<Site, SaveError> {
        form.validate()?;
        self.conflicts(user_id, form, None)
            .await?
            .into_errors()
            .into_result()?;

        let (name, location, primary_url) = form.values();
        let now = format_datetime(&Utc::now());

        let inserted = with_conn!(self.pool, conn => {
            diesel::insert_into(sites::table)
                .values(&NewSite {
                    name: &name,
                    location: &location,
                    primary_url: &primary_url,
                    user_id,
                    created_at: &now,
                    updated_at: &now,
                })
                .returning(sites::id)
                .get_result::<i64>(&mut conn)
                .await
        });
        let id = match inserted {
            Ok(id) => id,
            Err(e) => return Err(self.unique_to_taken(e, user_id, form, None).await),
        };

        info!("Created site {} ({})", name, primary_url);
        self.get(id).await?.ok_or(SaveError::Database(DbError::NotFound))
    }

    /// Turn a unique violation that slipped past `conflicts` into field errors.
    async fn unique_to_taken(
        &self,
        err: DbError,
        user_id: i64,
        form: &SiteForm,
        exclude_id: Option<i64>,
    ) -> SaveError {
        if !is_unique_violation(&err) {
            return SaveError::Database(err);
        }
        let mut conflicts = violated_site_rules(&err);
        if !conflicts.primary_url_taken && !conflicts.name_taken {
            conflicts = match self.conflicts(user_id, form, exclude_id).await {
                Ok(found) => found,
                Err(e) => return SaveError::Database(e),
            };
        }
        SaveError::Invalid(conflicts.into_errors())
    }

    /// Apply submitted fields over the stored site.
    pub async fn update(&self, site: &Site, form: &SiteForm) -> Result<Site, SaveError> {
        let merged = form.merged_with(site);
        merged.validate()?;
        self.conflicts(site.user_id, &merged, Some(site.id))
            .await?
            .into_errors()
            .into_result()?;

        let (name, location, primary_url) = merged.values();
        let now = format_datetime(&Utc::now());
        let id = site.id;

        let updated = with_conn!(self.pool, conn => {
            diesel::update(sites::table.find(id))
                .set((
                    sites::name.eq(&name),
                    sites::location.eq(&location),
                    sites::primary_url.eq(&primary_url),
                    sites::updated_at.eq(&now),
                ))
                .execute(&mut conn)
                .await
        });
        if let Err(e) = updated {
            return Err(self.unique_to_taken(e, site.user_id, &merged, Some(id)).await);
        }

        self.get(id).await?.ok_or(SaveError::Database(DbError::NotFound))
    }

    /// Delete a site together with its documents and their histories.
    pub async fn delete(&self, id: i64) -> Result<bool, DbError> {
        with_conn!(self.pool, conn => {
            conn.transaction(|conn| {
                Box::pin(async move {
                    let site_documents = documents::table
                        .filter(documents::site_id.eq(id))
                        .select(documents::id);
                    diesel::delete(
                        document_workflow_histories::table
                            .filter(document_workflow_histories::document_id.eq_any(site_documents)),
                    )
                    .execute(conn)
                    .await?;
                    diesel::delete(documents::table.filter(documents::site_id.eq(id)))
                        .execute(conn)
                        .await?;
                    let rows = diesel::delete(sites::table.find(id)).execute(conn).await?;
                    Ok::<_, DbError>(rows > 0)
                })
            })
            .await
        })
    }

    /// Upsert documents reported for `site` by URL.
    ///
    /// A known URL is touched only when its modification date differs at
    /// whole-second precision, in which case the date is replaced and the
    /// document goes back to `discovered`. Unknown URLs become new documents.
    /// Results follow input order.
    pub async fn discover_documents(
        &self,
        site: &Site,
        items: &[DiscoveredItem],
    ) -> Result<Vec<Document>, DbError> {
        let site_id = site.id;

        with_conn!(self.pool, conn => {
            conn.transaction(|conn| {
                let items = items.to_vec();
                Box::pin(async move {
                    let mut results = Vec::with_capacity(items.len());

                    for item in items {
                        let existing = documents::table
                            .filter(documents::site_id.eq(site_id))
                            .filter(documents::url.eq(&item.url))
                            .order(documents::id.asc())
                            .first::<DocumentRecord>(conn)
                            .await
                            .optional()?
                            .map(Document::try_from)
                            .transpose()?;

                        let id = match existing {
                            Some(doc) => {
                                let unchanged = doc
                                    .modification_date
                                    .is_some_and(|d| d.timestamp() == item.modification_date.timestamp());
                                if unchanged {
                                    debug!("Unchanged: {}", item.url);
                                    results.push(doc);
                                    continue;
                                }
                                diesel::update(documents::table.find(doc.id))
                                    .set((
                                        documents::modification_date
                                            .eq(format_datetime(&item.modification_date)),
                                        documents::document_status
                                            .eq(DocumentStatus::Discovered.as_str()),
                                        documents::updated_at.eq(format_datetime(&Utc::now())),
                                    ))
                                    .execute(conn)
                                    .await?;
                                debug!("Updated: {}", item.url);
                                doc.id
                            }
                            None => {
                                let mut doc =
                                    Document::new(site_id, item.url.clone(), file_name_from_url(&item.url));
                                doc.modification_date = Some(item.modification_date);
                                let id = diesel::insert_into(documents::table)
                                    .values(&DocumentValues::from(&doc))
                                    .returning(documents::id)
                                    .get_result::<i64>(conn)
                                    .await?;
                                debug!("Created: {}", item.url);
                                id
                            }
                        };

                        let stored = documents::table
                            .find(id)
                            .first::<DocumentRecord>(conn)
                            .await
                            .and_then(Document::try_from)?;
                        results.push(stored);
                    }

                    Ok::<_, DbError>(results)
                })
            })
            .await
        })
    }
}

/// Map a unique-index race that slipped past the pre-check to a field error.
/// Which site uniqueness rules a database error names, by index or column.
fn violated_site_rules(err: &DbError) -> SiteConflicts {
    let DbError::DatabaseError(_, info) = err else {
        return SiteConflicts::default();
    };
    let text = format!("{} {}", info.message(), info.constraint_name().unwrap_or_default());
    SiteConflicts {
        primary_url_taken: text.contains("primary_url"),
        name_taken: text.contains("location"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TAKEN;
    use crate::repository::DbContext;
    use chrono::TimeZone;

    async fn setup() -> (tempfile::TempDir, DbContext, i64) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = DbContext::sqlite(&dir.path().join("asap.db"));
        ctx.init_schema().await.unwrap();
        let user = ctx.users().create("owner@example.gov", "pw").await.unwrap();
        (dir, ctx, user.id)
    }

    fn form(name: &str, location: &str, url: &str) -> SiteForm {
        SiteForm {
            name: Some(name.into()),
            location: Some(location.into()),
            primary_url: Some(url.into()),
        }
    }

    #[test]
    fn test_violated_site_rules() {
        use diesel::result::DatabaseErrorKind;

        let violation = |message: &str| {
            DbError::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                Box::new(message.to_string()),
            )
        };

        let url = violated_site_rules(&violation(
            "UNIQUE constraint failed: sites.user_id, sites.primary_url",
        ));
        assert!(url.primary_url_taken);
        assert!(!url.name_taken);

        let name = violated_site_rules(&violation(
            "UNIQUE constraint failed: sites.user_id, sites.location, sites.name",
        ));
        assert!(!name.primary_url_taken);
        assert!(name.name_taken);

        let unknown = violated_site_rules(&DbError::NotFound);
        assert!(!unknown.primary_url_taken && !unknown.name_taken);
    }

    #[tokio::test]
    async fn test_uniqueness_per_user() {
        let (_dir, ctx, user_id) = setup().await;
        let sites = ctx.sites();
        sites
            .create(user_id, &form("City", "Town, ST", "https://www.city.gov"))
            .await
            .unwrap();

        match sites
            .create(user_id, &form("Other", "Elsewhere", "https://www.city.gov"))
            .await
        {
            Err(SaveError::Invalid(e)) => assert_eq!(e.get("primary_url"), &[TAKEN.to_string()]),
            other => panic!("expected taken url, got {:?}", other),
        }

        match sites
            .create(user_id, &form("City", "Town, ST", "https://other.city.gov"))
            .await
        {
            Err(SaveError::Invalid(e)) => assert_eq!(e.get("name"), &[TAKEN.to_string()]),
            other => panic!("expected taken name, got {:?}", other),
        }

        // Same name in another location is fine, as is another user's copy
        sites
            .create(user_id, &form("City", "Other, ST", "https://third.city.gov"))
            .await
            .unwrap();
        let other = ctx.users().create("other@example.gov", "pw").await.unwrap();
        sites
            .create(other.id, &form("City", "Town, ST", "https://www.city.gov"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_and_list_order() {
        let (_dir, ctx, user_id) = setup().await;
        let sites = ctx.sites();
        let first = sites
            .create(user_id, &form("A", "X", "https://a.gov"))
            .await
            .unwrap();
        let second = sites
            .create(user_id, &form("B", "X", "https://b.gov"))
            .await
            .unwrap();

        let listed = sites.list_for_user(user_id).await.unwrap();
        assert_eq!(listed.iter().map(|s| s.id).collect::<Vec<_>>(), vec![second.id, first.id]);

        let renamed = sites
            .update(&first, &SiteForm { name: Some("A2".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(renamed.name, "A2");
        assert_eq!(renamed.primary_url, "https://a.gov");

        let clash = sites
            .update(&first, &SiteForm { primary_url: Some("https://b.gov".into()), ..Default::default() })
            .await;
        assert!(matches!(clash, Err(SaveError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_discover_documents() {
        let (_dir, ctx, user_id) = setup().await;
        let site = ctx
            .sites()
            .create(user_id, &form("City", "Town", "https://www.city.gov"))
            .await
            .unwrap();
        let when = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        let created = ctx
            .sites()
            .discover_documents(
                &site,
                &[DiscoveredItem {
                    url: "https://www.city.gov/files/Budget%202024.pdf".into(),
                    modification_date: when,
                }],
            )
            .await
            .unwrap();
        assert_eq!(created.len(), 1);
        let doc = &created[0];
        assert_eq!(doc.file_name, "Budget 2024.pdf");
        assert_eq!(doc.document_status, DocumentStatus::Discovered);
        assert_eq!(doc.modification_date, Some(when));

        // Move it along, then report the same date (sub-second noise only)
        ctx.documents()
            .apply_action(doc.id, &crate::workflow::Action::Download, None, None)
            .await
            .unwrap();
        let same = ctx
            .sites()
            .discover_documents(
                &site,
                &[DiscoveredItem {
                    url: doc.url.clone(),
                    modification_date: when + chrono::Duration::milliseconds(300),
                }],
            )
            .await
            .unwrap();
        assert_eq!(same[0].id, doc.id);
        assert_eq!(same[0].document_status, DocumentStatus::Downloaded);

        // A newer date resets the status
        let later = when + chrono::Duration::days(1);
        let changed = ctx
            .sites()
            .discover_documents(
                &site,
                &[
                    DiscoveredItem { url: "https://www.city.gov/new.pdf".into(), modification_date: when },
                    DiscoveredItem { url: doc.url.clone(), modification_date: later },
                ],
            )
            .await
            .unwrap();
        assert_eq!(changed[0].file_name, "new.pdf");
        assert_eq!(changed[1].id, doc.id);
        assert_eq!(changed[1].document_status, DocumentStatus::Discovered);
        assert_eq!(changed[1].modification_date, Some(later));
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let (_dir, ctx, user_id) = setup().await;
        let site = ctx
            .sites()
            .create(user_id, &form("City", "Town", "https://www.city.gov"))
            .await
            .unwrap();
        let docs = ctx
            .sites()
            .discover_documents(
                &site,
                &[DiscoveredItem { url: "https://www.city.gov/a.pdf".into(), modification_date: Utc::now() }],
            )
            .await
            .unwrap();
        ctx.documents()
            .apply_action(docs[0].id, &crate::workflow::Action::Download, Some(user_id), None)
            .await
            .unwrap();

        assert!(ctx.sites().delete(site.id).await.unwrap());
        assert!(ctx.sites().get(site.id).await.unwrap().is_none());
        assert!(ctx.documents().get(docs[0].id).await.unwrap().is_none());
        assert!(ctx.histories().list_for_document(docs[0].id).await.unwrap().is_empty());
    }
}
