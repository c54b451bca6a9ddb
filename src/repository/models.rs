//! Diesel row types and their conversions to domain models.

use diesel::prelude::*;

use super::{format_datetime, parse_datetime, parse_datetime_opt};
use crate::models::{
    ClassificationStatus, Document, DocumentStatus, PolicyReviewStatus, RecommendationStatus,
    Session, Site, User, WorkflowHistory,
};
use crate::schema;

fn bad_column(column: &str, value: &str) -> diesel::result::Error {
    diesel::result::Error::DeserializationError(
        format!("unexpected value {:?} in {}", value, column).into(),
    )
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserRecord {
    pub id: i64,
    pub email_address: String,
    pub password_digest: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::users)]
pub struct NewUser<'a> {
    pub email_address: &'a str,
    pub password_digest: &'a str,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

impl From<UserRecord> for User {
    fn from(r: UserRecord) -> Self {
        User {
            id: r.id,
            email_address: r.email_address,
            password_digest: r.password_digest,
            created_at: parse_datetime(&r.created_at),
            updated_at: parse_datetime(&r.updated_at),
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::sessions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SessionRecord {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::sessions)]
pub struct NewSession<'a> {
    pub user_id: i64,
    pub token: &'a str,
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

impl From<SessionRecord> for Session {
    fn from(r: SessionRecord) -> Self {
        Session {
            id: r.id,
            user_id: r.user_id,
            token: r.token,
            ip_address: r.ip_address,
            user_agent: r.user_agent,
            created_at: parse_datetime(&r.created_at),
            updated_at: parse_datetime(&r.updated_at),
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::sites)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SiteRecord {
    pub id: i64,
    pub name: String,
    pub location: String,
    pub primary_url: String,
    pub user_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::sites)]
pub struct NewSite<'a> {
    pub name: &'a str,
    pub location: &'a str,
    pub primary_url: &'a str,
    pub user_id: i64,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

impl From<SiteRecord> for Site {
    fn from(r: SiteRecord) -> Self {
        Site {
            id: r.id,
            name: r.name,
            location: r.location,
            primary_url: r.primary_url,
            user_id: r.user_id,
            created_at: parse_datetime(&r.created_at),
            updated_at: parse_datetime(&r.updated_at),
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::documents)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DocumentRecord {
    pub id: i64,
    pub site_id: i64,
    pub file_name: String,
    pub url: String,
    pub file_size: Option<i64>,
    pub source: Option<String>,
    pub document_status: String,
    pub classification_status: String,
    pub policy_review_status: String,
    pub recommendation_status: String,
    pub status: Option<String>,
    pub document_category: Option<String>,
    pub document_category_confidence: Option<f64>,
    pub accessibility_recommendation: Option<String>,
    pub accessibility_action: Option<String>,
    pub action_taken_on: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub producer: Option<String>,
    pub pdf_version: Option<String>,
    pub number_of_pages: Option<i32>,
    pub last_modified: Option<String>,
    pub recommended_category: Option<String>,
    pub category_confidence: Option<f64>,
    pub approved_category: Option<String>,
    pub changed_category: Option<String>,
    pub recommended_accessibility_action: Option<String>,
    pub accessibility_confidence: Option<f64>,
    pub approved_accessibility_action: Option<String>,
    pub changed_accessibility_action: Option<String>,
    pub notes: Option<String>,
    pub summary: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<DocumentRecord> for Document {
    type Error = diesel::result::Error;

    fn try_from(r: DocumentRecord) -> Result<Self, Self::Error> {
        Ok(Document {
            id: r.id,
            site_id: r.site_id,
            file_name: r.file_name,
            url: r.url,
            file_size: r.file_size,
            source: r.source,
            document_status: DocumentStatus::from_str(&r.document_status)
                .ok_or_else(|| bad_column("document_status", &r.document_status))?,
            classification_status: ClassificationStatus::from_str(&r.classification_status)
                .ok_or_else(|| bad_column("classification_status", &r.classification_status))?,
            policy_review_status: PolicyReviewStatus::from_str(&r.policy_review_status)
                .ok_or_else(|| bad_column("policy_review_status", &r.policy_review_status))?,
            recommendation_status: RecommendationStatus::from_str(&r.recommendation_status)
                .ok_or_else(|| bad_column("recommendation_status", &r.recommendation_status))?,
            status: r.status,
            document_category: r.document_category,
            document_category_confidence: r.document_category_confidence,
            accessibility_recommendation: r.accessibility_recommendation,
            accessibility_action: r.accessibility_action,
            action_taken_on: parse_datetime_opt(r.action_taken_on),
            title: r.title,
            author: r.author,
            subject: r.subject,
            keywords: r.keywords,
            creation_date: parse_datetime_opt(r.creation_date),
            modification_date: parse_datetime_opt(r.modification_date),
            producer: r.producer,
            pdf_version: r.pdf_version,
            number_of_pages: r.number_of_pages,
            last_modified: parse_datetime_opt(r.last_modified),
            recommended_category: r.recommended_category,
            category_confidence: r.category_confidence,
            approved_category: r.approved_category,
            changed_category: r.changed_category,
            recommended_accessibility_action: r.recommended_accessibility_action,
            accessibility_confidence: r.accessibility_confidence,
            approved_accessibility_action: r.approved_accessibility_action,
            changed_accessibility_action: r.changed_accessibility_action,
            notes: r.notes,
            summary: r.summary,
            created_at: parse_datetime(&r.created_at),
            updated_at: parse_datetime(&r.updated_at),
        })
    }
}

/// Every document column except the key, for inserts and full-row updates.
#[derive(Insertable, AsChangeset, Debug)]
#[diesel(table_name = schema::documents)]
#[diesel(treat_none_as_null = true)]
pub struct DocumentValues {
    pub site_id: i64,
    pub file_name: String,
    pub url: String,
    pub file_size: Option<i64>,
    pub source: Option<String>,
    pub document_status: String,
    pub classification_status: String,
    pub policy_review_status: String,
    pub recommendation_status: String,
    pub status: Option<String>,
    pub document_category: Option<String>,
    pub document_category_confidence: Option<f64>,
    pub accessibility_recommendation: Option<String>,
    pub accessibility_action: Option<String>,
    pub action_taken_on: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub producer: Option<String>,
    pub pdf_version: Option<String>,
    pub number_of_pages: Option<i32>,
    pub last_modified: Option<String>,
    pub recommended_category: Option<String>,
    pub category_confidence: Option<f64>,
    pub approved_category: Option<String>,
    pub changed_category: Option<String>,
    pub recommended_accessibility_action: Option<String>,
    pub accessibility_confidence: Option<f64>,
    pub approved_accessibility_action: Option<String>,
    pub changed_accessibility_action: Option<String>,
    pub notes: Option<String>,
    pub summary: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Document> for DocumentValues {
    fn from(d: &Document) -> Self {
        DocumentValues {
            site_id: d.site_id,
            file_name: d.file_name.clone(),
            url: d.url.clone(),
            file_size: d.file_size,
            source: d.source.clone(),
            document_status: d.document_status.as_str().to_string(),
            classification_status: d.classification_status.as_str().to_string(),
            policy_review_status: d.policy_review_status.as_str().to_string(),
            recommendation_status: d.recommendation_status.as_str().to_string(),
            status: d.status.clone(),
            document_category: d.document_category.clone(),
            document_category_confidence: d.document_category_confidence,
            accessibility_recommendation: d.accessibility_recommendation.clone(),
            accessibility_action: d.accessibility_action.clone(),
            action_taken_on: d.action_taken_on.as_ref().map(format_datetime),
            title: d.title.clone(),
            author: d.author.clone(),
            subject: d.subject.clone(),
            keywords: d.keywords.clone(),
            creation_date: d.creation_date.as_ref().map(format_datetime),
            modification_date: d.modification_date.as_ref().map(format_datetime),
            producer: d.producer.clone(),
            pdf_version: d.pdf_version.clone(),
            number_of_pages: d.number_of_pages,
            last_modified: d.last_modified.as_ref().map(format_datetime),
            recommended_category: d.recommended_category.clone(),
            category_confidence: d.category_confidence,
            approved_category: d.approved_category.clone(),
            changed_category: d.changed_category.clone(),
            recommended_accessibility_action: d.recommended_accessibility_action.clone(),
            accessibility_confidence: d.accessibility_confidence,
            approved_accessibility_action: d.approved_accessibility_action.clone(),
            changed_accessibility_action: d.changed_accessibility_action.clone(),
            notes: d.notes.clone(),
            summary: d.summary.clone(),
            created_at: format_datetime(&d.created_at),
            updated_at: format_datetime(&d.updated_at),
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::document_workflow_histories)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WorkflowHistoryRecord {
    pub id: i64,
    pub document_id: i64,
    pub user_id: Option<i64>,
    pub status_type: String,
    pub from_status: String,
    pub to_status: String,
    pub action_type: String,
    pub metadata: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::document_workflow_histories)]
pub struct NewWorkflowHistoryRow<'a> {
    pub document_id: i64,
    pub user_id: Option<i64>,
    pub status_type: &'a str,
    pub from_status: &'a str,
    pub to_status: &'a str,
    pub action_type: &'a str,
    pub metadata: &'a str,
    pub notes: Option<&'a str>,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

impl From<WorkflowHistoryRecord> for WorkflowHistory {
    fn from(r: WorkflowHistoryRecord) -> Self {
        WorkflowHistory {
            id: r.id,
            document_id: r.document_id,
            user_id: r.user_id,
            status_type: r.status_type,
            from_status: r.from_status,
            to_status: r.to_status,
            action_type: r.action_type,
            metadata: serde_json::from_str(&r.metadata)
                .ok()
                .filter(serde_json::Value::is_object)
                .unwrap_or_else(|| serde_json::json!({})),
            notes: r.notes,
            created_at: parse_datetime(&r.created_at),
            updated_at: parse_datetime(&r.updated_at),
        }
    }
}
