//! Typed response bodies, shared by handlers and the OpenAPI document.

use axum::{http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Document, Site, WorkflowHistory};
use crate::storage::FileVersion;
use crate::utils::{document_source, DocumentSource};

/// Error envelope:
/// ```json
/// { "error": true, "context": {}, "data": { "message": "..." } }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<C: Serialize, T: Serialize> {
    pub error: bool,
    pub context: C,
    pub data: T,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct EmptyContext {}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorData {
    pub message: String,
}

impl ApiResponse<EmptyContext, ErrorData> {
    pub fn error(status: StatusCode, message: impl Into<String>) -> impl IntoResponse {
        (
            status,
            Json(ApiResponse {
                error: true,
                context: EmptyContext {},
                data: ErrorData {
                    message: message.into(),
                },
            }),
        )
    }
}

/// Public form of a site: owner and timestamps omitted, bucket location added.
#[derive(Debug, Serialize, ToSchema)]
pub struct SiteJson {
    pub id: i64,
    pub name: String,
    pub location: String,
    pub primary_url: String,
    pub s3_endpoint: Option<String>,
}

impl From<&Site> for SiteJson {
    fn from(site: &Site) -> Self {
        Self {
            id: site.id,
            name: site.name.clone(),
            location: site.location.clone(),
            primary_url: site.primary_url.clone(),
            s3_endpoint: site.s3_endpoint(),
        }
    }
}

/// A document as listed in the dashboard and returned by discovery.
#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentJson {
    #[serde(flatten)]
    pub document: Document,
    pub s3_path: String,
    pub source_display: DocumentSource,
}

impl DocumentJson {
    pub fn new(document: Document, site: &Site) -> Self {
        Self {
            s3_path: document.s3_path(site),
            source_display: document_source(document.source.as_deref()),
            document,
        }
    }
}

/// Page position of a listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginationContext {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

/// Filters echoed back with a document listing.
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct AppliedFilters {
    pub status: Option<String>,
    pub filename: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub sort: String,
    pub direction: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentListResponse {
    pub site: SiteJson,
    pub documents: Vec<DocumentJson>,
    pub pagination: PaginationContext,
    /// Documents on the site regardless of filters.
    pub total_documents: i64,
    /// Distinct categories present on the site.
    pub document_categories: Vec<String>,
    pub filters: AppliedFilters,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentDetailResponse {
    pub document: DocumentJson,
    pub histories: Vec<WorkflowHistory>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ModalContentResponse {
    pub document: DocumentJson,
    pub versions: Vec<FileVersion>,
    pub latest_version: Option<FileVersion>,
    pub summary: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WorkflowResponse {
    pub document: DocumentJson,
    pub history: WorkflowHistory,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DisplayText {
    pub display_text: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NoticeResponse {
    pub notice: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SiteResponse {
    pub notice: Option<String>,
    pub site: SiteJson,
    pub document_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DiscoveryResponse {
    pub documents: Vec<DocumentJson>,
}
