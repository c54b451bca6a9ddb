//! Document listing, detail and triage edits.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::super::{AppState, CurrentUser};
use super::api_types::{
    AppliedFilters, DisplayText, DocumentDetailResponse, DocumentJson, DocumentListResponse,
    ModalContentResponse, PaginationContext, SiteJson, SuccessResponse, WorkflowResponse,
};
use super::{owned_document, owned_site};
use crate::error::AppError;
use crate::models::WorkflowHistory;
use crate::repository::{DocumentQuery, DocumentSort};
use crate::storage;
use crate::workflow::{Action, ActionParams};

/// Listing filters, all optional.
#[derive(Debug, Default, Serialize, Deserialize, IntoParams)]
#[serde(default)]
pub struct DocumentsParams {
    /// Exact document category
    pub category: Option<String>,
    /// Case-insensitive substring of the file name
    pub filename: Option<String>,
    /// `YYYY-MM-DD` or RFC 3339; inclusive lower bound on modification date
    pub start_date: Option<String>,
    /// `YYYY-MM-DD` or RFC 3339; inclusive upper bound on modification date
    pub end_date: Option<String>,
    /// `in_review`, `done`, or empty for documents without a triage status
    pub status: Option<String>,
    /// `file_name`, `source` or `modification_date`
    pub sort: Option<String>,
    /// `asc` or `desc`
    pub direction: Option<String>,
    pub page: Option<String>,
}

fn parse_date_param(field: &str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Some(dt.and_utc()))
        .ok_or_else(|| AppError::BadRequest(format!("{} is not a valid date", field)))
}

impl DocumentsParams {
    fn to_query(&self) -> Result<DocumentQuery, AppError> {
        Ok(DocumentQuery {
            status: self.status.clone(),
            filename: self.filename.clone(),
            category: self.category.clone(),
            start_date: parse_date_param("start_date", self.start_date.as_deref())?,
            end_date: parse_date_param("end_date", self.end_date.as_deref())?,
            sort: DocumentSort::from_param(self.sort.as_deref()),
            descending: self.direction.as_deref() == Some("desc"),
            page: self
                .page
                .as_deref()
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(1),
        })
    }
}

#[utoipa::path(
    get,
    path = "/sites/{site_id}/documents",
    params(("site_id" = i64, Path, description = "Site ID"), DocumentsParams),
    responses(
        (status = 200, description = "One page of the site's documents", body = DocumentListResponse),
        (status = 400, description = "Malformed date filter"),
        (status = 403, description = "Owned by another user")
    ),
    tag = "Documents"
)]
pub async fn list_documents(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(site_id): Path<i64>,
    Query(params): Query<DocumentsParams>,
) -> Result<Json<DocumentListResponse>, AppError> {
    let site = owned_site(&state, &current, site_id).await?;
    let query = params.to_query()?;

    let docs = state.db.documents();
    let page = docs.list_for_site(site.id, &query).await?;
    let total_documents = docs.count_for_site(site.id).await?;
    let document_categories = docs.categories_for_site(site.id).await?;

    let pagination = PaginationContext {
        page: page.page,
        per_page: page.per_page,
        total: page.total,
        total_pages: page.total_pages(),
    };

    Ok(Json(DocumentListResponse {
        documents: page
            .documents
            .into_iter()
            .map(|d| DocumentJson::new(d, &site))
            .collect(),
        site: SiteJson::from(&site),
        pagination,
        total_documents,
        document_categories,
        filters: AppliedFilters {
            status: query.status,
            filename: query.filename,
            category: query.category,
            start_date: query.start_date,
            end_date: query.end_date,
            sort: query.sort.as_str().to_string(),
            direction: if query.descending { "desc" } else { "asc" }.to_string(),
        },
    }))
}

#[utoipa::path(
    get,
    path = "/sites/{site_id}/documents/{id}",
    params(
        ("site_id" = i64, Path, description = "Site ID"),
        ("id" = i64, Path, description = "Document ID")
    ),
    responses(
        (status = 200, description = "Document with its workflow history", body = DocumentDetailResponse),
        (status = 404, description = "Document not found on this site")
    ),
    tag = "Documents"
)]
pub async fn show_document(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((site_id, id)): Path<(i64, i64)>,
) -> Result<Json<DocumentDetailResponse>, AppError> {
    let site = owned_site(&state, &current, site_id).await?;
    let document = state
        .db
        .documents()
        .get_for_site(site.id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Document"))?;
    let histories = state.db.histories().list_for_document(document.id).await?;

    Ok(Json(DocumentDetailResponse {
        document: DocumentJson::new(document, &site),
        histories,
    }))
}

#[utoipa::path(
    get,
    path = "/sites/{site_id}/documents/{id}/modal_content",
    params(
        ("site_id" = i64, Path, description = "Site ID"),
        ("id" = i64, Path, description = "Document ID")
    ),
    responses(
        (status = 200, description = "Document, stored PDF versions and summary", body = ModalContentResponse),
        (status = 404, description = "Document not found on this site")
    ),
    tag = "Documents"
)]
pub async fn modal_content(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((site_id, id)): Path<(i64, i64)>,
) -> Result<Json<ModalContentResponse>, AppError> {
    let site = owned_site(&state, &current, site_id).await?;
    let document = state
        .db
        .documents()
        .get_for_site(site.id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Document"))?;

    let versions = match state.store {
        Some(ref store) => storage::file_versions(store.as_ref(), &document.s3_path(&site)).await,
        None => Vec::new(),
    };

    Ok(Json(ModalContentResponse {
        latest_version: versions.first().cloned(),
        versions,
        summary: document.summary.clone(),
        document: DocumentJson::new(document, &site),
    }))
}

#[utoipa::path(
    get,
    path = "/sites/{site_id}/documents/{id}/versions/{version_id}",
    params(
        ("site_id" = i64, Path, description = "Site ID"),
        ("id" = i64, Path, description = "Document ID"),
        ("version_id" = String, Path, description = "Stored version, from modal_content")
    ),
    responses(
        (status = 200, description = "The PDF bytes", content_type = "application/pdf"),
        (status = 404, description = "No such document or version")
    ),
    tag = "Documents"
)]
pub async fn download_version(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((site_id, id, version_id)): Path<(i64, i64, String)>,
) -> Result<impl IntoResponse, AppError> {
    let site = owned_site(&state, &current, site_id).await?;
    let document = state
        .db
        .documents()
        .get_for_site(site.id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Document"))?;
    let store = state
        .store
        .as_ref()
        .ok_or_else(|| AppError::not_found("Version"))?;

    let data = storage::file_version(store.as_ref(), &document.s3_path(&site), &version_id)
        .await
        .ok_or_else(|| AppError::not_found("Version"))?;

    let disposition = format!("inline; filename=\"{}\"", document.file_name.replace('"', ""));
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    ))
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct StatusParams {
    pub status: Option<String>,
}

#[utoipa::path(
    patch,
    path = "/sites/{site_id}/documents/{id}/update_status",
    params(
        ("site_id" = i64, Path, description = "Site ID"),
        ("id" = i64, Path, description = "Document ID")
    ),
    request_body = StatusParams,
    responses((status = 200, description = "Whether the status was stored", body = SuccessResponse)),
    tag = "Documents"
)]
pub async fn update_status(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((site_id, id)): Path<(i64, i64)>,
    Json(params): Json<StatusParams>,
) -> Result<Json<SuccessResponse>, AppError> {
    let site = owned_site(&state, &current, site_id).await?;
    let docs = state.db.documents();
    if docs.get_for_site(site.id, id).await?.is_none() {
        return Err(AppError::not_found("Document"));
    }
    let success = docs.update_status(id, params.status.as_deref()).await?;
    Ok(Json(SuccessResponse { success }))
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ValueParams {
    pub value: String,
}

#[utoipa::path(
    patch,
    path = "/documents/{id}/update_document_category",
    params(("id" = i64, Path, description = "Document ID")),
    request_body = ValueParams,
    responses(
        (status = 200, description = "New category", body = DisplayText),
        (status = 422, description = "Not one of the content types")
    ),
    tag = "Documents"
)]
pub async fn update_document_category(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(params): Json<ValueParams>,
) -> Result<Json<DisplayText>, AppError> {
    let (document, _) = owned_document(&state, &current, id).await?;
    let updated = state
        .db
        .documents()
        .update_category(document.id, &params.value)
        .await?
        .ok_or_else(|| AppError::not_found("Document"))?;

    Ok(Json(DisplayText {
        display_text: updated.document_category.unwrap_or_default(),
    }))
}

#[utoipa::path(
    patch,
    path = "/documents/{id}/update_accessibility_recommendation",
    params(("id" = i64, Path, description = "Document ID")),
    request_body = ValueParams,
    responses(
        (status = 200, description = "New recommendation", body = DisplayText),
        (status = 422, description = "Not one of the decision types")
    ),
    tag = "Documents"
)]
pub async fn update_accessibility_recommendation(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(params): Json<ValueParams>,
) -> Result<Json<DisplayText>, AppError> {
    let (document, _) = owned_document(&state, &current, id).await?;
    let updated = state
        .db
        .documents()
        .update_accessibility_recommendation(document.id, &params.value)
        .await?
        .ok_or_else(|| AppError::not_found("Document"))?;

    Ok(Json(DisplayText {
        display_text: updated.accessibility_recommendation.unwrap_or_default(),
    }))
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct NotesFields {
    pub notes: Option<String>,
}

/// Request body: `{"document": {"notes": ...}}`.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct NotesParams {
    pub document: NotesFields,
}

#[utoipa::path(
    patch,
    path = "/documents/{id}/update_notes",
    params(("id" = i64, Path, description = "Document ID")),
    request_body = NotesParams,
    responses((status = 200, description = "Stored notes", body = DisplayText)),
    tag = "Documents"
)]
pub async fn update_notes(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(params): Json<NotesParams>,
) -> Result<Json<DisplayText>, AppError> {
    let (document, _) = owned_document(&state, &current, id).await?;
    let notes = params.document.notes;
    state
        .db
        .documents()
        .update_notes(document.id, notes.as_deref())
        .await?;

    Ok(Json(DisplayText {
        display_text: notes.unwrap_or_default(),
    }))
}

#[utoipa::path(
    patch,
    path = "/documents/{id}/update_summary",
    params(("id" = i64, Path, description = "Document ID")),
    responses((status = 200, description = "Summary, empty when inference failed", body = DisplayText)),
    tag = "Documents"
)]
pub async fn update_summary(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<DisplayText>, AppError> {
    let (document, _) = owned_document(&state, &current, id).await?;
    let summary = state
        .summaries
        .inference_summary(&state.db.documents(), &document)
        .await;

    Ok(Json(DisplayText {
        display_text: summary.unwrap_or_default(),
    }))
}

#[utoipa::path(
    post,
    path = "/documents/{id}/workflow/{action}",
    params(
        ("id" = i64, Path, description = "Document ID"),
        ("action" = String, Path, description = "Workflow action, e.g. complete_classification")
    ),
    request_body(content = ActionParams, description = "Parameters some actions need"),
    responses(
        (status = 200, description = "Updated document and the recorded history entry", body = WorkflowResponse),
        (status = 400, description = "Required parameter missing"),
        (status = 404, description = "Unknown document or action"),
        (status = 422, description = "Action not allowed in the current status")
    ),
    tag = "Workflow"
)]
pub async fn apply_workflow_action(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((id, action)): Path<(i64, String)>,
    params: Option<Json<ActionParams>>,
) -> Result<Json<WorkflowResponse>, AppError> {
    let (document, site) = owned_document(&state, &current, id).await?;
    let params = params.map(|Json(p)| p).unwrap_or_default();
    let action = Action::parse(&action, &params)?;

    let (document, history) = state
        .db
        .documents()
        .apply_action(document.id, &action, Some(current.user.id), params.notes.clone())
        .await?;
    tracing::info!(
        "{} on document {}: {} -> {}",
        history.action_type,
        document.id,
        history.from_status,
        history.to_status
    );

    Ok(Json(WorkflowResponse {
        document: DocumentJson::new(document, &site),
        history,
    }))
}

#[utoipa::path(
    get,
    path = "/documents/{id}/histories",
    params(("id" = i64, Path, description = "Document ID")),
    responses((status = 200, description = "Workflow history, newest first", body = Vec<WorkflowHistory>)),
    tag = "Workflow"
)]
pub async fn list_histories(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<WorkflowHistory>>, AppError> {
    let (document, _) = owned_document(&state, &current, id).await?;
    Ok(Json(state.db.histories().list_for_document(document.id).await?))
}
