//! Signed-in landing page and manual document upload.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{AppState, CurrentUser};
use super::api_types::{DocumentJson, SiteJson};
use super::owned_site;
use crate::error::AppError;
use crate::models::DocumentInput;

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub notice: String,
    pub sites: Vec<SiteJson>,
    pub document_count: i64,
}

#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "User's sites and document count", body = DashboardResponse),
        (status = 401, description = "Not signed in")
    ),
    tag = "Dashboard"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<DashboardResponse>, AppError> {
    let user = &current.user;
    let sites = state.db.sites().list_for_user(user.id).await?;
    let document_count = state.db.documents().count_for_user(user.id).await?;

    Ok(Json(DashboardResponse {
        notice: format!("Welcome back, {}!", user.email_address),
        sites: sites.iter().map(SiteJson::from).collect(),
        document_count,
    }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadForm {
    pub site_id: i64,
    #[schema(value_type = Object)]
    pub document: DocumentInput,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub notice: String,
    pub document: DocumentJson,
}

#[utoipa::path(
    post,
    path = "/dashboard/upload_pdf",
    request_body = UploadForm,
    responses(
        (status = 201, description = "Document created", body = UploadResponse),
        (status = 404, description = "Site not found among the user's sites"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Dashboard"
)]
pub async fn upload_pdf(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(form): Json<UploadForm>,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    // Another user's site reads as missing here, not forbidden
    let site = owned_site(&state, &current, form.site_id)
        .await
        .map_err(|e| match e {
            AppError::Forbidden(_) => AppError::not_found("Site"),
            other => other,
        })?;

    let document = form.document.into_document(site.id)?;
    let document = state.db.documents().create(&document).await?;
    tracing::info!("Uploaded document {} to site {}", document.id, site.id);

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            notice: "Document uploaded successfully.".to_string(),
            document: DocumentJson::new(document, &site),
        }),
    ))
}
