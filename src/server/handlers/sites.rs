//! Site management for the signed-in user.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use super::super::{AppState, CurrentUser};
use super::api_types::{NoticeResponse, SiteJson, SiteResponse};
use super::owned_site;
use crate::error::AppError;
use crate::models::SiteForm;

/// Request body: `{"site": {"name": ..., "location": ..., "primary_url": ...}}`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SiteParams {
    #[schema(value_type = Object)]
    pub site: SiteForm,
}

#[utoipa::path(
    get,
    path = "/sites",
    responses((status = 200, description = "Sites owned by the user, newest first", body = Vec<SiteJson>)),
    tag = "Sites"
)]
pub async fn list_sites(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<SiteJson>>, AppError> {
    let sites = state.db.sites().list_for_user(current.user.id).await?;
    Ok(Json(sites.iter().map(SiteJson::from).collect()))
}

#[utoipa::path(
    post,
    path = "/sites",
    request_body = SiteParams,
    responses(
        (status = 201, description = "Site created", body = SiteResponse),
        (status = 422, description = "Validation failed")
    ),
    tag = "Sites"
)]
pub async fn create_site(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(params): Json<SiteParams>,
) -> Result<(StatusCode, Json<SiteResponse>), AppError> {
    let site = state.db.sites().create(current.user.id, &params.site).await?;

    Ok((
        StatusCode::CREATED,
        Json(SiteResponse {
            notice: Some("Site was successfully created.".to_string()),
            site: SiteJson::from(&site),
            document_count: 0,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/sites/{site_id}",
    params(("site_id" = i64, Path, description = "Site ID")),
    responses(
        (status = 200, description = "Site details", body = SiteResponse),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "Site not found")
    ),
    tag = "Sites"
)]
pub async fn show_site(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<SiteResponse>, AppError> {
    let site = owned_site(&state, &current, id).await?;
    let document_count = state.db.documents().count_for_site(site.id).await?;
    Ok(Json(SiteResponse {
        notice: None,
        site: SiteJson::from(&site),
        document_count,
    }))
}

#[utoipa::path(
    patch,
    path = "/sites/{site_id}",
    params(("site_id" = i64, Path, description = "Site ID")),
    request_body = SiteParams,
    responses(
        (status = 200, description = "Site updated", body = SiteResponse),
        (status = 403, description = "Owned by another user"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Sites"
)]
pub async fn update_site(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(params): Json<SiteParams>,
) -> Result<Json<SiteResponse>, AppError> {
    let site = owned_site(&state, &current, id).await?;
    let site = state.db.sites().update(&site, &params.site).await?;
    let document_count = state.db.documents().count_for_site(site.id).await?;

    Ok(Json(SiteResponse {
        notice: Some("Site was successfully updated.".to_string()),
        site: SiteJson::from(&site),
        document_count,
    }))
}

#[utoipa::path(
    delete,
    path = "/sites/{site_id}",
    params(("site_id" = i64, Path, description = "Site ID")),
    responses(
        (status = 200, description = "Site and its documents deleted", body = NoticeResponse),
        (status = 403, description = "Owned by another user")
    ),
    tag = "Sites"
)]
pub async fn delete_site(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<NoticeResponse>, AppError> {
    let site = owned_site(&state, &current, id).await?;
    state.db.sites().delete(site.id).await?;
    tracing::info!("Deleted site {}", site.id);

    Ok(Json(NoticeResponse {
        notice: "Site was successfully deleted.".to_string(),
    }))
}
