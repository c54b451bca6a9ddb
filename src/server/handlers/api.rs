//! Open JSON API used by the crawler.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;

use super::super::AppState;
use super::api_types::{DiscoveryResponse, DocumentJson, SiteJson};
use crate::error::AppError;
use crate::repository::DiscoveredItem;

/// Health check.
#[utoipa::path(
    get,
    path = "/up",
    responses((status = 200, description = "Server is up")),
    tag = "Health"
)]
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

#[utoipa::path(
    get,
    path = "/api/sites",
    responses((status = 200, description = "Every site", body = Vec<SiteJson>)),
    tag = "API"
)]
pub async fn api_sites(State(state): State<AppState>) -> Result<Json<Vec<SiteJson>>, AppError> {
    let sites = state.db.sites().list_all().await?;
    Ok(Json(sites.iter().map(SiteJson::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/sites/{id}",
    params(("id" = i64, Path, description = "Site ID")),
    responses(
        (status = 200, description = "The site", body = SiteJson),
        (status = 404, description = "Site not found")
    ),
    tag = "API"
)]
pub async fn api_site(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SiteJson>, AppError> {
    let site = state
        .db
        .sites()
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Site"))?;
    Ok(Json(SiteJson::from(&site)))
}

/// Decode a request body leniently: no body reads as `null`.
fn json_body(body: &[u8]) -> Result<Value, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))
}

/// Validate `{"documents": [{"url", "modification_date"}, ...]}`.
fn parse_discovery(body: &Value) -> Result<Vec<DiscoveredItem>, AppError> {
    let items = body
        .get("documents")
        .ok_or_else(|| AppError::BadRequest("documents is missing".to_string()))?
        .as_array()
        .ok_or_else(|| AppError::BadRequest("documents must be an array".to_string()))?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            for field in ["url", "modification_date"] {
                if item.get(field).map_or(true, Value::is_null) {
                    return Err(AppError::BadRequest(format!(
                        "documents[{}][{}] is missing",
                        i, field
                    )));
                }
            }
            serde_json::from_value(item.clone()).map_err(|e| {
                AppError::BadRequest(format!("documents[{}] is invalid: {}", i, e))
            })
        })
        .collect()
}

#[utoipa::path(
    post,
    path = "/api/sites/{id}/documents",
    params(("id" = i64, Path, description = "Site ID")),
    request_body(content = Object, description = "`{\"documents\": [{\"url\": ..., \"modification_date\": ...}]}`"),
    responses(
        (status = 201, description = "Documents created or refreshed, in input order", body = DiscoveryResponse),
        (status = 400, description = "Malformed documents list"),
        (status = 404, description = "Site not found")
    ),
    tag = "API"
)]
pub async fn api_discover_documents(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<(StatusCode, Json<DiscoveryResponse>), AppError> {
    let site = state
        .db
        .sites()
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Site"))?;
    let items = parse_discovery(&json_body(&body)?)?;

    let documents = state.db.sites().discover_documents(&site, &items).await?;
    tracing::info!("Site {}: {} documents reported", site.id, documents.len());

    Ok((
        StatusCode::CREATED,
        Json(DiscoveryResponse {
            documents: documents
                .into_iter()
                .map(|d| DocumentJson::new(d, &site))
                .collect(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_body() {
        assert_eq!(json_body(b"").unwrap(), Value::Null);
        assert_eq!(json_body(b" \n").unwrap(), Value::Null);
        assert_eq!(json_body(br#"{"documents": []}"#).unwrap(), json!({"documents": []}));
        assert!(matches!(json_body(b"{documents"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_parse_discovery_errors() {
        assert!(matches!(parse_discovery(&json!({})), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_discovery(&Value::Null), Err(AppError::BadRequest(_))));
        assert!(matches!(
            parse_discovery(&json!({"documents": "nope"})),
            Err(AppError::BadRequest(_))
        ));
        let err = parse_discovery(&json!({"documents": [{"url": "https://a.gov/x.pdf"}]}))
            .unwrap_err();
        assert!(err.to_string().contains("modification_date"));
    }

    #[test]
    fn test_parse_discovery_ok() {
        let items = parse_discovery(&json!({"documents": [
            {"url": "https://a.gov/x.pdf", "modification_date": "2024-03-01T10:00:00Z"}
        ]}))
        .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://a.gov/x.pdf");
    }
}
