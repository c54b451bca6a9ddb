//! OpenAPI spec generation and serving.

use axum::{http::StatusCode, response::IntoResponse};
use utoipa::OpenApi;

use super::api;
use super::api_types;
use super::configuration;
use super::dashboard;
use super::documents;
use super::session;
use super::sites;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ASAP PDF API",
        description = "Triage of PDF documents published on government websites",
        version = "0.3.0"
    ),
    paths(
        // Health
        api::health,
        // Crawler API
        api::api_sites,
        api::api_site,
        api::api_discover_documents,
        // Session
        session::new_session,
        session::create_session,
        session::destroy_session,
        // Dashboard
        dashboard::dashboard,
        dashboard::upload_pdf,
        // Sites
        sites::list_sites,
        sites::create_site,
        sites::show_site,
        sites::update_site,
        sites::delete_site,
        // Documents
        documents::list_documents,
        documents::show_document,
        documents::modal_content,
        documents::download_version,
        documents::update_status,
        documents::update_document_category,
        documents::update_accessibility_recommendation,
        documents::update_notes,
        documents::update_summary,
        documents::apply_workflow_action,
        documents::list_histories,
        // Configuration
        configuration::edit_configuration,
        configuration::update_configuration,
    ),
    components(schemas(
        // Envelope types
        api_types::EmptyContext,
        api_types::ErrorData,
        api_types::PaginationContext,
        api_types::AppliedFilters,
        // Resources
        api_types::SiteJson,
        api_types::DocumentJson,
        api_types::DocumentListResponse,
        api_types::DocumentDetailResponse,
        api_types::ModalContentResponse,
        api_types::WorkflowResponse,
        api_types::DisplayText,
        api_types::SuccessResponse,
        api_types::NoticeResponse,
        api_types::SiteResponse,
        api_types::DiscoveryResponse,
        crate::models::Document,
        crate::models::WorkflowHistory,
        crate::storage::FileVersion,
        crate::utils::DocumentSource,
        crate::workflow::ActionParams,
        // Request bodies
        session::LoginForm,
        session::LoginFormMetadata,
        session::SignedIn,
        dashboard::DashboardResponse,
        dashboard::UploadForm,
        dashboard::UploadResponse,
        sites::SiteParams,
        documents::StatusParams,
        documents::ValueParams,
        documents::NotesParams,
        documents::NotesFields,
        configuration::ConfigurationParams,
        configuration::ConfigurationResponse,
    )),
    tags(
        (name = "Health", description = "Health check"),
        (name = "API", description = "Open crawler API for sites and discovered documents"),
        (name = "Session", description = "Sign in and sign out"),
        (name = "Dashboard", description = "Signed-in overview and uploads"),
        (name = "Sites", description = "Sites owned by the signed-in user"),
        (name = "Documents", description = "Document triage and inline edits"),
        (name = "Workflow", description = "Status transitions and their history"),
        (name = "Configuration", description = "Summary inference settings"),
    )
)]
pub struct ApiDoc;

/// Serve the OpenAPI spec as JSON.
pub async fn openapi_spec() -> impl IntoResponse {
    let spec = ApiDoc::openapi()
        .to_json()
        .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e));
    (StatusCode::OK, [("content-type", "application/json")], spec)
}
