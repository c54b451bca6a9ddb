//! HTTP request handlers for the web server.

mod api;
pub mod api_types;
mod configuration;
mod dashboard;
mod documents;
pub mod openapi;
mod session;
mod sites;

// Re-export handlers for use by the router
pub use api::{api_discover_documents, api_site, api_sites, health};
pub use configuration::{edit_configuration, update_configuration};
pub use dashboard::{dashboard, upload_pdf};
pub use documents::{
    apply_workflow_action, download_version, list_documents, list_histories, modal_content, show_document,
    update_accessibility_recommendation, update_document_category, update_notes, update_status,
    update_summary,
};
pub use openapi::openapi_spec;
pub use session::{create_session, destroy_session, new_session};
pub use sites::{create_site, delete_site, list_sites, show_site, update_site};

use super::{AppState, CurrentUser};
use crate::error::AppError;
use crate::models::{Document, Site};

/// Load a site the signed-in user owns.
pub(crate) async fn owned_site(
    state: &AppState,
    current: &CurrentUser,
    id: i64,
) -> Result<Site, AppError> {
    let site = state
        .db
        .sites()
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Site"))?;

    if site.user_id != current.user.id {
        return Err(AppError::Forbidden(
            "You don't have permission to access that site.".to_string(),
        ));
    }
    Ok(site)
}

/// Load a document along with its site, checking the site's owner.
pub(crate) async fn owned_document(
    state: &AppState,
    current: &CurrentUser,
    id: i64,
) -> Result<(Document, Site), AppError> {
    let document = state
        .db
        .documents()
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Document"))?;
    let site = owned_site(state, current, document.site_id).await?;
    Ok((document, site))
}
