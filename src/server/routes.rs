//! Router configuration for the web server.

use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/up", get(handlers::health))
        // Session
        .route("/session/new", get(handlers::new_session))
        .route("/login", get(handlers::new_session))
        .route(
            "/session",
            post(handlers::create_session).delete(handlers::destroy_session),
        )
        // Dashboard
        .route("/dashboard", get(handlers::dashboard))
        .route("/dashboard/upload_pdf", post(handlers::upload_pdf))
        // Sites; root lists the user's sites
        .route("/", get(handlers::list_sites))
        .route(
            "/sites",
            get(handlers::list_sites).post(handlers::create_site),
        )
        .route(
            "/sites/:site_id",
            get(handlers::show_site)
                .patch(handlers::update_site)
                .put(handlers::update_site)
                .delete(handlers::delete_site),
        )
        // Documents nested under their site
        .route("/sites/:site_id/documents", get(handlers::list_documents))
        .route(
            "/sites/:site_id/documents/:id",
            get(handlers::show_document),
        )
        .route(
            "/sites/:site_id/documents/:id/modal_content",
            get(handlers::modal_content),
        )
        .route(
            "/sites/:site_id/documents/:id/versions/:version_id",
            get(handlers::download_version),
        )
        .route(
            "/sites/:site_id/documents/:id/update_status",
            patch(handlers::update_status),
        )
        // Inline document edits
        .route(
            "/documents/:id/update_document_category",
            patch(handlers::update_document_category),
        )
        .route(
            "/documents/:id/update_accessibility_recommendation",
            patch(handlers::update_accessibility_recommendation),
        )
        .route("/documents/:id/update_notes", patch(handlers::update_notes))
        .route(
            "/documents/:id/update_summary",
            patch(handlers::update_summary),
        )
        // Workflow
        .route(
            "/documents/:id/workflow/:action",
            post(handlers::apply_workflow_action),
        )
        .route("/documents/:id/histories", get(handlers::list_histories))
        // Inference configuration
        .route("/configuration/edit", get(handlers::edit_configuration))
        .route("/configuration", patch(handlers::update_configuration))
        // ===========================================
        // Crawler API (unauthenticated)
        // ===========================================
        .route("/api/sites", get(handlers::api_sites))
        .route("/api/sites/:id", get(handlers::api_site))
        .route(
            "/api/sites/:id/documents",
            post(handlers::api_discover_documents),
        )
        // OpenAPI spec
        .route("/api/swagger_doc", get(handlers::openapi_spec))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
