//! Web server for triaging site documents.
//!
//! Dashboard routes answer with JSON and require a signed-in session; the
//! `/api` routes are open and used by the crawler to report discoveries.

mod auth;
pub mod handlers;
mod routes;

pub use auth::{ClientInfo, CurrentUser};
pub use routes::create_router;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::LoginRateLimiter;
use crate::config::Settings;
use crate::inference::SummaryClient;
use crate::repository::DbContext;
use crate::storage::ObjectStore;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub db: DbContext,
    pub login_limiter: LoginRateLimiter,
    /// Honour forwarding headers when identifying the client.
    pub trust_proxy_headers: bool,
    /// PDF versions; `None` when no store is configured.
    pub store: Option<Arc<dyn ObjectStore>>,
    pub summaries: Arc<SummaryClient>,
    pub inference_config_path: PathBuf,
    pub inference_models_path: PathBuf,
}

impl AppState {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let db = settings.create_db_context()?;

        let store = match settings.storage {
            Some(ref storage) => match storage.build() {
                Ok(store) => Some(store),
                Err(e) => {
                    tracing::warn!("Object storage unavailable: {}", e);
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            db,
            login_limiter: LoginRateLimiter::default(),
            trust_proxy_headers: settings.trust_proxy_headers,
            store,
            summaries: Arc::new(SummaryClient::new(settings.inference.clone())?),
            inference_config_path: settings.inference_config_path.clone(),
            inference_models_path: settings.inference_models_path.clone(),
        })
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(settings)?;
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests;
