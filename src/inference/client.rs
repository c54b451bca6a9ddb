//! HTTP client for the summary endpoint.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error, info};

use super::config::InferenceSettings;
use crate::models::Document;
use crate::repository::DocumentRepository;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("endpoint returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("malformed response: {0}")]
    Parse(String),
    #[error("configuration error: {0}")]
    Config(String),
}

/// Payload posted to the endpoint.
#[derive(Debug, Serialize)]
pub struct SummaryRequest<'a> {
    pub model_name: &'a str,
    pub document_url: &'a str,
    pub page_limit: u32,
}

pub struct SummaryClient {
    settings: InferenceSettings,
    client: Client,
}

impl SummaryClient {
    pub fn new(settings: InferenceSettings) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout))
            .build()
            .map_err(|e| InferenceError::Connection(e.to_string()))?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &InferenceSettings {
        &self.settings
    }

    /// Ask the endpoint to summarize the PDF at `document_url`.
    pub async fn summarize(&self, document_url: &str) -> Result<String, InferenceError> {
        let request = SummaryRequest {
            model_name: &self.settings.model,
            document_url,
            page_limit: self.settings.page_limit,
        };
        debug!("Requesting summary for {}", document_url);

        let resp = self
            .client
            .post(&self.settings.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| InferenceError::Connection(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| InferenceError::Parse(e.to_string()))?;
        if !status.is_success() {
            return Err(InferenceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        parse_summary(&body)
    }

    /// Summary for `document`, fetching and storing one when it has none.
    ///
    /// Errors are logged and leave the summary unset.
    pub async fn inference_summary(
        &self,
        documents: &DocumentRepository,
        document: &Document,
    ) -> Option<String> {
        if let Some(ref summary) = document.summary {
            return Some(summary.clone());
        }

        let summary = match self.summarize(&document.url).await {
            Ok(summary) => summary,
            Err(e) => {
                error!("Summary for document {} failed: {}", document.id, e);
                return None;
            }
        };

        if let Err(e) = documents.update_summary(document.id, &summary).await {
            error!("Could not store summary for document {}: {}", document.id, e);
            return None;
        }
        info!("Stored summary for document {}", document.id);
        Some(summary)
    }
}

/// The body is the summary; a bare JSON string is unquoted.
fn parse_summary(body: &str) -> Result<String, InferenceError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(InferenceError::Parse("empty response".to_string()));
    }
    if trimmed.starts_with('"') {
        return serde_json::from_str::<String>(trimmed)
            .map_err(|e| InferenceError::Parse(e.to_string()));
    }
    Ok(body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::Value;

    use crate::models::Site;
    use crate::repository::DbContext;

    async fn spawn_endpoint(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/invoke", addr)
    }

    async fn setup() -> (tempfile::TempDir, DbContext, Document) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = DbContext::sqlite(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let user = ctx.users().create("staff@city.gov", "secret123").await.unwrap();
        let form = Site::new(
            user.id,
            "City".into(),
            "Springfield".into(),
            "https://city.gov".into(),
        )
        .form();
        let site = ctx.sites().create(user.id, &form).await.unwrap();
        let doc = Document::new(site.id, "https://city.gov/a.pdf".into(), "a.pdf".into());
        let doc = ctx.documents().create(&doc).await.unwrap();
        (dir, ctx, doc)
    }

    #[test]
    fn test_parse_summary() {
        assert_eq!(parse_summary("\"A budget.\"").unwrap(), "A budget.");
        assert_eq!(parse_summary("Plain text").unwrap(), "Plain text");
        assert!(parse_summary("  ").is_err());
    }

    #[tokio::test]
    async fn test_summary_fetched_and_stored() {
        let endpoint = spawn_endpoint(Router::new().route(
            "/invoke",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["model_name"], "gemini-1.5-pro-latest");
                assert_eq!(body["page_limit"], 7);
                format!("Summary of {}", body["document_url"].as_str().unwrap_or(""))
            }),
        ))
        .await;

        let (_dir, ctx, doc) = setup().await;
        let client = SummaryClient::new(InferenceSettings {
            endpoint,
            ..InferenceSettings::default()
        })
        .unwrap();

        let summary = client.inference_summary(&ctx.documents(), &doc).await;
        assert_eq!(summary.as_deref(), Some("Summary of https://city.gov/a.pdf"));

        let stored = ctx.documents().get(doc.id).await.unwrap().unwrap();
        assert_eq!(stored.summary, summary);
    }

    #[tokio::test]
    async fn test_failure_leaves_summary_unset() {
        let endpoint = spawn_endpoint(Router::new().route(
            "/invoke",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        ))
        .await;

        let (_dir, ctx, doc) = setup().await;
        let client = SummaryClient::new(InferenceSettings {
            endpoint,
            ..InferenceSettings::default()
        })
        .unwrap();

        assert!(matches!(
            client.summarize(&doc.url).await,
            Err(InferenceError::Api { status: 500, .. })
        ));
        assert!(client.inference_summary(&ctx.documents(), &doc).await.is_none());
        let stored = ctx.documents().get(doc.id).await.unwrap().unwrap();
        assert!(stored.summary.is_none());
    }
}
