use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use super::*;
use crate::models::{Document, Site, User};
use crate::storage::ObjectStore;

struct TestApp {
    state: AppState,
    user: User,
    cookie: String,
    dir: TempDir,
}

impl TestApp {
    fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    async fn site(&self, user_id: i64) -> Site {
        let site = Site::new(
            user_id,
            "City of Springfield".to_string(),
            "Springfield, IL".to_string(),
            "https://www.springfield.gov".to_string(),
        );
        self.state
            .db
            .sites()
            .create(user_id, &site.form())
            .await
            .unwrap()
    }

    async fn document(&self, site: &Site, file_name: &str) -> Document {
        let url = format!("https://www.springfield.gov/files/{}", file_name);
        self.state
            .db
            .documents()
            .create(&Document::new(site.id, url, file_name.to_string()))
            .await
            .unwrap()
    }
}

async fn setup() -> TestApp {
    let dir = TempDir::new().unwrap();
    let mut settings = Settings::with_data_dir(dir.path().to_path_buf());
    // Nothing listens here; summary requests fail fast.
    settings.inference.endpoint = "http://127.0.0.1:9/invocations".to_string();
    settings.inference.timeout = 1;

    let state = AppState::new(&settings).unwrap();
    state.db.init_schema().await.unwrap();

    let user = state
        .db
        .users()
        .create("reviewer@springfield.gov", "correct horse")
        .await
        .unwrap();
    let session = state.db.sessions().create(user.id, None, None).await.unwrap();
    let cookie = format!("{}={}", crate::auth::SESSION_COOKIE, session.token);

    TestApp {
        state,
        user,
        cookie,
        dir,
    }
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn send_json(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = setup().await;
    let response = app.router().oneshot(get("/up", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_dashboard_requires_session() {
    let app = setup().await;

    let response = app.router().oneshot(get("/dashboard", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .router()
        .oneshot(get("/dashboard", Some("asap_session=bogus")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .router()
        .oneshot(get("/dashboard", Some(&app.cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["notice"], "Welcome back, reviewer@springfield.gov!");
    assert_eq!(json["document_count"], 0);
}

#[tokio::test]
async fn test_login_sets_cookie() {
    let app = setup().await;
    let response = app
        .router()
        .oneshot(send_json(
            "POST",
            "/session",
            None,
            json!({"email_address": "Reviewer@Springfield.gov ", "password": "correct horse"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("asap_session="));

    let json = body_json(response).await;
    assert_eq!(json["notice"], "Welcome back!");
    assert!(json["user"].get("password_digest").is_none());
}

#[tokio::test]
async fn test_login_bad_credentials() {
    let app = setup().await;
    let response = app
        .router()
        .oneshot(send_json(
            "POST",
            "/session",
            None,
            json!({"email_address": "reviewer@springfield.gov", "password": "wrong"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["error"], true);
    assert_eq!(
        json["data"]["message"],
        "Try another email address or password."
    );
}

#[tokio::test]
async fn test_login_rate_limited() {
    let app = setup().await;
    let attempt = || {
        send_json(
            "POST",
            "/session",
            None,
            json!({"email_address": "reviewer@springfield.gov", "password": "wrong"}),
        )
    };

    for _ in 0..crate::auth::LOGIN_ATTEMPTS {
        let response = app.router().oneshot(attempt()).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
    let response = app.router().oneshot(attempt()).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = setup().await;
    let request = Request::builder()
        .method("DELETE")
        .uri("/session")
        .header(header::COOKIE, &app.cookie)
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router()
        .oneshot(get("/dashboard", Some(&app.cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_site() {
    let app = setup().await;

    let response = app
        .router()
        .oneshot(send_json(
            "POST",
            "/sites",
            Some(&app.cookie),
            json!({"site": {"name": "", "location": "Springfield", "primary_url": "ftp://x"}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert!(json["errors"]["name"].is_array());
    assert!(json["errors"]["primary_url"].is_array());

    let response = app
        .router()
        .oneshot(send_json(
            "POST",
            "/sites",
            Some(&app.cookie),
            json!({"site": {
                "name": "Springfield",
                "location": "Springfield, IL",
                "primary_url": "https://www.springfield.gov"
            }}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["notice"], "Site was successfully created.");
    assert_eq!(json["site"]["name"], "Springfield");
}

#[tokio::test]
async fn test_other_users_site_forbidden() {
    let app = setup().await;
    let other = app
        .state
        .db
        .users()
        .create("clerk@shelbyville.gov", "pw")
        .await
        .unwrap();
    let site = app.site(other.id).await;

    let response = app
        .router()
        .oneshot(get(&format!("/sites/{}", site.id), Some(&app.cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .router()
        .oneshot(get("/sites/9999", Some(&app.cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_documents() {
    let app = setup().await;
    let site = app.site(app.user.id).await;
    app.document(&site, "budget.pdf").await;
    app.document(&site, "minutes.pdf").await;

    let response = app
        .router()
        .oneshot(get(
            &format!("/sites/{}/documents?filename=budget", site.id),
            Some(&app.cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["total_documents"], 2);
    assert_eq!(json["pagination"]["total"], 1);
    assert_eq!(json["documents"][0]["file_name"], "budget.pdf");
    assert_eq!(json["filters"]["filename"], "budget");
}

#[tokio::test]
async fn test_list_documents_bad_date() {
    let app = setup().await;
    let site = app.site(app.user.id).await;

    let response = app
        .router()
        .oneshot(get(
            &format!("/sites/{}/documents?start_date=yesterday", site.id),
            Some(&app.cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_workflow_action_records_history() {
    let app = setup().await;
    let site = app.site(app.user.id).await;
    let document = app.document(&site, "budget.pdf").await;

    let response = app
        .router()
        .oneshot(send_json(
            "POST",
            &format!("/documents/{}/workflow/download", document.id),
            Some(&app.cookie),
            json!({"notes": "fetched"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["document"]["document_status"], "downloaded");
    assert_eq!(json["history"]["from_status"], "discovered");
    assert_eq!(json["history"]["to_status"], "downloaded");
    assert_eq!(json["history"]["user_id"], app.user.id);

    // Downloading twice is not a valid transition
    let response = app
        .router()
        .oneshot(send_json(
            "POST",
            &format!("/documents/{}/workflow/download", document.id),
            Some(&app.cookie),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .router()
        .oneshot(get(
            &format!("/documents/{}/histories", document.id),
            Some(&app.cookie),
        ))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["notes"], "fetched");
}

#[tokio::test]
async fn test_workflow_unknown_action_and_missing_param() {
    let app = setup().await;
    let site = app.site(app.user.id).await;
    let document = app.document(&site, "budget.pdf").await;

    let response = app
        .router()
        .oneshot(send_json(
            "POST",
            &format!("/documents/{}/workflow/shred", document.id),
            Some(&app.cookie),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .router()
        .oneshot(send_json(
            "POST",
            &format!("/documents/{}/workflow/complete_classification", document.id),
            Some(&app.cookie),
            json!({"category": "Agenda"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_summary_failure_returns_blank() {
    let app = setup().await;
    let site = app.site(app.user.id).await;
    let document = app.document(&site, "budget.pdf").await;

    let request = Request::builder()
        .method("PATCH")
        .uri(format!("/documents/{}/update_summary", document.id))
        .header(header::COOKIE, &app.cookie)
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["display_text"], "");
}

#[tokio::test]
async fn test_modal_content_and_download_version() {
    let app = setup().await;
    let site = app.site(app.user.id).await;
    let document = app.document(&site, "budget.pdf").await;

    let store: Arc<dyn ObjectStore> =
        Arc::new(crate::storage::FilesystemStore::new(app.dir.path().join("store")));
    let key = document.s3_path(&site);
    store.put(&key, b"%PDF-1.4 first").await.unwrap();
    let newest = store.put(&key, b"%PDF-1.4 second").await.unwrap();

    let mut state = app.state.clone();
    state.store = Some(store);
    let router = create_router(state);

    let response = router
        .clone()
        .oneshot(get(
            &format!("/sites/{}/documents/{}/modal_content", site.id, document.id),
            Some(&app.cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["versions"].as_array().unwrap().len(), 2);
    assert_eq!(json["latest_version"]["version_id"], newest.version_id.as_str());

    let response = router
        .clone()
        .oneshot(get(
            &format!(
                "/sites/{}/documents/{}/versions/{}",
                site.id, document.id, newest.version_id
            ),
            Some(&app.cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"%PDF-1.4 second");

    let response = router
        .oneshot(get(
            &format!("/sites/{}/documents/{}/versions/nope", site.id, document.id),
            Some(&app.cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_discovery() {
    let app = setup().await;
    let site = app.site(app.user.id).await;

    let uri = format!("/api/sites/{}/documents", site.id);
    let payload = json!({"documents": [
        {"url": "https://www.springfield.gov/files/a.pdf", "modification_date": "2024-03-01T10:00:00Z"},
        {"url": "https://www.springfield.gov/files/b.pdf", "modification_date": "2024-03-02T10:00:00Z"}
    ]});

    let response = app
        .router()
        .oneshot(send_json("POST", &uri, None, payload.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let documents = json["documents"].as_array().unwrap();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0]["file_name"], "a.pdf");
    assert_eq!(documents[1]["file_name"], "b.pdf");

    // Reporting the same URLs again refreshes rather than duplicates
    let response = app
        .router()
        .oneshot(send_json("POST", &uri, None, payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        app.state.db.documents().count_for_site(site.id).await.unwrap(),
        2
    );
}

#[tokio::test]
async fn test_api_discovery_errors() {
    let app = setup().await;
    let site = app.site(app.user.id).await;

    let response = app
        .router()
        .oneshot(send_json(
            "POST",
            &format!("/api/sites/{}/documents", site.id),
            None,
            json!({"documents": [{"url": "https://www.springfield.gov/a.pdf"}]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .router()
        .oneshot(send_json(
            "POST",
            "/api/sites/9999/documents",
            None,
            json!({"documents": []}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["data"]["message"], "Site not found");
}

#[tokio::test]
async fn test_api_sites() {
    let app = setup().await;
    app.site(app.user.id).await;

    let response = app.router().oneshot(get("/api/sites", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["name"], "City of Springfield");
    assert!(json[0].get("user_id").is_none());
}

#[tokio::test]
async fn test_swagger_doc() {
    let app = setup().await;
    let response = app
        .router()
        .oneshot(get("/api/swagger_doc", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["info"]["title"], "ASAP PDF API");
    assert!(json["paths"].get("/api/sites/{id}/documents").is_some());
}

fn login_from(peer: [u8; 4], forwarded_for: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/session")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", forwarded_for)
        .header("x-real-ip", forwarded_for)
        .extension(axum::extract::ConnectInfo(std::net::SocketAddr::from((
            peer, 40000,
        ))))
        .body(Body::from(
            json!({"email_address": "reviewer@springfield.gov", "password": "wrong"}).to_string(),
        ))
        .unwrap()
}

#[tokio::test]
async fn test_login_throttle_ignores_forwarded_headers() {
    let app = setup().await;

    for i in 0..crate::auth::LOGIN_ATTEMPTS {
        let spoofed = format!("198.51.100.{}", i);
        let response = app
            .router()
            .oneshot(login_from([203, 0, 113, 7], &spoofed))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
    let response = app
        .router()
        .oneshot(login_from([203, 0, 113, 7], "198.51.100.250"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // Another peer still gets its own allowance
    let response = app
        .router()
        .oneshot(login_from([203, 0, 113, 8], "198.51.100.250"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_login_throttle_uses_forwarded_headers_behind_proxy() {
    let mut app = setup().await;
    app.state.trust_proxy_headers = true;

    // Every request arrives from the proxy, on behalf of distinct clients
    for i in 0..=crate::auth::LOGIN_ATTEMPTS {
        let client = format!("198.51.100.{}", i);
        let response = app
            .router()
            .oneshot(login_from([10, 0, 0, 1], &client))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}

#[tokio::test]
async fn test_update_category_and_recommendation() {
    let app = setup().await;
    let site = app.site(app.user.id).await;
    let document = app.document(&site, "agenda.pdf").await;

    let uri = format!("/documents/{}/update_document_category", document.id);
    let response = app
        .router()
        .oneshot(send_json("PATCH", &uri, Some(&app.cookie), json!({"value": "Agenda"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["display_text"], "Agenda");

    let response = app
        .router()
        .oneshot(send_json("PATCH", &uri, Some(&app.cookie), json!({"value": "Recipe"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["errors"]["document_category"][0], "is not included in the list");

    let uri = format!("/documents/{}/update_accessibility_recommendation", document.id);
    let response = app
        .router()
        .oneshot(send_json("PATCH", &uri, Some(&app.cookie), json!({"value": "Remediate"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["display_text"], "Remediate");

    let response = app
        .router()
        .oneshot(send_json("PATCH", &uri, Some(&app.cookie), json!({"value": "Shred"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(
        json["errors"]["accessibility_recommendation"][0],
        "is not included in the list"
    );

    let stored = app.state.db.documents().get(document.id).await.unwrap().unwrap();
    assert_eq!(stored.document_category.as_deref(), Some("Agenda"));
    assert_eq!(stored.accessibility_recommendation.as_deref(), Some("Remediate"));
}

#[tokio::test]
async fn test_update_notes() {
    let app = setup().await;
    let site = app.site(app.user.id).await;
    let document = app.document(&site, "minutes.pdf").await;

    let response = app
        .router()
        .oneshot(send_json(
            "PATCH",
            &format!("/documents/{}/update_notes", document.id),
            Some(&app.cookie),
            json!({"document": {"notes": "Scanned, needs OCR"}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["display_text"], "Scanned, needs OCR");

    let stored = app.state.db.documents().get(document.id).await.unwrap().unwrap();
    assert_eq!(stored.notes.as_deref(), Some("Scanned, needs OCR"));
}

#[tokio::test]
async fn test_configuration_edit_and_update() {
    let app = setup().await;
    std::fs::write(
        &app.state.inference_config_path,
        r#"{"active_model":"gemini","key":"old","page_limit":3,"prompt":"p","temperature":0.2}"#,
    )
    .unwrap();
    std::fs::write(
        &app.state.inference_models_path,
        r#"{"gemini": {"label": "Gemini"}}"#,
    )
    .unwrap();

    let response = app
        .router()
        .oneshot(get("/configuration/edit", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .router()
        .oneshot(get("/configuration/edit", Some(&app.cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["config"]["active_model"], "gemini");
    assert_eq!(json["models"]["gemini"]["label"], "Gemini");

    let response = app
        .router()
        .oneshot(send_json(
            "PATCH",
            "/configuration",
            Some(&app.cookie),
            json!({"config": {
                "active_model": "gpt-4o",
                "key": "sk-new",
                "page_limit": "12",
                "prompt": "Summarize"
            }}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["notice"], "Configuration updated successfully");
    assert_eq!(json["config"]["page_limit"], 12);

    let raw = std::fs::read_to_string(&app.state.inference_config_path).unwrap();
    let saved: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(saved["active_model"], "gpt-4o");
    assert_eq!(saved["temperature"], 0.2);
}

#[tokio::test]
async fn test_configuration_update_without_file() {
    let app = setup().await;
    let response = app
        .router()
        .oneshot(send_json(
            "PATCH",
            "/configuration",
            Some(&app.cookie),
            json!({"config": {"active_model": "gpt-4o", "key": "", "page_limit": 1, "prompt": ""}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert!(json["data"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Error updating configuration"));
}

#[tokio::test]
async fn test_api_discovery_without_body() {
    let app = setup().await;
    let site = app.site(app.user.id).await;
    let uri = format!("/api/sites/{}/documents", site.id);

    let request = Request::builder()
        .method("POST")
        .uri(&uri)
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], true);
    assert_eq!(json["data"]["message"], "documents is missing");

    let request = Request::builder()
        .method("POST")
        .uri(&uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"documents\": ["))
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], true);
}
