//! services/api/tests/api.rs
//!
//! End-to-end tests for the HTTP surface, driven through the router with
//! in-memory implementations of the store and redraft ports. No database
//! or generation service is required.

use api_lib::config::Config;
use api_lib::web::auth::{SessionToken, SESSION_COOKIE};
use api_lib::web::state::AppState;
use api_lib::web::api_router;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::Utc;
use redraft_core::domain::{ClientProfile, ClientProfilePatch, NewClientProfile, RedraftRequest};
use redraft_core::ports::{ClientStore, PortError, PortResult, RedraftService, RedraftStream};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use tracing::Level;
use uuid::Uuid;

//=========================================================================================
// In-Memory Port Doubles
//=========================================================================================

#[derive(Default)]
struct MemoryClientStore {
    clients: Mutex<Vec<ClientProfile>>,
}

#[async_trait]
impl ClientStore for MemoryClientStore {
    async fn list(&self) -> PortResult<Vec<ClientProfile>> {
        let mut clients = self.clients.lock().unwrap().clone();
        clients.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(clients)
    }

    async fn create(&self, new: NewClientProfile) -> PortResult<ClientProfile> {
        let name = new.name.trim().to_string();
        if name.is_empty() {
            return Err(PortError::Validation(
                "Client name must not be empty".to_string(),
            ));
        }
        let now = Utc::now();
        let profile = ClientProfile {
            id: Uuid::new_v4().to_string(),
            name,
            technical_knowledge: new.technical_knowledge,
            description: new.description,
            created_at: now,
            updated_at: now,
        };
        self.clients.lock().unwrap().push(profile.clone());
        Ok(profile)
    }

    async fn get_by_id(&self, id: &str) -> PortResult<ClientProfile> {
        self.clients
            .lock()
            .unwrap()
            .iter()
            .find(|profile| profile.id == id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Client {} not found", id)))
    }

    async fn update(&self, id: &str, patch: ClientProfilePatch) -> PortResult<ClientProfile> {
        let mut clients = self.clients.lock().unwrap();
        let profile = clients
            .iter_mut()
            .find(|profile| profile.id == id)
            .ok_or_else(|| PortError::NotFound(format!("Client {} not found", id)))?;
        if let Some(name) = patch.name {
            profile.name = name.trim().to_string();
        }
        if let Some(technical_knowledge) = patch.technical_knowledge {
            profile.technical_knowledge = technical_knowledge;
        }
        if let Some(description) = patch.description {
            profile.description = description;
        }
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn delete(&self, id: &str) -> PortResult<()> {
        self.clients
            .lock()
            .unwrap()
            .retain(|profile| profile.id != id);
        Ok(())
    }
}

enum UpstreamBehavior {
    /// Stream the given chunks successfully.
    Chunks(Vec<&'static str>),
    /// Reject the request before any stream is established.
    RejectRequest,
    /// Establish the stream, then fail on its very first item.
    FailFirstItem,
}

struct RecordingRedraftService {
    behavior: UpstreamBehavior,
    last_request: Mutex<Option<RedraftRequest>>,
}

impl RecordingRedraftService {
    fn succeeding(chunks: Vec<&'static str>) -> Self {
        Self {
            behavior: UpstreamBehavior::Chunks(chunks),
            last_request: Mutex::new(None),
        }
    }

    fn failing() -> Self {
        Self {
            behavior: UpstreamBehavior::RejectRequest,
            last_request: Mutex::new(None),
        }
    }

    fn failing_mid_stream() -> Self {
        Self {
            behavior: UpstreamBehavior::FailFirstItem,
            last_request: Mutex::new(None),
        }
    }

    fn was_called(&self) -> bool {
        self.last_request.lock().unwrap().is_some()
    }

    fn last_request(&self) -> Option<RedraftRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl RedraftService for RecordingRedraftService {
    async fn redraft_stream(&self, request: &RedraftRequest) -> PortResult<RedraftStream> {
        *self.last_request.lock().unwrap() = Some(request.clone());
        match &self.behavior {
            UpstreamBehavior::RejectRequest => {
                Err(PortError::Upstream("quota exhausted".to_string()))
            }
            UpstreamBehavior::FailFirstItem => {
                let items: Vec<Result<String, PortError>> =
                    vec![Err(PortError::Upstream("content policy rejection".to_string()))];
                Ok(Box::pin(futures::stream::iter(items)))
            }
            UpstreamBehavior::Chunks(chunks) => {
                let items: Vec<Result<String, PortError>> =
                    chunks.iter().map(|chunk| Ok(chunk.to_string())).collect();
                Ok(Box::pin(futures::stream::iter(items)))
            }
        }
    }
}

//=========================================================================================
// Test Harness
//=========================================================================================

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:3000".parse().unwrap(),
        database_url: String::new(),
        log_level: Level::INFO,
        openai_api_key: None,
        redraft_model: "test-model".to_string(),
        admin_username: "admin".to_string(),
        admin_password: "admin123".to_string(),
        session_secret: "test-secret".to_string(),
        cookie_secure: false,
        frontend_origin: "http://localhost:3000".to_string(),
    }
}

fn test_app(redraft: RecordingRedraftService) -> (Router, Arc<RecordingRedraftService>) {
    let redraft = Arc::new(redraft);
    let state = Arc::new(AppState {
        clients: Arc::new(MemoryClientStore::default()),
        redraft: redraft.clone(),
        config: Arc::new(test_config()),
    });
    (api_router(state), redraft)
}

fn app() -> Router {
    test_app(RecordingRedraftService::succeeding(vec!["ok"])).0
}

fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

/// Logs in with the fixed admin credentials and returns the session cookie
/// in `name=value` form.
async fn login(router: &Router) -> String {
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/login",
            None,
            &json!({"username": "admin", "password": "admin123"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login must set the session cookie")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

async fn create_client(router: &Router, cookie: &str, name: &str, level: i32) -> Value {
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/clients",
            Some(cookie),
            &json!({"name": name, "technicalKnowledge": level, "description": ""}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

//=========================================================================================
// Auth Gate
//=========================================================================================

#[tokio::test]
async fn login_with_valid_credentials_sets_session_cookie() {
    let router = app();
    let response = router
        .oneshot(json_request(
            "POST",
            "/auth/login",
            None,
            &json!({"username": "admin", "password": "admin123"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("admin-session="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Strict"));
    assert!(set_cookie.contains("Max-Age=86400"));

    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
}

#[tokio::test]
async fn login_with_wrong_credentials_is_rejected() {
    let router = app();
    let response = router
        .oneshot(json_request(
            "POST",
            "/auth/login",
            None,
            &json!({"username": "admin", "password": "wrong"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], json!("Invalid credentials"));
}

#[tokio::test]
async fn login_with_missing_fields_is_rejected() {
    let router = app();
    let response = router
        .oneshot(json_request(
            "POST",
            "/auth/login",
            None,
            &json!({"username": "admin"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn verify_reports_the_logged_in_username() {
    let router = app();
    let cookie = login(&router).await;

    let response = router
        .oneshot(get_request("/auth/verify", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["authenticated"], json!(true));
    assert_eq!(body["username"], json!("admin"));
}

#[tokio::test]
async fn verify_without_cookie_is_unauthenticated() {
    let router = app();
    let response = router
        .oneshot(get_request("/auth/verify", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["authenticated"], json!(false));
}

#[tokio::test]
async fn expired_session_is_rejected_and_cookie_cleared() {
    let router = app();
    let issued = Utc::now().timestamp_millis() - 25 * 60 * 60 * 1000;
    let token = SessionToken::issue("admin", issued).encode("test-secret");
    let cookie = format!("{}={}", SESSION_COOKIE, token);

    let response = router
        .oneshot(get_request("/auth/verify", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("an invalid cookie must be cleared")
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.contains("Max-Age=0"));
    assert_eq!(body_json(response).await["authenticated"], json!(false));
}

#[tokio::test]
async fn session_signed_with_another_secret_is_rejected() {
    let router = app();
    let token = SessionToken::issue("admin", Utc::now().timestamp_millis()).encode("forged-secret");
    let cookie = format!("{}={}", SESSION_COOKIE, token);

    let response = router
        .oneshot(get_request("/auth/verify", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_clears_the_session_cookie() {
    let router = app();
    let cookie = login(&router).await;

    let response = router
        .clone()
        .oneshot(json_request("POST", "/auth/logout", Some(&cookie), &json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("admin-session=;"));
    assert!(set_cookie.contains("Max-Age=0"));

    // The browser drops the cookie, so a later verify is anonymous again.
    let response = router
        .oneshot(get_request("/auth/verify", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

//=========================================================================================
// Client Store CRUD
//=========================================================================================

#[tokio::test]
async fn create_then_fetch_returns_identical_fields() {
    let router = app();
    let cookie = login(&router).await;

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/clients",
            Some(&cookie),
            &json!({"name": "Dana", "technicalKnowledge": 4, "description": "CTO, prefers brevity"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();

    let response = router
        .oneshot(get_request(&format!("/clients/{}", id), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;

    assert_eq!(fetched["name"], json!("Dana"));
    assert_eq!(fetched["technicalKnowledge"], json!(4));
    assert_eq!(fetched["description"], json!("CTO, prefers brevity"));
}

#[tokio::test]
async fn list_returns_clients_ordered_by_name() {
    let router = app();
    let cookie = login(&router).await;

    create_client(&router, &cookie, "Zed", 5).await;
    create_client(&router, &cookie, "Amy", 1).await;

    let response = router.oneshot(get_request("/clients", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|client| client["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Amy", "Zed"]);
}

#[tokio::test]
async fn updating_only_description_preserves_other_fields() {
    let router = app();
    let cookie = login(&router).await;
    let created = create_client(&router, &cookie, "Dana", 4).await;
    let id = created["id"].as_str().unwrap();

    let response = router
        .oneshot(json_request(
            "PUT",
            &format!("/clients/{}", id),
            Some(&cookie),
            &json!({"description": "Now leads the platform team"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["name"], json!("Dana"));
    assert_eq!(updated["technicalKnowledge"], json!(4));
    assert_eq!(updated["description"], json!("Now leads the platform team"));
}

#[tokio::test]
async fn deleting_a_nonexistent_id_succeeds() {
    let router = app();
    let cookie = login(&router).await;

    let response = router
        .oneshot(json_request(
            "DELETE",
            "/clients/no-such-id",
            Some(&cookie),
            &json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        json!("Client deleted successfully")
    );
}

#[tokio::test]
async fn creating_without_required_fields_is_rejected() {
    let router = app();
    let cookie = login(&router).await;

    let missing_level = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/clients",
            Some(&cookie),
            &json!({"name": "Dana"}),
        ))
        .await
        .unwrap();
    assert_eq!(missing_level.status(), StatusCode::BAD_REQUEST);

    let missing_name = router
        .oneshot(json_request(
            "POST",
            "/clients",
            Some(&cookie),
            &json!({"technicalKnowledge": 3}),
        ))
        .await
        .unwrap();
    assert_eq!(missing_name.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn out_of_range_technical_knowledge_is_rejected() {
    let router = app();
    let cookie = login(&router).await;

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/clients",
            Some(&cookie),
            &json!({"name": "Dana", "technicalKnowledge": 6}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let created = create_client(&router, &cookie, "Dana", 3).await;
    let id = created["id"].as_str().unwrap();
    let response = router
        .oneshot(json_request(
            "PUT",
            &format!("/clients/{}", id),
            Some(&cookie),
            &json!({"technicalKnowledge": 0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn updating_a_nonexistent_client_returns_not_found() {
    let router = app();
    let cookie = login(&router).await;

    let response = router
        .oneshot(json_request(
            "PUT",
            "/clients/no-such-id",
            Some(&cookie),
            &json!({"name": "Ghost"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mutations_require_a_session() {
    let router = app();

    let create = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/clients",
            None,
            &json!({"name": "Dana", "technicalKnowledge": 3}),
        ))
        .await
        .unwrap();
    assert_eq!(create.status(), StatusCode::UNAUTHORIZED);

    let update = router
        .clone()
        .oneshot(json_request(
            "PUT",
            "/clients/some-id",
            None,
            &json!({"name": "Dana"}),
        ))
        .await
        .unwrap();
    assert_eq!(update.status(), StatusCode::UNAUTHORIZED);

    let delete = router
        .oneshot(json_request("DELETE", "/clients/some-id", None, &json!({})))
        .await
        .unwrap();
    assert_eq!(delete.status(), StatusCode::UNAUTHORIZED);
}

//=========================================================================================
// Redraft Pipeline
//=========================================================================================

#[tokio::test]
async fn redraft_with_empty_email_skips_the_upstream_call() {
    let (router, redraft) = test_app(RecordingRedraftService::succeeding(vec!["unused"]));

    let response = router
        .oneshot(json_request(
            "POST",
            "/redraft",
            None,
            &json!({"originalEmail": "   ", "prompt": "Make it formal"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "No email content provided");
    assert!(!redraft.was_called());
}

#[tokio::test]
async fn redraft_with_empty_prompt_is_rejected() {
    let (router, redraft) = test_app(RecordingRedraftService::succeeding(vec!["unused"]));

    let response = router
        .oneshot(json_request(
            "POST",
            "/redraft",
            None,
            &json!({"originalEmail": "Hi team", "prompt": ""}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "No prompt provided");
    assert!(!redraft.was_called());
}

#[tokio::test]
async fn redraft_streams_the_generated_chunks() {
    let (router, _) = test_app(RecordingRedraftService::succeeding(vec![
        "Dear team,",
        " the server",
        " is back up.",
    ]));

    let response = router
        .oneshot(json_request(
            "POST",
            "/redraft",
            None,
            &json!({"originalEmail": "hi, server works again", "prompt": "Make it formal"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(body_text(response).await, "Dear team, the server is back up.");
}

#[tokio::test]
async fn redraft_passes_the_client_snapshot_through() {
    let (router, redraft) = test_app(RecordingRedraftService::succeeding(vec!["ok"]));

    let response = router
        .oneshot(json_request(
            "POST",
            "/redraft",
            None,
            &json!({
                "originalEmail": "The deploy failed.",
                "context": "Incident follow-up",
                "prompt": "Soften the tone",
                "client": {"name": "Dana", "technicalKnowledge": 1},
                "bilingualOutput": true
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = redraft.last_request().expect("the upstream double was called");
    assert_eq!(request.context.as_deref(), Some("Incident follow-up"));
    assert_eq!(request.prompt, "Soften the tone");
    assert!(request.bilingual_output);
    let client = request.client.expect("client snapshot forwarded");
    assert_eq!(client.name, "Dana");
    assert_eq!(client.technical_knowledge, 1);
}

#[tokio::test]
async fn upstream_failure_surfaces_as_server_error() {
    let (router, _) = test_app(RecordingRedraftService::failing());

    let response = router
        .oneshot(json_request(
            "POST",
            "/redraft",
            None,
            &json!({"originalEmail": "Hi team", "prompt": "Make it formal"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "Server Error: quota exhausted");
}

#[tokio::test]
async fn stream_error_before_any_content_surfaces_as_server_error() {
    let (router, _) = test_app(RecordingRedraftService::failing_mid_stream());

    let response = router
        .oneshot(json_request(
            "POST",
            "/redraft",
            None,
            &json!({"originalEmail": "Hi team", "prompt": "Make it formal"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_text(response).await,
        "Server Error: content policy rejection"
    );
}
