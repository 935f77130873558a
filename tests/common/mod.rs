#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use eduops_api::{
    auth::{AuthConfig, AuthService, Role},
    config::AppConfig,
    db::{self, DbConfig},
    events::{self, EventSender},
    services::payments::TransitionPolicy,
    AppState,
};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;

const TEST_SECRET: &str = "integration_signing_secret_for_eduops_tests";

/// Helper harness for spinning up the full router over an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    auth_service: Arc<AuthService>,
    admin_token: String,
    staff_token: String,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_policy(policy: TransitionPolicy) -> Self {
        Self::with_config(|cfg| cfg.payment_transition_policy = policy).await
    }

    /// Construct a test application, letting the caller adjust configuration first.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.cors_allow_any_origin = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        adjust(&mut cfg);

        // A single connection keeps the memory database alive for the whole test
        let mut db_cfg = DbConfig::from(&cfg);
        db_cfg.max_connections = 1;
        let pool = db::establish_connection_with_config(&db_cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let auth_service = Arc::new(AuthService::new(AuthConfig::from_app_config(&cfg)));
        let admin_token = auth_service
            .issue_token("admin-1", Some("Test Admin"), Role::Admin)
            .expect("admin token")
            .access_token;
        let staff_token = auth_service
            .issue_token("staff-1", Some("Test Staff"), Role::Staff)
            .expect("staff token")
            .access_token;

        let state = AppState::new(Arc::new(pool), cfg, event_sender).expect("app state");
        let router =
            eduops_api::build_router(state.clone(), auth_service.clone()).expect("router");

        Self {
            router,
            state,
            auth_service,
            admin_token,
            staff_token,
            _event_task: event_task,
        }
    }

    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    pub fn staff_token(&self) -> &str {
        &self.staff_token
    }

    /// Mint a token for an arbitrary role.
    pub fn token_for(&self, role: Role) -> String {
        self.auth_service
            .issue_token("someone", None, role)
            .expect("token")
            .access_token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience helper for admin-authenticated JSON requests.
    pub async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(self.admin_token())).await
    }

    pub async fn public(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, None).await
    }

    /// POST expecting 201 and returning the envelope's `data`.
    pub async fn create(&self, uri: &str, body: Value) -> Value {
        let response = self.admin(Method::POST, uri, Some(body)).await;
        let status = response.status();
        let json = response_json(response).await;
        assert_eq!(status, StatusCode::CREATED, "POST {uri} failed: {json}");
        json["data"].clone()
    }

    pub async fn seed_school(&self, name: &str) -> Value {
        self.create(
            "/api/v1/schools",
            json!({ "name": name, "contact_name": "Principal Park", "email": "office@school.example" }),
        )
        .await
    }

    pub async fn seed_program(&self, title: &str) -> Value {
        self.create(
            "/api/v1/programs",
            json!({ "title": title, "category": "STEM", "base_fee": "150000" }),
        )
        .await
    }

    pub async fn seed_instructor(&self, name: &str) -> Value {
        self.create(
            "/api/v1/instructors",
            json!({ "name": name, "email": "teach@example.com", "specialty": "Robotics" }),
        )
        .await
    }

    /// Submits a request through the public endpoint for a fresh school.
    pub async fn submit_request(&self) -> Value {
        let school = self.seed_school("Hillside Middle School").await;
        let response = self
            .public(
                Method::POST,
                "/api/v1/public/school-requests",
                Some(json!({ "school_id": school["id"], "student_count": 30 })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        response_json(response).await["data"].clone()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
