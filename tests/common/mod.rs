//! Test harness: a full application (router + services + migrations)
//! backed by a throwaway SQLite database, driven through the real HTTP
//! router with `tower::ServiceExt::oneshot`.
//!
//! Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, Response},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tillpoint_api::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db,
    events::{self, EventSender},
    handlers::AppServices,
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;

pub const MASTER_KEY: &str = "test-master-key";
const JWT_SECRET: &str = "integration_test_secret_key_that_is_long_enough_for_hmac";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
    _db_dir: TempDir,
}

impl TestApp {
    /// Construct a new application with a fresh, fully migrated database.
    pub async fn new() -> Self {
        let db_dir = TempDir::new().expect("create temp dir");
        let db_path = db_dir.path().join("tillpoint_test.db");
        let database_url = format!("sqlite://{}?mode=rwc", db_path.display());

        let mut cfg = AppConfig::new(
            database_url,
            JWT_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18080,
        );
        cfg.master_bootstrap_key = Some(MASTER_KEY.to_string());
        cfg.db_max_connections = 5;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("create test database");
        db::run_migrations(&pool).await.expect("run migrations");
        let db_arc = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let auth = Arc::new(AuthService::new(AuthConfig::new(
            cfg.jwt_secret.clone(),
            cfg.auth_issuer.clone(),
            cfg.auth_audience.clone(),
            Duration::from_secs(cfg.jwt_expiration),
        )));

        let services = AppServices::new(db_arc.clone(), Arc::new(event_sender.clone()));

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            auth,
            services,
        };

        let router = tillpoint_api::app_router(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
            _db_dir: db_dir,
        }
    }

    /// Issue a raw request against the router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }

        let request = match body {
            Some(payload) => builder
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .expect("build request"),
            None => builder.body(Body::empty()).expect("build request"),
        };

        self.router.clone().oneshot(request).await.expect("dispatch")
    }

    /// Bootstrap an organization through the API and log its owner in.
    /// Returns (organization_id, owner_id, owner_token).
    pub async fn bootstrap_org(&self, name: &str, owner_email: &str) -> (String, String, String) {
        let response = self
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/v1/organizations/create-with-owner")
                    .header("content-type", "application/json")
                    .header("x-master-key", MASTER_KEY)
                    .body(Body::from(
                        json!({
                            "organization_name": name,
                            "owner_name": "Owner",
                            "owner_email": owner_email,
                            "owner_password": "hunter2secret",
                        })
                        .to_string(),
                    ))
                    .expect("build request"),
            )
            .await
            .expect("dispatch");

        assert_eq!(response.status(), 201, "bootstrap failed for {name}");
        let body = response_json(response).await;
        let org_id = body["data"]["organization"]["id"]
            .as_str()
            .expect("organization id")
            .to_string();
        let owner_id = body["data"]["owner"]["id"]
            .as_str()
            .expect("owner id")
            .to_string();

        let token = self.login(owner_email, "hunter2secret").await;
        (org_id, owner_id, token)
    }

    /// Log in and return the access token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(response.status(), 200, "login failed for {email}");

        let body = response_json(response).await;
        body["data"]["token"]["access_token"]
            .as_str()
            .expect("access token")
            .to_string()
    }

    /// Create an item via the API; returns its id.
    pub async fn seed_item(&self, token: &str, name: &str, price: f64, qty: i32) -> String {
        let response = self
            .request(
                Method::POST,
                "/api/v1/items",
                Some(token),
                Some(json!({ "name": name, "selling_price": price, "inventory_qty": qty })),
            )
            .await;
        assert_eq!(response.status(), 201, "seeding item {name} failed");

        let body = response_json(response).await;
        body["data"]["id"].as_str().expect("item id").to_string()
    }

    /// Create a user in the caller's organization; returns its id.
    pub async fn seed_user(&self, token: &str, email: &str, role: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/api/v1/users",
                Some(token),
                Some(json!({
                    "name": email,
                    "email": email,
                    "password": "hunter2secret",
                    "role": role,
                })),
            )
            .await;
        assert_eq!(response.status(), 201, "seeding user {email} failed");

        let body = response_json(response).await;
        body["data"]["id"].as_str().expect("user id").to_string()
    }

    /// Current on-hand stock of an item.
    pub async fn stock_of(&self, token: &str, item_id: &str) -> i64 {
        let response = self
            .request(
                Method::GET,
                &format!("/api/v1/items/{item_id}"),
                Some(token),
                None,
            )
            .await;
        assert_eq!(response.status(), 200);

        let body = response_json(response).await;
        body["data"]["inventory_qty"].as_i64().expect("inventory qty")
    }
}

/// Parse a response body as JSON.
pub async fn response_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Read a money field that may serialize as a string or a number.
pub fn money(value: &Value) -> f64 {
    match value {
        Value::String(s) => s.parse().expect("numeric string"),
        Value::Number(n) => n.as_f64().expect("f64"),
        other => panic!("not a monetary value: {other:?}"),
    }
}
