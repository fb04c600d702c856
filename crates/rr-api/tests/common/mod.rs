#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use serde_json::Value;
use tower::ServiceExt;

use rr_api::{router, AppState};
use rr_auth_simple::SimpleAuthProvider;
use rr_core::accounts::AccountService;
use rr_core::models::{NewUser, OutboundMail, Role, User};
use rr_core::traits::{AuthProvider, Mailer, UserRepo};
use rr_db_sqlite::SqliteRepo;

/// Keeps every message instead of delivering it.
#[derive(Default)]
pub struct CapturingMailer {
    sent: Mutex<Vec<OutboundMail>>,
}

impl CapturingMailer {
    pub fn sent(&self) -> Vec<OutboundMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_code(&self) -> String {
        let sent = self.sent.lock().unwrap();
        let body = &sent.last().expect("no mail sent").body;
        body.rsplit(' ').next().unwrap().trim().to_string()
    }
}

#[async_trait]
impl Mailer for CapturingMailer {
    async fn send(&self, mail: OutboundMail) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _mail: OutboundMail) -> anyhow::Result<()> {
        anyhow::bail!("relay refused connection")
    }
}

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<SqliteRepo>,
    pub auth: Arc<SimpleAuthProvider>,
    pub mailer: Arc<CapturingMailer>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mailer = Arc::new(CapturingMailer::default());
        Self::build(mailer.clone(), mailer).await
    }

    pub async fn with_failing_mailer() -> Self {
        Self::build(Arc::new(FailingMailer), Arc::new(CapturingMailer::default())).await
    }

    async fn build(mailer: Arc<dyn Mailer>, capture: Arc<CapturingMailer>) -> Self {
        let repo = Arc::new(SqliteRepo::in_memory().await.unwrap());
        let auth = Arc::new(SimpleAuthProvider::new("test-secret", Duration::days(1), Duration::days(3)).unwrap());
        let accounts = AccountService::new(repo.clone(), auth.clone(), mailer, "noreply@example.com");
        let state = AppState::new(accounts, repo.clone(), repo.clone());
        Self { router: router(state), repo, auth, mailer: capture }
    }

    /// Creates an account directly in storage and returns it with a valid token.
    pub async fn user(&self, username: &str, role: Role) -> (User, String) {
        let mut new_user = NewUser::signup(username, &format!("{}@example.com", username));
        new_user.role = role;
        let user = self.repo.create_user(new_user).await.unwrap();
        let token = self.auth.issue_access_token(&user).unwrap();
        (user, token)
    }

    pub async fn request(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request("GET", uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request("PATCH", uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request("DELETE", uri, token, None).await
    }

    /// An admin-created title; returns its id.
    pub async fn title(&self, admin: &str, name: &str) -> i64 {
        let (status, body) = self
            .post("/api/v1/titles/", Some(admin), serde_json::json!({ "name": name, "year": 1979 }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().unwrap()
    }
}
