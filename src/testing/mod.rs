use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use crate::config::{AppConfig, StorageBackend};
use crate::database::MemoryStore;
use crate::server::app;
use crate::state::AppState;

/// In-process router over a fresh memory store
pub struct TestContext {
    pub state: AppState,
    router: Router,
}

#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password: String,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.storage.backend = StorageBackend::Memory;
    config.api.enable_request_logging = false;
    config
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let state = AppState::new(Arc::new(MemoryStore::new()), Arc::new(config))
            .expect("test config has a signing secret");
        let router = app(state.clone());
        Self { state, router }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => {
                let body = body.to_string();
                builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::CONTENT_LENGTH, body.len())
                    .body(Body::from(body))
            }
            None => builder.body(Body::empty()),
        }
        .expect("valid request");

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        TestResponse { status, headers, body }
    }

    /// Register and log in a user with a unique name derived from `name`
    pub async fn create_test_user(&self, name: &str) -> TestUser {
        let suffix = Uuid::new_v4().simple().to_string();
        let username = format!("{}_{}", name, &suffix[..8]);
        let email = format!("{}@example.com", username);
        let password = "correct horse battery".to_string();

        let registered = self
            .request(
                Method::POST,
                "/api/register",
                None,
                Some(json!({ "username": username, "email": email, "password": password })),
            )
            .await;
        assert_eq!(registered.status, StatusCode::CREATED, "{}", registered.text());

        let login = self
            .request(
                Method::POST,
                "/api/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(login.status, StatusCode::OK, "{}", login.text());
        let body = login.json();
        let data = &body["data"];

        TestUser {
            id: data["user"]["id"].as_str().and_then(|s| s.parse().ok()).expect("user id"),
            username,
            email,
            password,
            access_token: data["access_token"].as_str().expect("access token").to_string(),
            refresh_token: data["refresh_token"].as_str().expect("refresh token").to_string(),
        }
    }

    /// Create a card for `user` and return its JSON representation
    pub async fn create_card(&self, user: &TestUser, store_name: &str, number: &str, qr: bool) -> Value {
        let response = self
            .request(
                Method::POST,
                "/api/cards",
                Some(&user.access_token),
                Some(json!({
                    "store_name": store_name,
                    "card_number": number,
                    "is_qr_code": qr
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
        response.json()["data"].clone()
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_user_names_are_unique() {
        let ctx = TestContext::new();
        let first = ctx.create_test_user("alice").await;
        let second = ctx.create_test_user("alice").await;

        assert_ne!(first.username, second.username);
        assert_ne!(first.id, second.id);
        assert!(first.username.starts_with("alice_"));
    }
}
