//! Thin REST client over the wallet API.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::ClientError;
use crate::cards::CardInput;
use crate::database::models::{Card, UserProfile};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Tokens returned by login and refresh
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserProfile,
}

#[derive(Debug, Deserialize)]
struct Registered {
    user_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct Revoked {
    revoked: u64,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = normalize_base_url(base_url)?;
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("cardtrooper/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET /health, returning the `data` payload
    pub async fn health(&self) -> Result<Value, ClientError> {
        self.send(self.http.get(self.url("/health"))).await
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<Uuid, ClientError> {
        let request = self
            .http
            .post(self.url("/api/register"))
            .json(&json!({ "username": username, "email": email, "password": password }));
        let registered: Registered = self.send(request).await?;
        Ok(registered.user_id)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, ClientError> {
        let request = self
            .http
            .post(self.url("/api/login"))
            .json(&json!({ "email": email, "password": password }));
        self.send(request).await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ClientError> {
        let request = self
            .http
            .post(self.url("/api/refresh-token"))
            .json(&json!({ "refresh_token": refresh_token }));
        self.send(request).await
    }

    pub async fn logout(&self, refresh_token: Option<&str>) -> Result<(), ClientError> {
        let request = self
            .http
            .post(self.url("/api/logout"))
            .json(&json!({ "refresh_token": refresh_token }));
        let _: Value = self.send(request).await?;
        Ok(())
    }

    pub async fn logout_all(&self, access_token: &str) -> Result<u64, ClientError> {
        let request = self
            .http
            .post(self.url("/api/auth/logout-all"))
            .bearer_auth(access_token);
        let revoked: Revoked = self.send(request).await?;
        Ok(revoked.revoked)
    }

    pub async fn whoami(&self, access_token: &str) -> Result<UserProfile, ClientError> {
        let request = self.http.get(self.url("/api/auth/whoami")).bearer_auth(access_token);
        self.send(request).await
    }

    pub async fn fetch_cards(&self, access_token: &str, search: Option<&str>) -> Result<Vec<Card>, ClientError> {
        let mut request = self.http.get(self.url("/api/cards")).bearer_auth(access_token);
        if let Some(q) = search {
            request = request.query(&[("q", q)]);
        }
        self.send(request).await
    }

    pub async fn add_card(&self, access_token: &str, card: &CardInput) -> Result<Card, ClientError> {
        let request = self
            .http
            .post(self.url("/api/cards"))
            .bearer_auth(access_token)
            .json(card);
        self.send(request).await
    }

    pub async fn delete_card(&self, access_token: &str, id: Uuid) -> Result<(), ClientError> {
        let request = self
            .http
            .delete(self.url(&format!("/api/cards/{}", id)))
            .bearer_auth(access_token);
        let _: Value = self.send(request).await?;
        Ok(())
    }

    /// Send a request and unwrap the `{ success, data }` envelope
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let body: Value = match response.bytes().await {
            Ok(bytes) if bytes.is_empty() => Value::Null,
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or(Value::Null),
            Err(e) => return Err(transport_error(e)),
        };

        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        let data = body.get("data").cloned().unwrap_or(Value::Null);
        serde_json::from_value(data).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

fn transport_error(e: reqwest::Error) -> ClientError {
    if e.is_decode() {
        ClientError::InvalidResponse(e.to_string())
    } else {
        ClientError::Offline(e.to_string())
    }
}

fn error_message(status: StatusCode, body: &Value) -> String {
    body.get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string())
}

/// Accept `host:port` or a full http(s) URL; strip any trailing slash
pub fn normalize_base_url(raw: &str) -> Result<String, ClientError> {
    let raw = raw.trim();
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    };

    let url = url::Url::parse(&with_scheme).map_err(|_| ClientError::InvalidUrl(raw.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ClientError::InvalidUrl(raw.to_string()));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_base_urls() {
        assert_eq!(normalize_base_url("localhost:3000").unwrap(), "http://localhost:3000");
        assert_eq!(
            normalize_base_url("https://wallet.example.com/").unwrap(),
            "https://wallet.example.com"
        );
        assert_eq!(
            normalize_base_url(" http://127.0.0.1:8080/prefix/ ").unwrap(),
            "http://127.0.0.1:8080/prefix"
        );
        assert!(normalize_base_url("ftp://example.com").is_err());
        assert!(normalize_base_url("").is_err());
    }

    #[test]
    fn error_message_prefers_body() {
        let body = json!({ "success": false, "error": "Card not found" });
        assert_eq!(error_message(StatusCode::NOT_FOUND, &body), "Card not found");
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, &Value::Null), "Bad Gateway");
    }

    #[tokio::test]
    async fn unreachable_server_is_offline() {
        let port = portpicker::pick_unused_port().expect("free port");
        let client = ApiClient::new(&format!("http://127.0.0.1:{}", port)).unwrap();
        let err = client.health().await.unwrap_err();
        assert!(err.is_offline(), "{err:?}");
    }
}
