#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

/// A `cardtrooper-api` process on a free port backed by in-memory storage.
/// The process is killed when the handle drops.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

pub struct TestUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub access_token: String,
    pub refresh_token: String,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let child = Command::new(env!("CARGO_BIN_EXE_cardtrooper-api"))
            .env("APP_ENV", "development")
            .env("HOST", "127.0.0.1")
            .env("CARDTROOPER_PORT", port.to_string())
            .env("CARDTROOPER_STORAGE", "memory")
            .env("JWT_SECRET", "integration-test-secret-with-enough-length")
            .env("API_ENABLE_REQUEST_LOGGING", "false")
            .env("RUST_LOG", "warn")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        let url = format!("{}/health", self.base_url);
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register and log in a fresh user
    pub async fn create_user(&self, client: &reqwest::Client, name: &str) -> Result<TestUser> {
        let suffix = &uuid::Uuid::new_v4().simple().to_string()[..8];
        let username = format!("{}_{}", name, suffix);
        let email = format!("{}@example.com", username);
        let password = "correct horse battery".to_string();

        let registered = client
            .post(self.url("/api/register"))
            .json(&json!({ "username": username, "email": email, "password": password }))
            .send()
            .await?;
        anyhow::ensure!(registered.status() == StatusCode::CREATED, "register failed: {}", registered.status());

        let login: Value = client
            .post(self.url("/api/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?
            .json()
            .await?;
        let data = &login["data"];

        Ok(TestUser {
            access_token: data["access_token"].as_str().context("access token")?.to_string(),
            refresh_token: data["refresh_token"].as_str().context("refresh token")?.to_string(),
            username,
            email,
            password,
        })
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub async fn start_server() -> Result<TestServer> {
    let server = TestServer::spawn()?;
    server.wait_ready(Duration::from_secs(15)).await?;
    Ok(server)
}
