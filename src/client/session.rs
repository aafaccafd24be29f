//! Persisted login session and token lifecycle.

use std::fs;
use std::future::Future;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::api::{ApiClient, TokenPair};
use super::ClientError;
use crate::database::models::UserProfile;

/// Refresh this long before the access token expires
pub const REFRESH_BUFFER_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub server: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

impl Session {
    pub fn from_tokens(server: &str, tokens: TokenPair) -> Self {
        Self {
            server: server.to_string(),
            expires_at: Utc::now() + Duration::seconds(tokens.expires_in),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            user: tokens.user,
        }
    }

    /// True when the access token expires within `buffer`
    pub fn needs_refresh(&self, buffer: Duration) -> bool {
        Utc::now() + buffer >= self.expires_at
    }
}

/// JSON file holding the current session
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<Option<Session>, ClientError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        match serde_json::from_str(&content) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!("Ignoring unreadable session file {}: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(session)?)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), ClientError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// Login state bound to one server.
///
/// Protected calls go through [`AuthSession::authorized`], which refreshes an
/// access token about to expire and retries once when the server answers 401.
pub struct AuthSession {
    api: ApiClient,
    store: SessionStore,
    session: Option<Session>,
}

impl AuthSession {
    /// Load the stored session. A session for a different server is ignored.
    pub fn open(api: ApiClient, store: SessionStore) -> Result<Self, ClientError> {
        let session = store
            .load()?
            .filter(|session| session.server == api.base_url());
        Ok(Self { api, store, session })
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Create the account, then log in with the same credentials
    pub async fn register(&mut self, username: &str, email: &str, password: &str) -> Result<&Session, ClientError> {
        self.api.register(username, email, password).await?;
        self.login(email, password).await
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<&Session, ClientError> {
        let tokens = self.api.login(email, password).await?;
        self.replace(Session::from_tokens(self.api.base_url(), tokens))
    }

    /// Revoke the refresh token server-side when reachable, then forget the session
    pub async fn logout(&mut self) -> Result<(), ClientError> {
        if let Some(session) = self.session.take() {
            if let Err(e) = self.api.logout(Some(&session.refresh_token)).await {
                tracing::warn!("Server logout failed, clearing local session anyway: {}", e);
            }
        }
        self.store.clear()
    }

    /// Forget the session without contacting the server
    pub fn forget(&mut self) -> Result<(), ClientError> {
        self.session = None;
        self.store.clear()
    }

    /// Exchange the refresh token for a new pair. A rejected token ends the session.
    pub async fn refresh(&mut self) -> Result<&Session, ClientError> {
        let refresh_token = match &self.session {
            Some(session) => session.refresh_token.clone(),
            None => return Err(ClientError::NotLoggedIn),
        };

        match self.api.refresh(&refresh_token).await {
            Ok(tokens) => self.replace(Session::from_tokens(self.api.base_url(), tokens)),
            Err(e) if e.is_unauthorized() => {
                self.forget()?;
                Err(ClientError::SessionExpired)
            }
            Err(e) => Err(e),
        }
    }

    /// Current access token, refreshed first if it is about to expire
    pub async fn ensure_fresh(&mut self) -> Result<String, ClientError> {
        let session = self.session.as_ref().ok_or(ClientError::NotLoggedIn)?;
        if !session.needs_refresh(Duration::seconds(REFRESH_BUFFER_SECS)) {
            return Ok(session.access_token.clone());
        }
        Ok(self.refresh().await?.access_token.clone())
    }

    /// Run a protected call with a fresh token, refreshing and retrying once on 401
    pub async fn authorized<T, F, Fut>(&mut self, call: F) -> Result<T, ClientError>
    where
        F: Fn(ApiClient, String) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let token = self.ensure_fresh().await?;
        match call(self.api.clone(), token).await {
            Err(e) if e.is_unauthorized() => {
                let token = self.refresh().await?.access_token.clone();
                call(self.api.clone(), token).await
            }
            result => result,
        }
    }

    fn replace(&mut self, session: Session) -> Result<&Session, ClientError> {
        self.store.save(&session)?;
        Ok(self.session.insert(session))
    }
}
