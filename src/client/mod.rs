//! HTTP client side of the wallet: REST calls, persisted session and the
//! offline-first card cache used by the `cardtrooper` binary.

pub mod api;
pub mod cache;
pub mod session;

use thiserror::Error;

pub use api::{ApiClient, TokenPair};
pub use cache::{CachedCard, CardCache, LoadedCards, SyncReport};
pub use session::{AuthSession, Session, SessionStore};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },

    #[error("server unreachable: {0}")]
    Offline(String),

    #[error("not logged in; run `cardtrooper auth login`")]
    NotLoggedIn,

    #[error("session expired; log in again")]
    SessionExpired,

    #[error("invalid card: {0}")]
    Validation(String),

    #[error("card {0} is not in the local cache")]
    NotCached(uuid::Uuid),

    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    #[error("invalid server URL: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    pub fn is_offline(&self) -> bool {
        matches!(self, ClientError::Offline(_))
    }

    /// The server answered but could not serve the request
    pub fn is_server_error(&self) -> bool {
        matches!(self, ClientError::Api { status, .. } if *status >= 500)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Api { status: 401, .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Api { status: 404, .. })
    }

    /// Stable code for `--json` error output
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::Api { status: 401, .. } => "UNAUTHORIZED",
            ClientError::Api { status: 404, .. } => "NOT_FOUND",
            ClientError::Api { status: 409, .. } => "CONFLICT",
            ClientError::Api { status, .. } if *status >= 500 => "SERVER_ERROR",
            ClientError::Api { .. } => "API_ERROR",
            ClientError::Offline(_) => "OFFLINE",
            ClientError::NotLoggedIn => "NOT_LOGGED_IN",
            ClientError::SessionExpired => "SESSION_EXPIRED",
            ClientError::Validation(_) => "VALIDATION_ERROR",
            ClientError::NotCached(_) => "NOT_CACHED",
            ClientError::InvalidResponse(_) => "INVALID_RESPONSE",
            ClientError::InvalidUrl(_) => "INVALID_URL",
            ClientError::Io(_) => "IO_ERROR",
            ClientError::Json(_) => "JSON_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> ClientError {
        ClientError::Api {
            status,
            message: "failed".to_string(),
        }
    }

    #[test]
    fn classifies_api_statuses() {
        assert!(api(503).is_server_error());
        assert!(api(500).is_server_error());
        assert!(!api(400).is_server_error());
        assert!(!ClientError::Offline("refused".to_string()).is_server_error());

        assert_eq!(api(401).code(), "UNAUTHORIZED");
        assert_eq!(api(422).code(), "API_ERROR");
        assert_eq!(api(502).code(), "SERVER_ERROR");
        assert_eq!(ClientError::NotLoggedIn.code(), "NOT_LOGGED_IN");
    }
}
