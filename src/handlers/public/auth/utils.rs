use axum::http::{header::COOKIE, HeaderMap};
use serde::{Deserialize, Serialize};

use crate::auth::issue_refresh_token;
use crate::config::SecurityConfig;
use crate::database::models::{User, UserProfile};
use crate::error::ApiError;
use crate::state::AppState;

pub const REFRESH_COOKIE: &str = "refresh_token";

/// Body accepted by refresh and logout. Both fields are optional since the
/// cookie can carry the token instead.
#[derive(Debug, Default, Deserialize)]
pub struct RefreshTokenInput {
    #[serde(default, alias = "refreshToken")]
    pub refresh_token: Option<String>,
}

/// Access/refresh pair returned by login and refresh
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: UserProfile,
}

/// Sign an access token and persist a new refresh token for the user
pub async fn issue_tokens(state: &AppState, user: User) -> Result<TokenResponse, ApiError> {
    let access_token = state.keys.issue_access_token(user.id, &user.username)?;
    let issued = issue_refresh_token(user.id, state.config.security.refresh_token_ttl_days);
    state.store.insert_refresh_token(issued.record).await?;

    Ok(TokenResponse {
        access_token,
        refresh_token: issued.token,
        token_type: "Bearer",
        expires_in: state.keys.access_ttl_secs(),
        user: user.into(),
    })
}

/// Refresh token from the JSON body, falling back to the cookie
pub fn presented_refresh_token(body: Option<RefreshTokenInput>, headers: &HeaderMap) -> Option<String> {
    body.and_then(|b| b.refresh_token)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| refresh_token_from_cookies(headers))
}

pub fn refresh_token_from_cookies(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == REFRESH_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

pub fn refresh_cookie(token: &str, security: &SecurityConfig) -> String {
    format!(
        "{}={}; Path=/api; HttpOnly; SameSite=Strict; Max-Age={}{}",
        REFRESH_COOKIE,
        token,
        security.refresh_token_ttl_days * 24 * 60 * 60,
        secure_attribute(security)
    )
}

pub fn clear_refresh_cookie(security: &SecurityConfig) -> String {
    format!(
        "{}=; Path=/api; HttpOnly; SameSite=Strict; Max-Age=0{}",
        REFRESH_COOKIE,
        secure_attribute(security)
    )
}

fn secure_attribute(security: &SecurityConfig) -> &'static str {
    if security.secure_cookies {
        "; Secure"
    } else {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::http::HeaderValue;

    #[test]
    fn reads_refresh_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; refresh_token=abc123; lang=en"));
        assert_eq!(refresh_token_from_cookies(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn body_token_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("refresh_token=from-cookie"));

        let body = RefreshTokenInput {
            refresh_token: Some("from-body".to_string()),
        };
        assert_eq!(presented_refresh_token(Some(body), &headers).as_deref(), Some("from-body"));

        let blank = RefreshTokenInput {
            refresh_token: Some("  ".to_string()),
        };
        assert_eq!(presented_refresh_token(Some(blank), &headers).as_deref(), Some("from-cookie"));
        assert_eq!(presented_refresh_token(None, &HeaderMap::new()), None);
    }

    #[test]
    fn cookie_attributes_follow_config() {
        let mut config = AppConfig::development();
        let cookie = refresh_cookie("tok", &config.security);
        assert!(cookie.starts_with("refresh_token=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(!cookie.contains("Secure"));

        config.security.secure_cookies = true;
        assert!(clear_refresh_cookie(&config.security).ends_with("Max-Age=0; Secure"));
    }
}
