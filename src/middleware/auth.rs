use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::Claims;
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated user context extracted from JWT
#[derive(Clone, Debug, Serialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username,
        }
    }
}

/// JWT authentication middleware that validates tokens and extracts user context
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // Extract JWT from Authorization header
    let token = extract_jwt_from_headers(&headers).map_err(ApiError::unauthorized)?;

    // Validate and decode JWT
    let claims = state.keys.decode_access_token(token)?;

    // Convert claims to AuthUser and inject into request
    let auth_user = AuthUser::from(claims);
    tracing::debug!(user_id = %auth_user.id, "authenticated request");
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<&str, &'static str> {
    let auth_header = headers.get(AUTHORIZATION).ok_or("No token provided")?;

    let auth_str = auth_header.to_str().map_err(|_| "Invalid token")?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        Some(_) => Err("No token provided"),
        None => Err("Invalid token"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;
    use axum::http::{HeaderValue, Method, StatusCode};
    use chrono::Duration;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(extract_jwt_from_headers(&headers("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
    }

    #[test]
    fn missing_or_empty_token() {
        assert_eq!(extract_jwt_from_headers(&HeaderMap::new()), Err("No token provided"));
        assert_eq!(extract_jwt_from_headers(&headers("Bearer  ")), Err("No token provided"));
    }

    #[test]
    fn non_bearer_scheme_is_invalid() {
        assert_eq!(extract_jwt_from_headers(&headers("Basic dXNlcjpwYXNz")), Err("Invalid token"));
    }

    #[tokio::test]
    async fn expired_access_token_is_rejected() {
        let ctx = TestContext::new();
        let user = ctx.create_test_user("expired").await;

        let claims = Claims::new(user.id, user.username.clone(), Duration::minutes(-5));
        let token = ctx.state.keys.encode(&claims).unwrap();

        let response = ctx.request(Method::GET, "/api/cards", Some(&token), None).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.json()["error"], "Token expired");

        let fresh = ctx.request(Method::GET, "/api/cards", Some(&user.access_token), None).await;
        assert_eq!(fresh.status, StatusCode::OK);
    }
}
