// handlers/public/auth/logout.rs - POST /api/logout handler

use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::auth::hash_refresh_token;
use crate::error::ApiError;
use crate::middleware::ApiResponse;
use crate::state::AppState;

use super::utils::{clear_refresh_cookie, presented_refresh_token, RefreshTokenInput};

/// POST /api/logout - Revoke the presented refresh token and clear the cookie
///
/// Succeeds even without a token; the access token simply runs out.
pub async fn logout_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Option<Json<RefreshTokenInput>>,
) -> Result<Response, ApiError> {
    if let Some(token) = presented_refresh_token(payload.map(|Json(body)| body), &headers) {
        let revoked = state
            .store
            .revoke_refresh_token(&hash_refresh_token(&token))
            .await?;
        tracing::debug!(revoked, "logout");
    }

    let cookie = clear_refresh_cookie(&state.config.security);
    Ok(([(SET_COOKIE, cookie)], ApiResponse::success(json!({ "logged_out": true }))).into_response())
}
