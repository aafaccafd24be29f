// handlers/public/auth/refresh.rs - POST /api/refresh-token handler

use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};

use crate::auth::hash_refresh_token;
use crate::error::ApiError;
use crate::middleware::ApiResponse;
use crate::state::AppState;

use super::utils::{issue_tokens, presented_refresh_token, refresh_cookie, RefreshTokenInput};

/// POST /api/refresh-token - Rotate a refresh token into a new token pair
///
/// The token comes from the JSON body or the `refresh_token` cookie. It is
/// consumed whether or not it is still valid, so each token works once.
pub async fn refresh_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Option<Json<RefreshTokenInput>>,
) -> Result<Response, ApiError> {
    let token = presented_refresh_token(payload.map(|Json(body)| body), &headers)
        .ok_or_else(|| ApiError::unauthorized("No refresh token provided"))?;

    let record = state
        .store
        .take_refresh_token(&hash_refresh_token(&token))
        .await?
        .ok_or_else(invalid_refresh_token)?;
    if record.is_expired() {
        tracing::info!(user_id = %record.user_id, "expired refresh token presented");
        return Err(invalid_refresh_token());
    }

    let user = state
        .store
        .find_user_by_id(record.user_id)
        .await?
        .ok_or_else(invalid_refresh_token)?;

    let tokens = issue_tokens(&state, user).await?;
    tracing::debug!(user_id = %tokens.user.id, "refresh token rotated");

    let cookie = refresh_cookie(&tokens.refresh_token, &state.config.security);
    Ok(([(SET_COOKIE, cookie)], ApiResponse::success(tokens)).into_response())
}

fn invalid_refresh_token() -> ApiError {
    ApiError::unauthorized("Invalid or expired refresh token")
}
