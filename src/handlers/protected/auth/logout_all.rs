// handlers/protected/auth/logout_all.rs - POST /api/auth/logout-all handler

use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::{IntoResponse, Response},
    Extension,
};
use serde_json::json;

use crate::error::ApiError;
use crate::handlers::public::auth::utils::clear_refresh_cookie;
use crate::middleware::{ApiResponse, AuthUser};
use crate::state::AppState;

/// POST /api/auth/logout-all - Revoke every refresh token of the caller
///
/// Access tokens already issued stay valid until they expire.
pub async fn logout_all_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, ApiError> {
    let revoked = state.store.revoke_user_refresh_tokens(user.id).await?;
    tracing::info!(user_id = %user.id, revoked, "revoked all sessions");

    let cookie = clear_refresh_cookie(&state.config.security);
    Ok(([(SET_COOKIE, cookie)], ApiResponse::success(json!({ "revoked": revoked }))).into_response())
}
