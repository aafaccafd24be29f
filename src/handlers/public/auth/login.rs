// handlers/public/auth/login.rs - POST /api/login handler

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header::SET_COOKIE,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::auth::verify_password;
use crate::error::ApiError;
use crate::middleware::ApiResponse;
use crate::state::AppState;
use crate::validation::normalize_email;

use super::utils::{issue_tokens, refresh_cookie};

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// POST /api/login - Exchange credentials for an access/refresh token pair
///
/// Unknown email and wrong password give the same 401 so the response does
/// not reveal which accounts exist. The refresh token is also set as an
/// HttpOnly cookie.
pub async fn login_post(
    State(state): State<AppState>,
    payload: Result<Json<LoginInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(input) = payload?;
    let email = normalize_email(&input.email);
    if email.is_empty() || input.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let Some(user) = state.store.find_user_by_email(&email).await? else {
        tracing::info!("login rejected: unknown email");
        return Err(invalid_credentials());
    };
    if !verify_password(&input.password, &user.password_hash)? {
        tracing::info!(user_id = %user.id, "login rejected: wrong password");
        return Err(invalid_credentials());
    }

    let tokens = issue_tokens(&state, user).await?;
    tracing::info!(user_id = %tokens.user.id, "user logged in");

    let cookie = refresh_cookie(&tokens.refresh_token, &state.config.security);
    Ok(([(SET_COOKIE, cookie)], ApiResponse::success(tokens)).into_response())
}

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("Invalid email or password")
}
