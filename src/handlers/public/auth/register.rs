// handlers/public/auth/register.rs - POST /api/register handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::hash_password;
use crate::database::models::NewUser;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::validation::RegisterInput;

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
}

/// POST /api/register - Create a user account
///
/// Returns 201 with the new user id. Duplicate username or email is a 409.
pub async fn register_post(
    State(state): State<AppState>,
    payload: Result<Json<RegisterInput>, JsonRejection>,
) -> ApiResult<RegisterResponse> {
    let Json(input) = payload?;
    let valid = input.validate()?;

    let password_hash = hash_password(&valid.password)?;
    let user = state
        .store
        .create_user(NewUser {
            username: valid.username,
            email: valid.email,
            password_hash,
        })
        .await?;

    tracing::info!(user_id = %user.id, "registered user {}", user.username);
    Ok(ApiResponse::created(RegisterResponse { user_id: user.id }))
}
