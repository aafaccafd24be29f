// handlers/protected/auth/whoami.rs - GET /api/auth/whoami handler

use axum::{extract::State, Extension};

use crate::database::models::UserProfile;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// GET /api/auth/whoami - Profile of the authenticated user
pub async fn whoami_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<UserProfile> {
    // A valid token can outlive its account
    let record = state
        .store
        .find_user_by_id(user.id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    Ok(ApiResponse::success(record.into()))
}
