// handlers/protected/cards/delete.rs - DELETE /api/cards/:id and DELETE /api/cards

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

use super::{card_not_found, parse_card_id};

#[derive(Debug, Deserialize)]
pub struct DeleteCardInput {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct DeletedCard {
    pub id: Uuid,
}

/// DELETE /api/cards/:id - Remove one of the caller's cards
pub async fn card_delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<DeletedCard> {
    delete_owned_card(&state, &user, parse_card_id(&id)?).await
}

/// DELETE /api/cards - Same as above with the id in a `{ "id": ... }` body
pub async fn cards_delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<DeleteCardInput>, JsonRejection>,
) -> ApiResult<DeletedCard> {
    let Json(input) = payload?;
    delete_owned_card(&state, &user, parse_card_id(&input.id)?).await
}

async fn delete_owned_card(
    state: &AppState,
    user: &AuthUser,
    card_id: Uuid,
) -> Result<ApiResponse<DeletedCard>, ApiError> {
    if !state.store.delete_card(user.id, card_id).await? {
        return Err(card_not_found());
    }

    tracing::info!(user_id = %user.id, card_id = %card_id, "card deleted");
    Ok(ApiResponse::success(DeletedCard { id: card_id }))
}
