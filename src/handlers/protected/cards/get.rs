// handlers/protected/cards/get.rs - GET /api/cards/:id handler

use axum::{
    extract::{Path, State},
    Extension,
};

use crate::database::models::Card;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

use super::{card_not_found, parse_card_id};

/// GET /api/cards/:id - Show a single card owned by the caller
pub async fn card_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Card> {
    let card_id = parse_card_id(&id)?;
    let card = state
        .store
        .find_card(user.id, card_id)
        .await?
        .ok_or_else(card_not_found)?;

    Ok(ApiResponse::success(card))
}
